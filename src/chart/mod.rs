pub mod beat;
pub mod easing;
pub mod event;
pub mod judge_line;
pub mod note;
pub mod shader_effect;

use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use beat::{Beat, BpmList, BpmPoint};
pub use easing::Easing;
pub use event::{AnyEvent, Color, Event};
pub use judge_line::{
    AttachUi, EventChannel, EventLayer, EventTarget, Extended, ExtendedChannel, JudgeLine,
    LayerChannel,
};
pub use note::{Judgement, Note, NoteKind};
pub use shader_effect::{ShaderEffect, ShaderValue, VarBinding};

use crate::error::{ChartError, ChartResult};

/// Runtime identity of a note, stable across remove/undo.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NoteId(pub u64);

/// Runtime identity of an event, stable across remove/undo.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EventId(pub u64);

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ChartMeta {
    pub name: String,
    pub level: String,
    #[serde(default)]
    pub composer: String,
    /// Added to chart time to get audio time.
    #[serde(default)]
    pub offset_ms: f64,
}

#[derive(Deserialize)]
struct ChartFile {
    meta: ChartMeta,
    #[serde(default)]
    bpm: Vec<BpmPoint>,
    lines: Vec<JudgeLine>,
    #[serde(default)]
    effects: Vec<ShaderEffect>,
}

#[derive(Clone, Debug)]
pub struct Chart {
    meta: ChartMeta,
    bpm: BpmList,
    lines: Vec<JudgeLine>,
    effects: Vec<ShaderEffect>,
    next_id: u64,
}

// the id counter is bookkeeping, not content
impl PartialEq for Chart {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.bpm == other.bpm
            && self.lines == other.lines
            && self.effects == other.effects
    }
}

pub fn load_chart(bytes: &[u8]) -> anyhow::Result<Chart> {
    let file: ChartFile = serde_json::from_slice(bytes).context("failed to parse chart")?;
    let chart = Chart::new(file.meta, &file.bpm, file.lines, file.effects);
    log::info!(
        "loaded chart `{}` [{}]: {} lines, {} notes, {} effects",
        chart.meta.name,
        chart.meta.level,
        chart.lines.len(),
        chart.note_count(),
        chart.effects.len()
    );
    Ok(chart)
}

impl Chart {
    /// Assigns fresh ids, sorts event sequences, caches seconds and marks simultaneous notes.
    pub fn new(
        meta: ChartMeta,
        bpm: &[BpmPoint],
        lines: Vec<JudgeLine>,
        effects: Vec<ShaderEffect>,
    ) -> Self {
        let mut chart = Chart {
            meta,
            bpm: BpmList::new(bpm),
            lines,
            effects,
            next_id: 1,
        };
        let mut next_id = chart.next_id;
        for line in chart.lines.iter_mut() {
            line.sort_events();
            line.for_each_event_id(|id| {
                *id = EventId(next_id);
                next_id += 1;
            });
            for note in line.notes.iter_mut() {
                note.id = NoteId(next_id);
                next_id += 1;
            }
        }
        chart.next_id = next_id;
        chart.rebuild_time_cache();
        chart.mark_highlights();
        chart
    }

    pub fn meta(&self) -> &ChartMeta {
        &self.meta
    }

    pub fn bpm(&self) -> &BpmList {
        &self.bpm
    }

    pub fn lines(&self) -> &[JudgeLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> ChartResult<&JudgeLine> {
        self.lines.get(index).ok_or(ChartError::LineOutOfRange(index))
    }

    pub fn effects(&self) -> &[ShaderEffect] {
        &self.effects
    }

    pub fn offset_seconds(&self) -> f64 {
        self.meta.offset_ms / 1000.0
    }

    pub fn note_count(&self) -> usize {
        self.lines.iter().map(|l| l.notes.len()).sum()
    }

    /// Last moment anything in the chart happens.
    pub fn duration_seconds(&self) -> f64 {
        let notes = self
            .lines
            .iter()
            .flat_map(|l| l.notes.iter())
            .map(|n| n.end_seconds);
        let effects = self.effects.iter().map(|e| e.end_seconds);
        notes.chain(effects).fold(0.0, f64::max)
    }

    pub fn find_note(&self, line: usize, id: NoteId) -> ChartResult<&Note> {
        let line = self.line(line)?;
        line.notes
            .iter()
            .find(|n| n.id == id)
            .ok_or(ChartError::NoteNotFound(id))
    }

    pub fn find_event(&self, target: EventTarget, id: EventId) -> ChartResult<AnyEvent> {
        self.line(target.line)?
            .find_event(target.channel, id)
            .ok_or(ChartError::EventNotFound(id))
    }

    pub fn rebuild_time_cache(&mut self) {
        for line in self.lines.iter_mut() {
            for note in line.notes.iter_mut() {
                note.cache_seconds(&self.bpm);
            }
        }
        for effect in self.effects.iter_mut() {
            effect.cache_seconds(&self.bpm);
        }
    }

    /// Non-fake notes sharing a start beat with another one, on any line, are highlighted.
    fn mark_highlights(&mut self) {
        let mut counts: HashMap<Beat, usize> = HashMap::new();
        for note in self.lines.iter().flat_map(|l| l.notes.iter()) {
            if !note.fake {
                *counts.entry(note.start).or_insert(0) += 1;
            }
        }
        for note in self.lines.iter_mut().flat_map(|l| l.notes.iter_mut()) {
            note.highlighted = !note.fake && counts.get(&note.start).is_some_and(|c| *c > 1);
        }
    }

    pub(crate) fn allocate_note_id(&mut self) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn allocate_event_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [JudgeLine] {
        &mut self.lines
    }

    fn line_mut(&mut self, index: usize) -> ChartResult<&mut JudgeLine> {
        self.lines
            .get_mut(index)
            .ok_or(ChartError::LineOutOfRange(index))
    }

    pub(crate) fn set_father(&mut self, line: usize, father: i32) -> ChartResult<()> {
        self.line_mut(line)?.father = father;
        Ok(())
    }

    pub(crate) fn insert_note(&mut self, line: usize, index: usize, mut note: Note) -> ChartResult<()> {
        note.cache_seconds(&self.bpm);
        let notes = &mut self.line_mut(line)?.notes;
        let index = index.min(notes.len());
        notes.insert(index, note);
        self.mark_highlights();
        Ok(())
    }

    pub(crate) fn remove_note(&mut self, line: usize, id: NoteId) -> ChartResult<(usize, Note)> {
        let notes = &mut self.line_mut(line)?.notes;
        let index = notes
            .iter()
            .position(|n| n.id == id)
            .ok_or(ChartError::NoteNotFound(id))?;
        let note = notes.remove(index);
        self.mark_highlights();
        Ok((index, note))
    }

    pub(crate) fn replace_note(&mut self, line: usize, id: NoteId, mut note: Note) -> ChartResult<Note> {
        note.id = id;
        note.cache_seconds(&self.bpm);
        let notes = &mut self.line_mut(line)?.notes;
        let slot = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(ChartError::NoteNotFound(id))?;
        let before = std::mem::replace(slot, note);
        self.mark_highlights();
        Ok(before)
    }

    pub(crate) fn insert_event(&mut self, target: EventTarget, event: AnyEvent) -> ChartResult<()> {
        self.line_mut(target.line)?
            .insert_event(target.line, target.channel, event)
    }

    pub(crate) fn remove_event(&mut self, target: EventTarget, id: EventId) -> ChartResult<AnyEvent> {
        self.line_mut(target.line)?
            .remove_event(target.line, target.channel, id)
    }

    pub(crate) fn replace_event(
        &mut self,
        target: EventTarget,
        id: EventId,
        event: AnyEvent,
    ) -> ChartResult<AnyEvent> {
        self.line_mut(target.line)?
            .replace_event(target.line, target.channel, id, event)
    }
}
