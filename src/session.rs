//! An open chart: the chart itself, its edit history, the playback clock and the frame target.

use crate::chart::judge_line::EventTarget;
use crate::chart::{AnyEvent, Chart, EventId, Note, NoteId};
use crate::config::Settings;
use crate::error::{HistoryResult, RenderError};
use crate::history::{Change, History, HistorySize};
use crate::judge;
use crate::render::{self, FrameBackend, FrameReport, ResourceProvider};

/// Playback position in audio seconds.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Clock {
    position: f64,
    playing: bool,
}

impl Clock {
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn advance(&mut self, dt: f64) {
        if self.playing && dt > 0.0 {
            self.position += dt;
        }
    }

    pub fn seek(&mut self, position: f64) {
        self.position = position.max(0.0);
    }
}

pub struct Session<B: FrameBackend> {
    chart: Chart,
    history: History,
    settings: Settings,
    resources: Box<dyn ResourceProvider>,
    backend: B,
    clock: Clock,
}

impl<B: FrameBackend> Session<B> {
    pub fn new(
        chart: Chart,
        settings: Settings,
        resources: Box<dyn ResourceProvider>,
        backend: B,
    ) -> Self {
        log::info!(
            "opened `{}` ({} lines, {} notes)",
            chart.meta().name,
            chart.lines().len(),
            chart.note_count()
        );
        Session {
            chart,
            history: History::new(),
            settings,
            resources,
            backend,
            clock: Clock::default(),
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Chart seconds at the current playback position.
    pub fn chart_time(&self) -> f64 {
        self.clock.position() - self.chart.offset_seconds()
    }

    pub fn play(&mut self) {
        self.clock.playing = true;
    }

    pub fn pause(&mut self) {
        self.clock.playing = false;
    }

    pub fn toggle_play(&mut self) {
        self.clock.playing = !self.clock.playing;
    }

    pub fn seek(&mut self, position: f64) {
        self.clock.seek(position);
    }

    pub fn seek_by(&mut self, delta: f64) {
        self.clock.seek(self.clock.position() + delta);
    }

    pub fn advance(&mut self, dt: f64) {
        self.clock.advance(dt);
    }

    /// Judges the chart up to the playhead and renders one frame of it.
    pub fn render_frame(&mut self) -> Result<FrameReport, RenderError> {
        let now = self.chart_time();
        judge::autoplay(&mut self.chart, now);
        render::render_frame(
            &mut self.chart,
            now,
            &self.settings,
            self.resources.as_ref(),
            &mut self.backend,
        )
    }

    pub fn add_note(&mut self, line: usize, note: Note) -> HistoryResult<NoteId> {
        self.history.add_note(&mut self.chart, line, note)
    }

    pub fn remove_note(&mut self, line: usize, id: NoteId) -> HistoryResult<Note> {
        self.history.remove_note(&mut self.chart, line, id)
    }

    pub fn modify_note(
        &mut self,
        line: usize,
        id: NoteId,
        edit: impl FnOnce(&mut Note),
    ) -> HistoryResult<()> {
        self.history.modify_note(&mut self.chart, line, id, edit)
    }

    pub fn add_event(
        &mut self,
        target: EventTarget,
        event: impl Into<AnyEvent>,
    ) -> HistoryResult<EventId> {
        self.history.add_event(&mut self.chart, target, event)
    }

    pub fn remove_event(&mut self, target: EventTarget, id: EventId) -> HistoryResult<AnyEvent> {
        self.history.remove_event(&mut self.chart, target, id)
    }

    pub fn modify_event(
        &mut self,
        target: EventTarget,
        id: EventId,
        edit: impl FnOnce(&mut AnyEvent),
    ) -> HistoryResult<()> {
        self.history.modify_event(&mut self.chart, target, id, edit)
    }

    pub fn undo(&mut self) -> HistoryResult<()> {
        self.history.undo(&mut self.chart)
    }

    pub fn redo(&mut self) -> HistoryResult<()> {
        self.history.redo(&mut self.chart)
    }

    pub fn group(&mut self) {
        self.history.group();
    }

    pub fn ungroup(&mut self) {
        self.history.ungroup();
    }

    pub fn get_size(&self) -> HistorySize {
        self.history.get_size()
    }

    pub fn take_changes(&mut self) -> Vec<Change> {
        self.history.take_changes()
    }
}
