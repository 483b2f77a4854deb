pub mod record;

use crate::chart::judge_line::EventTarget;
use crate::chart::{AnyEvent, Chart, EventId, Note, NoteId};
use crate::error::{ChartError, HistoryError, HistoryResult};

pub use record::{Entry, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Record,
    Undo,
    Redo,
}

/// Raised once per externally visible history change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub description: String,
    pub undo_size: usize,
    pub redo_size: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct HistorySize {
    pub undo: usize,
    pub redo: usize,
}

/// Undo/redo stacks over a chart. Every recorded mutation is applied immediately; inside a group
/// the applied records are collected and pushed as one entry when the group closes.
#[derive(Default)]
pub struct History {
    undo: Vec<Entry>,
    redo: Vec<Entry>,
    group: Option<Vec<Entry>>,
    changes: Vec<Change>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    pub fn get_size(&self) -> HistorySize {
        HistorySize {
            undo: self.undo.len(),
            redo: self.redo.len(),
        }
    }

    pub fn is_grouping(&self) -> bool {
        self.group.is_some()
    }

    /// Drains pending change notifications, oldest first.
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    fn notify(&mut self, kind: ChangeKind, description: String) {
        let size = self.get_size();
        log::debug!(
            "history {kind:?}: {description} (undo {}, redo {})",
            size.undo,
            size.redo
        );
        self.changes.push(Change {
            kind,
            description,
            undo_size: size.undo,
            redo_size: size.redo,
        });
    }

    fn record(&mut self, chart: &mut Chart, record: Record) -> HistoryResult<()> {
        let mut entry = Entry::new(record);
        entry.redo(chart)?;
        match self.group.as_mut() {
            Some(children) => children.push(entry),
            None => {
                let description = entry.describe();
                self.undo.push(entry);
                self.redo.clear();
                self.notify(ChangeKind::Record, description);
            }
        }
        Ok(())
    }

    /// Opens a group. Calling it while a group is open keeps the open group.
    pub fn group(&mut self) {
        if self.group.is_some() {
            log::debug!("history group already open");
            return;
        }
        self.group = Some(Vec::new());
    }

    /// Closes the open group, if any. An empty group leaves no trace.
    pub fn ungroup(&mut self) {
        let Some(children) = self.group.take() else {
            return;
        };
        if children.is_empty() {
            return;
        }
        let entry = record::applied_group(children);
        let description = entry.describe();
        self.undo.push(entry);
        self.redo.clear();
        self.notify(ChangeKind::Record, description);
    }

    pub fn undo(&mut self, chart: &mut Chart) -> HistoryResult<()> {
        self.ungroup();
        let Some(mut entry) = self.undo.pop() else {
            return Err(HistoryError::NothingToUndo);
        };
        if let Err(e) = entry.undo(chart) {
            self.undo.push(entry);
            return Err(e);
        }
        let description = entry.describe();
        self.redo.push(entry);
        self.notify(ChangeKind::Undo, description);
        Ok(())
    }

    pub fn redo(&mut self, chart: &mut Chart) -> HistoryResult<()> {
        self.ungroup();
        let Some(mut entry) = self.redo.pop() else {
            return Err(HistoryError::NothingToRedo);
        };
        if let Err(e) = entry.redo(chart) {
            self.redo.push(entry);
            return Err(e);
        }
        let description = entry.describe();
        self.undo.push(entry);
        self.notify(ChangeKind::Redo, description);
        Ok(())
    }

    /// Adds `note` to `line`, keeping the line's notes ordered by start. Returns the new id.
    pub fn add_note(&mut self, chart: &mut Chart, line: usize, mut note: Note) -> HistoryResult<NoteId> {
        let index = chart
            .line(line)?
            .notes
            .partition_point(|n| n.start <= note.start);
        note.id = chart.allocate_note_id();
        let id = note.id;
        self.record(chart, Record::AddNote { line, index, note })?;
        Ok(id)
    }

    pub fn remove_note(&mut self, chart: &mut Chart, line: usize, id: NoteId) -> HistoryResult<Note> {
        let notes = &chart.line(line)?.notes;
        let index = notes
            .iter()
            .position(|n| n.id == id)
            .ok_or(ChartError::NoteNotFound(id))?;
        let note = notes[index].clone();
        self.record(
            chart,
            Record::RemoveNote {
                line,
                index,
                note: note.clone(),
            },
        )?;
        Ok(note)
    }

    /// Edits a note in place through `edit`. An edit that changes nothing is not recorded.
    pub fn modify_note(
        &mut self,
        chart: &mut Chart,
        line: usize,
        id: NoteId,
        edit: impl FnOnce(&mut Note),
    ) -> HistoryResult<()> {
        let before = chart.find_note(line, id)?.clone();
        let mut after = before.clone();
        edit(&mut after);
        after.id = id;
        if after == before {
            return Ok(());
        }
        self.record(chart, Record::ModifyNote { line, before, after })
    }

    pub fn add_event(
        &mut self,
        chart: &mut Chart,
        target: EventTarget,
        event: impl Into<AnyEvent>,
    ) -> HistoryResult<EventId> {
        let mut event = event.into();
        chart.line(target.line)?;
        let id = chart.allocate_event_id();
        event.set_id(id);
        self.record(chart, Record::AddEvent { target, event })?;
        Ok(id)
    }

    pub fn remove_event(
        &mut self,
        chart: &mut Chart,
        target: EventTarget,
        id: EventId,
    ) -> HistoryResult<AnyEvent> {
        let event = chart.find_event(target, id)?;
        self.record(
            chart,
            Record::RemoveEvent {
                target,
                event: event.clone(),
            },
        )?;
        Ok(event)
    }

    pub fn modify_event(
        &mut self,
        chart: &mut Chart,
        target: EventTarget,
        id: EventId,
        edit: impl FnOnce(&mut AnyEvent),
    ) -> HistoryResult<()> {
        let before = chart.find_event(target, id)?;
        let mut after = before.clone();
        edit(&mut after);
        after.set_id(id);
        if after == before {
            return Ok(());
        }
        self.record(
            chart,
            Record::ModifyEvent {
                target,
                before,
                after,
            },
        )
    }
}
