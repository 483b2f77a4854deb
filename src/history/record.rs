use crate::chart::judge_line::EventTarget;
use crate::chart::{AnyEvent, Chart, Note};
use crate::error::{HistoryError, HistoryResult};

/// One reversible chart mutation. Each variant carries exactly what it needs to go both ways.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    AddNote {
        line: usize,
        index: usize,
        note: Note,
    },
    /// `note` is the full snapshot taken at removal time, identity included.
    RemoveNote {
        line: usize,
        index: usize,
        note: Note,
    },
    ModifyNote {
        line: usize,
        before: Note,
        after: Note,
    },
    AddEvent {
        target: EventTarget,
        event: AnyEvent,
    },
    RemoveEvent {
        target: EventTarget,
        event: AnyEvent,
    },
    ModifyEvent {
        target: EventTarget,
        before: AnyEvent,
        after: AnyEvent,
    },
    Group(Vec<Entry>),
}

impl Record {
    pub fn describe(&self) -> String {
        match self {
            Record::AddNote { line, note, .. } => {
                format!("add {:?} note {} on line {line}", note.kind, note.id.0)
            }
            Record::RemoveNote { line, note, .. } => {
                format!("remove {:?} note {} on line {line}", note.kind, note.id.0)
            }
            Record::ModifyNote { line, after, .. } => {
                format!("modify note {} on line {line}", after.id.0)
            }
            Record::AddEvent { target, event } => format!(
                "add {} event {} on line {}",
                target.channel.name(),
                event.id().0,
                target.line
            ),
            Record::RemoveEvent { target, event } => format!(
                "remove {} event {} on line {}",
                target.channel.name(),
                event.id().0,
                target.line
            ),
            Record::ModifyEvent { target, after, .. } => format!(
                "modify {} event {} on line {}",
                target.channel.name(),
                after.id().0,
                target.line
            ),
            Record::Group(children) => format!("group of {}", children.len()),
        }
    }

    fn forward(&mut self, chart: &mut Chart) -> HistoryResult<()> {
        match self {
            Record::AddNote { line, index, note } => {
                chart.insert_note(*line, *index, note.clone())?;
            }
            Record::RemoveNote { line, note, .. } => {
                chart.remove_note(*line, note.id)?;
            }
            Record::ModifyNote { line, before, after } => {
                chart.replace_note(*line, before.id, after.clone())?;
            }
            Record::AddEvent { target, event } => {
                chart.insert_event(*target, event.clone())?;
            }
            Record::RemoveEvent { target, event } => {
                chart.remove_event(*target, event.id())?;
            }
            Record::ModifyEvent {
                target,
                before,
                after,
            } => {
                chart.replace_event(*target, before.id(), after.clone())?;
            }
            Record::Group(children) => {
                for done in 0..children.len() {
                    if let Err(e) = children[done].redo(chart) {
                        for child in children[..done].iter_mut().rev() {
                            rollback_step(child.undo(chart), child);
                        }
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    fn backward(&mut self, chart: &mut Chart) -> HistoryResult<()> {
        match self {
            Record::AddNote { line, note, .. } => {
                chart.remove_note(*line, note.id)?;
            }
            Record::RemoveNote { line, index, note } => {
                chart.insert_note(*line, *index, note.clone())?;
            }
            Record::ModifyNote { line, before, after } => {
                chart.replace_note(*line, after.id, before.clone())?;
            }
            Record::AddEvent { target, event } => {
                chart.remove_event(*target, event.id())?;
            }
            Record::RemoveEvent { target, event } => {
                chart.insert_event(*target, event.clone())?;
            }
            Record::ModifyEvent {
                target,
                before,
                after,
            } => {
                chart.replace_event(*target, after.id(), before.clone())?;
            }
            Record::Group(children) => {
                let len = children.len();
                for done in 0..len {
                    let index = len - 1 - done;
                    if let Err(e) = children[index].undo(chart) {
                        // re-apply what was already undone, oldest first
                        for child in children[index + 1..].iter_mut() {
                            rollback_step(child.redo(chart), child);
                        }
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }
}

fn rollback_step(result: HistoryResult<()>, child: &Entry) {
    if let Err(e) = result {
        log::error!("group rollback failed at `{}`: {e}", child.describe());
    }
}

/// A record plus its applied flag; `redo` and `undo` must alternate.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    record: Record,
    applied: bool,
}

impl Entry {
    pub fn new(record: Record) -> Self {
        Entry {
            record,
            applied: false,
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn describe(&self) -> String {
        self.record.describe()
    }

    pub fn redo(&mut self, chart: &mut Chart) -> HistoryResult<()> {
        if self.applied {
            return Err(HistoryError::AlreadyApplied(self.describe()));
        }
        self.record.forward(chart)?;
        self.applied = true;
        Ok(())
    }

    pub fn undo(&mut self, chart: &mut Chart) -> HistoryResult<()> {
        if !self.applied {
            return Err(HistoryError::NotApplied(self.describe()));
        }
        self.record.backward(chart)?;
        self.applied = false;
        Ok(())
    }
}

/// Builds an applied group entry from children that were applied as they were recorded.
pub(crate) fn applied_group(children: Vec<Entry>) -> Entry {
    Entry {
        record: Record::Group(children),
        applied: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::beat::Beat;
    use crate::chart::event::Event;
    use crate::chart::judge_line::{EventTarget, JudgeLine, LayerChannel};
    use crate::chart::tests::{chart_of, line_with_notes};
    use crate::chart::{EventId, NoteId};
    use proptest::prelude::*;

    fn sample_chart() -> Chart {
        let mut line = line_with_notes(vec![
            Note::tap(Beat::whole(1)),
            Note::hold(Beat::whole(2), Beat::whole(4)),
        ]);
        line.layers[0].move_x = vec![Event::constant(Beat::whole(0), Beat::whole(1), 5.0)];
        chart_of(vec![line, JudgeLine::default()])
    }

    fn move_x(line: usize) -> EventTarget {
        EventTarget::layer(line, 0, LayerChannel::MoveX)
    }

    fn records(chart: &Chart) -> Vec<Record> {
        let tap = chart.lines()[0].notes[0].clone();
        let hold = chart.lines()[0].notes[1].clone();
        let existing = AnyEvent::Numeric(chart.lines()[0].layers[0].move_x[0].clone());
        let mut fresh_note = Note::tap(Beat::new(3, 1, 2));
        fresh_note.id = NoteId(900);
        let mut fresh_event = Event::constant(Beat::whole(2), Beat::whole(3), 1.0);
        fresh_event.id = EventId(901);
        let mut moved_hold = hold.clone();
        moved_hold.position_x = 120.0;
        let mut changed_event = existing.clone();
        if let AnyEvent::Numeric(e) = &mut changed_event {
            e.end_value = -5.0;
        }
        vec![
            Record::AddNote {
                line: 1,
                index: 0,
                note: fresh_note.clone(),
            },
            Record::RemoveNote {
                line: 0,
                index: 0,
                note: tap,
            },
            Record::ModifyNote {
                line: 0,
                before: hold,
                after: moved_hold,
            },
            Record::AddEvent {
                target: move_x(1),
                event: AnyEvent::Numeric(fresh_event),
            },
            Record::RemoveEvent {
                target: move_x(0),
                event: existing.clone(),
            },
            Record::ModifyEvent {
                target: move_x(0),
                before: existing,
                after: changed_event,
            },
        ]
    }

    proptest! {
        #[test]
        fn every_record_round_trips(which in 0usize..7) {
            let mut chart = sample_chart();
            let all = records(&chart);
            let record = if which < all.len() {
                all[which].clone()
            } else {
                Record::Group(all[..3].iter().cloned().map(Entry::new).collect())
            };
            let mut entry = Entry::new(record);

            let before = chart.clone();
            entry.redo(&mut chart).unwrap();
            let after = chart.clone();
            prop_assert_ne!(&after, &before);
            entry.undo(&mut chart).unwrap();
            prop_assert_eq!(&chart, &before);
            entry.redo(&mut chart).unwrap();
            prop_assert_eq!(&chart, &after);
        }
    }

    #[test]
    fn redo_twice_is_a_contract_violation() {
        let mut chart = sample_chart();
        let mut entry = Entry::new(records(&chart).remove(0));
        entry.redo(&mut chart).unwrap();
        let snapshot = chart.clone();
        assert!(matches!(
            entry.redo(&mut chart),
            Err(HistoryError::AlreadyApplied(_))
        ));
        assert_eq!(chart, snapshot);
    }

    #[test]
    fn undo_before_redo_is_a_contract_violation() {
        let mut chart = sample_chart();
        let mut entry = Entry::new(records(&chart).remove(1));
        assert!(matches!(
            entry.undo(&mut chart),
            Err(HistoryError::NotApplied(_))
        ));
    }

    #[test]
    fn failing_child_rolls_the_group_back() {
        let mut chart = sample_chart();
        let mut all = records(&chart);
        let mut ghost = Note::tap(Beat::whole(9));
        ghost.id = NoteId(12345);
        let children = vec![
            Entry::new(all.remove(0)),
            Entry::new(Record::RemoveNote {
                line: 0,
                index: 0,
                note: ghost,
            }),
        ];
        let before = chart.clone();
        let mut group = Entry::new(Record::Group(children));
        let err = group.redo(&mut chart).unwrap_err();
        assert_eq!(err, HistoryError::Chart(crate::error::ChartError::NoteNotFound(NoteId(12345))));
        assert_eq!(chart, before);
        assert!(!group.is_applied());
    }
}
