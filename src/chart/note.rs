use serde::{Deserialize, Serialize};

use super::NoteId;
use super::beat::{Beat, BpmList};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Tap,
    Drag,
    Flick,
    Hold,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Judgement {
    #[default]
    None,
    Perfect,
    Good,
    Bad,
}

fn one() -> f64 {
    1.0
}

fn unlimited() -> f64 {
    f64::INFINITY
}

fn default_above() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Note {
    #[serde(skip)]
    pub id: NoteId,
    pub kind: NoteKind,
    pub start: Beat,
    /// Equal to `start` for everything but holds.
    pub end: Beat,
    #[serde(skip)]
    pub start_seconds: f64,
    #[serde(skip)]
    pub end_seconds: f64,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default = "one")]
    pub size: f64,
    #[serde(default = "one")]
    pub speed: f64,
    #[serde(default)]
    pub y_offset: f64,
    #[serde(default = "default_above")]
    pub above: bool,
    #[serde(skip)]
    pub highlighted: bool,
    #[serde(default)]
    pub fake: bool,
    /// Seconds before its time during which the note may be drawn.
    #[serde(default = "unlimited")]
    pub visible_time: f64,
    #[serde(skip)]
    pub judgement: Judgement,
    #[serde(skip)]
    pub hit_time: Option<f64>,
}

impl Note {
    pub fn new(kind: NoteKind, start: Beat, end: Beat) -> Self {
        Note {
            id: NoteId::default(),
            kind,
            start,
            end: if kind == NoteKind::Hold { end } else { start },
            start_seconds: 0.0,
            end_seconds: 0.0,
            position_x: 0.0,
            size: 1.0,
            speed: 1.0,
            y_offset: 0.0,
            above: true,
            highlighted: false,
            fake: false,
            visible_time: f64::INFINITY,
            judgement: Judgement::None,
            hit_time: None,
        }
    }

    pub fn tap(start: Beat) -> Self {
        Note::new(NoteKind::Tap, start, start)
    }

    pub fn hold(start: Beat, end: Beat) -> Self {
        Note::new(NoteKind::Hold, start, end)
    }

    pub fn is_hold(&self) -> bool {
        self.kind == NoteKind::Hold
    }

    pub fn cache_seconds(&mut self, bpm: &BpmList) {
        self.start_seconds = bpm.beat_to_seconds(self.start.value());
        self.end_seconds = if self.is_hold() {
            bpm.beat_to_seconds(self.end.value()).max(self.start_seconds)
        } else {
            self.start_seconds
        };
    }

    /// A hold is being judged while the playhead is inside it and it was not judged bad.
    pub fn is_being_held(&self, now: f64) -> bool {
        self.is_hold()
            && self.start_seconds <= now
            && now < self.end_seconds
            && self.judgement != Judgement::Bad
    }
}
