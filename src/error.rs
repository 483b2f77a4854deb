use crate::chart::{EventId, NoteId};

pub type ChartResult<T> = Result<T, ChartError>;
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Lookups and edits that disagree with the live chart.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("judge line {0} does not exist")]
    LineOutOfRange(usize),

    #[error("judge line {line} has no event layer {layer}")]
    LayerOutOfRange { line: usize, layer: usize },

    #[error("note {0:?} not found")]
    NoteNotFound(NoteId),

    #[error("event {0:?} not found")]
    EventNotFound(EventId),

    #[error("event value kind does not match channel {0}")]
    EventKindMismatch(&'static str),

    #[error("event ends before it starts ({start} > {end})")]
    InvalidEventRange { start: f64, end: f64 },

    #[error("event [{start}, {end}] overlaps an existing event on channel {channel}")]
    EventOverlap {
        channel: &'static str,
        start: f64,
        end: f64,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("record `{0}` is already applied")]
    AlreadyApplied(String),

    #[error("record `{0}` is not applied")]
    NotApplied(String),

    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// Failures of a single post-processing pass.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CompositorError {
    #[error("shader `{0}` has no source")]
    MissingSource(String),

    #[error("shader `{name}` failed to compile:\n{log}")]
    Compile { name: String, log: String },

    #[error("shader `{name}` failed to link:\n{log}")]
    Link { name: String, log: String },

    #[error("no GPU context: {0}")]
    NoContext(String),
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(String),

    #[error(transparent)]
    Compositor(#[from] CompositorError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
