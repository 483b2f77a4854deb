pub mod curve;
pub mod floor;
pub mod resolver;

pub use curve::{evaluate, evaluate_binding};
pub use floor::FloorTrack;
pub use resolver::{CycleHealed, LineState, ResolveFields, resolve, resolve_all};
