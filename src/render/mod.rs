pub mod background;
pub mod canvas;
pub mod font;
pub mod lines;
pub mod notes;
pub mod pipeline;
pub mod resources;
pub mod text;
pub mod ui;

pub use canvas::{Canvas, DrawCmd, DrawList};
pub use pipeline::{FrameBackend, FrameReport, PassOutcome, ShaderPass, collect_passes, render_frame};
pub use resources::{NoteSprite, ResourceProvider, Skin, Texture, TextureId, decode_image};
pub use text::TextAlign;
