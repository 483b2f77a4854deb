pub mod rect;
pub mod vec2;
pub mod vec2_transform;

pub use rect::Rect;
pub use vec2::Vec2;
pub use vec2_transform::Vec2Transform;
