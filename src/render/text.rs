use super::font::{GLYPH_HEIGHT, GLYPH_WIDTH};
use super::resources::{ResourceProvider, TextureId};
use crate::geometry::Rect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphQuad {
    pub texture: TextureId,
    pub rect: Rect,
}

fn advance(size: f64) -> f64 {
    size * (GLYPH_WIDTH + 1) as f64 / GLYPH_HEIGHT as f64
}

/// Width of `text` at cap height `size`, without trailing spacing.
pub fn measure(text: &str, size: f64) -> f64 {
    let count = text.chars().count();
    if count == 0 {
        return 0.0;
    }
    advance(size) * count as f64 - size / GLYPH_HEIGHT as f64
}

/// Places glyph quads around the origin: `align` picks which end of the run sits at x = 0,
/// and the run is vertically centred on y = 0. Characters without a glyph keep their advance.
pub fn layout(
    resources: &dyn ResourceProvider,
    text: &str,
    size: f64,
    align: TextAlign,
) -> Vec<GlyphQuad> {
    let width = measure(text, size);
    let mut x = match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => -width / 2.0,
        TextAlign::Right => -width,
    };
    let glyph_width = size * GLYPH_WIDTH as f64 / GLYPH_HEIGHT as f64;
    let mut quads = Vec::new();
    for c in text.chars() {
        if let Some(texture) = resources.glyph(c) {
            quads.push(GlyphQuad {
                texture,
                rect: Rect::new(x, -size / 2.0, x + glyph_width, size / 2.0),
            });
        }
        x += advance(size);
    }
    quads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::render::resources::Skin;

    #[test]
    fn alignment_moves_the_run() {
        let skin = Skin::fallback(Settings::default().skin);
        let left = layout(&skin, "12", 14.0, TextAlign::Left);
        let right = layout(&skin, "12", 14.0, TextAlign::Right);
        assert_eq!(left.len(), 2);
        assert_eq!(left[0].rect.x0, 0.0);
        assert!((right[1].rect.x1).abs() < 1e-9);
        assert_eq!(left[0].rect.height(), 14.0);
    }

    #[test]
    fn spaces_advance_without_quads() {
        let skin = Skin::fallback(Settings::default().skin);
        let quads = layout(&skin, "A B", 7.0, TextAlign::Left);
        assert_eq!(quads.len(), 2);
        assert!((quads[1].rect.x0 - 12.0).abs() < 1e-9);
        assert!((measure("A B", 7.0) - 17.0).abs() < 1e-9);
    }
}
