//! Turns a draw list into textured triangles, grouped into runs that share a texture.

use std::ops::Range;

use super::types::SpriteVertex;
use crate::geometry::{Rect, Vec2, Vec2Transform};
use crate::render::text;
use crate::render::{DrawCmd, DrawList, ResourceProvider, TextureId};

#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub texture: TextureId,
    pub vertices: Range<u32>,
}

#[derive(Default)]
pub struct SpriteBatcher {
    pub vertices: Vec<SpriteVertex>,
    pub batches: Vec<Batch>,
}

impl SpriteBatcher {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.batches.clear();
    }

    fn push_quad(
        &mut self,
        texture: TextureId,
        dest: Rect,
        uv: Rect,
        transform: Vec2Transform,
        color: [f32; 4],
    ) {
        let start = self.vertices.len() as u32;
        let corners = dest.corners();
        let uvs = uv.corners();
        // two triangles over the corner order x0y0, x1y0, x0y1, x1y1
        for i in [0usize, 1, 2, 2, 1, 3] {
            let p: Vec2 = corners[i] * transform;
            self.vertices.push(SpriteVertex {
                position: [p.x as f32, p.y as f32],
                uv: [uvs[i].x as f32, uvs[i].y as f32],
                color,
            });
        }
        let end = self.vertices.len() as u32;
        match self.batches.last_mut() {
            Some(last) if last.texture == texture && last.vertices.end == start => {
                last.vertices.end = end;
            }
            _ => self.batches.push(Batch {
                texture,
                vertices: start..end,
            }),
        }
    }

    /// Appends `list` in order; consecutive draws of one texture share a batch.
    pub fn extend(&mut self, list: &DrawList, resources: &dyn ResourceProvider) {
        for cmd in &list.commands {
            match cmd {
                DrawCmd::Image {
                    texture,
                    dest,
                    uv,
                    transform,
                    tint,
                } => self.push_quad(*texture, *dest, *uv, *transform, *tint),
                DrawCmd::Fill {
                    rect,
                    transform,
                    color,
                } => self.push_quad(resources.white(), *rect, Rect::UNIT, *transform, *color),
                DrawCmd::Text {
                    text,
                    size,
                    align,
                    transform,
                    color,
                } => {
                    for glyph in text::layout(resources, text, *size, *align) {
                        self.push_quad(glyph.texture, glyph.rect, Rect::UNIT, *transform, *color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::render::{Canvas, Skin, TextAlign};

    #[test]
    fn fills_share_the_white_batch() {
        let skin = Skin::fallback(Settings::default().skin);
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), [1.0; 4]);
        canvas.fill_rect(Rect::new(20.0, 0.0, 30.0, 10.0), [0.5; 4]);
        let mut batcher = SpriteBatcher::default();
        batcher.extend(&canvas.finish(), &skin);
        assert_eq!(batcher.vertices.len(), 12);
        assert_eq!(
            batcher.batches,
            vec![Batch {
                texture: skin.white(),
                vertices: 0..12
            }]
        );
    }

    #[test]
    fn transform_is_applied_to_corners() {
        let skin = Skin::fallback(Settings::default().skin);
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.translate(50.0, 40.0);
        canvas.fill_rect(Rect::new(-1.0, -1.0, 1.0, 1.0), [1.0; 4]);
        let mut batcher = SpriteBatcher::default();
        batcher.extend(&canvas.finish(), &skin);
        assert_eq!(batcher.vertices[0].position, [49.0, 39.0]);
        assert_eq!(batcher.vertices[5].position, [51.0, 41.0]);
        assert_eq!(batcher.vertices[5].uv, [1.0, 1.0]);
    }

    #[test]
    fn texture_changes_split_batches() {
        let skin = Skin::fallback(Settings::default().skin);
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.fill_rect(Rect::UNIT, [1.0; 4]);
        canvas.draw_text("10", 20.0, TextAlign::Left, [1.0; 4]);
        canvas.fill_rect(Rect::UNIT, [1.0; 4]);
        let mut batcher = SpriteBatcher::default();
        batcher.extend(&canvas.finish(), &skin);
        assert_eq!(batcher.vertices.len(), 6 * 4);
        assert_eq!(batcher.batches.len(), 4);
        assert_eq!(batcher.batches[3].vertices, 18..24);
    }
}
