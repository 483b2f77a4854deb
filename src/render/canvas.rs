//! Recording 2D canvas: draw calls become a flat command list that a backend rasterises.

use super::resources::TextureId;
use super::text::TextAlign;
use crate::geometry::{Rect, Vec2, Vec2Transform};

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCmd {
    Image {
        texture: TextureId,
        dest: Rect,
        uv: Rect,
        transform: Vec2Transform,
        tint: [f32; 4],
    },
    Fill {
        rect: Rect,
        transform: Vec2Transform,
        color: [f32; 4],
    },
    Text {
        text: String,
        size: f64,
        align: TextAlign,
        transform: Vec2Transform,
        color: [f32; 4],
    },
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCmd>,
}

impl DrawList {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Clone, Copy)]
struct CanvasState {
    transform: Vec2Transform,
    alpha: f64,
}

pub struct Canvas {
    width: f64,
    height: f64,
    state: CanvasState,
    stack: Vec<CanvasState>,
    list: DrawList,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Canvas {
            width,
            height,
            state: CanvasState {
                transform: Vec2Transform::IDENTITY,
                alpha: 1.0,
            },
            stack: Vec::new(),
            list: DrawList::default(),
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn save(&mut self) {
        self.stack.push(self.state);
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        self.state.transform = self
            .state
            .transform
            .then_local(Vec2Transform::translate(Vec2::new(x, y)));
    }

    pub fn rotate_degrees(&mut self, degrees: f64) {
        self.state.transform = self
            .state
            .transform
            .then_local(Vec2Transform::rotate_degrees(degrees));
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform = self.state.transform.then_local(Vec2Transform::scale(sx, sy));
    }

    /// Multiplies the current alpha, the way nested opacity groups combine.
    pub fn set_alpha(&mut self, alpha: f64) {
        self.state.alpha *= alpha.clamp(0.0, 1.0);
    }

    pub fn alpha(&self) -> f64 {
        self.state.alpha
    }

    pub fn current_transform(&self) -> Vec2Transform {
        self.state.transform
    }

    /// Maps a point from the current local frame to canvas pixels.
    pub fn map(&self, p: Vec2) -> Vec2 {
        p * self.state.transform
    }

    fn tinted(&self, color: [f64; 4]) -> [f32; 4] {
        [
            color[0] as f32,
            color[1] as f32,
            color[2] as f32,
            (color[3] * self.state.alpha) as f32,
        ]
    }

    pub fn draw_image(&mut self, texture: TextureId, dest: Rect, tint: [f64; 4]) {
        self.draw_image_uv(texture, dest, Rect::UNIT, tint);
    }

    pub fn draw_image_uv(&mut self, texture: TextureId, dest: Rect, uv: Rect, tint: [f64; 4]) {
        if self.state.alpha <= 0.0 {
            return;
        }
        let tint = self.tinted(tint);
        self.list.commands.push(DrawCmd::Image {
            texture,
            dest,
            uv,
            transform: self.state.transform,
            tint,
        });
    }

    pub fn fill_rect(&mut self, rect: Rect, color: [f64; 4]) {
        if self.state.alpha <= 0.0 {
            return;
        }
        let color = self.tinted(color);
        self.list.commands.push(DrawCmd::Fill {
            rect,
            transform: self.state.transform,
            color,
        });
    }

    pub fn draw_text(&mut self, text: &str, size: f64, align: TextAlign, color: [f64; 4]) {
        if self.state.alpha <= 0.0 || text.is_empty() {
            return;
        }
        let color = self.tinted(color);
        self.list.commands.push(DrawCmd::Text {
            text: text.to_string(),
            size,
            align,
            transform: self.state.transform,
            color,
        });
    }

    pub fn finish(self) -> DrawList {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_restore_scopes_transform_and_alpha() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.save();
        canvas.translate(50.0, 50.0);
        canvas.rotate_degrees(90.0);
        canvas.set_alpha(0.5);
        canvas.set_alpha(0.5);
        let p = canvas.map(Vec2::new(10.0, 0.0));
        assert!((p.x - 50.0).abs() < 1e-9 && (p.y - 60.0).abs() < 1e-9);
        assert_eq!(canvas.alpha(), 0.25);
        canvas.restore();
        assert_eq!(canvas.alpha(), 1.0);
        assert_eq!(canvas.current_transform(), Vec2Transform::IDENTITY);
    }

    #[test]
    fn transparent_draws_are_dropped() {
        let mut canvas = Canvas::new(10.0, 10.0);
        canvas.set_alpha(0.0);
        canvas.fill_rect(Rect::UNIT, [1.0; 4]);
        canvas.draw_text("1", 10.0, TextAlign::Center, [1.0; 4]);
        assert!(canvas.finish().is_empty());
    }
}
