use crate::geometry::vec2::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub const UNIT: Rect = Rect {
        x0: 0.0,
        y0: 0.0,
        x1: 1.0,
        y1: 1.0,
    };

    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Rect { x0, y0, x1, y1 }
    }

    pub fn centered(center: Vec2, width: f64, height: f64) -> Self {
        Rect {
            x0: center.x - width / 2.0,
            y0: center.y - height / 2.0,
            x1: center.x + width / 2.0,
            y1: center.y + height / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x0, self.y0),
            Vec2::new(self.x1, self.y0),
            Vec2::new(self.x0, self.y1),
            Vec2::new(self.x1, self.y1),
        ]
    }
}
