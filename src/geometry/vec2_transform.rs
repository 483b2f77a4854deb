use std::ops::Mul;

use crate::geometry::vec2::Vec2;

/// Affine 2D transform stored as the top two rows of a 3x3 matrix (the last row is implied).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec2Transform {
    matrix: [[f64; 3]; 3],
}

impl Default for Vec2Transform {
    fn default() -> Self {
        Vec2Transform::IDENTITY
    }
}

impl Mul<Vec2Transform> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: Vec2Transform) -> Self::Output {
        let nom_x = rhs.matrix[0][0] * self.x + rhs.matrix[0][1] * self.y + rhs.matrix[0][2];
        let nom_y = rhs.matrix[1][0] * self.x + rhs.matrix[1][1] * self.y + rhs.matrix[1][2];
        Vec2 { x: nom_x, y: nom_y }
    }
}

/// Applies `left` first, then `rhs`.
pub fn merge(left: Vec2Transform, rhs: Vec2Transform) -> Vec2Transform {
    let mut result = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            result[i][j] = rhs.matrix[i][0] * left.matrix[0][j]
                + rhs.matrix[i][1] * left.matrix[1][j]
                + rhs.matrix[i][2] * left.matrix[2][j];
        }
    }
    Vec2Transform { matrix: result }
}

impl Vec2Transform {
    pub const IDENTITY: Vec2Transform = Vec2Transform {
        matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub fn translate(t: Vec2) -> Self {
        Vec2Transform {
            matrix: [[1.0, 0.0, t.x], [0.0, 1.0, t.y], [0.0, 0.0, 1.0]],
        }
    }

    /// Rotation in canvas space (y pointing down), so positive degrees turn clockwise on screen.
    pub fn rotate_degrees(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Vec2Transform {
            matrix: [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Vec2Transform {
            matrix: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Returns a transform that applies `local` in the coordinate frame of `self`,
    /// the way a 2D canvas composes `ctx.translate(..); ctx.rotate(..)`.
    pub fn then_local(self, local: Vec2Transform) -> Self {
        merge(local, self)
    }

    /// Whether the transform flips orientation (negative determinant).
    pub fn is_mirrored(&self) -> bool {
        self.matrix[0][0] * self.matrix[1][1] - self.matrix[0][1] * self.matrix[1][0] < 0.0
    }

    pub fn rows(&self) -> [[f64; 3]; 2] {
        [self.matrix[0], self.matrix[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn local_composition_matches_canvas_order() {
        // translate then rotate: local +x ends up below the pivot after a clockwise quarter turn
        let t = Vec2Transform::translate(Vec2::new(100.0, 50.0))
            .then_local(Vec2Transform::rotate_degrees(90.0));
        assert!(close(Vec2::new(10.0, 0.0) * t, Vec2::new(100.0, 60.0)));
    }

    #[test]
    fn negative_scale_is_mirrored() {
        assert!(Vec2Transform::scale(1.0, -1.0).is_mirrored());
        assert!(!Vec2Transform::rotate_degrees(37.0).is_mirrored());
    }
}
