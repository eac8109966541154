use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Pan/zoom transform from tree space to screen space
///
/// `screen = tree * k + (x, y)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn new(x: f64, y: f64, k: f64) -> Self {
        Self { x, y, k }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    pub fn invert(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.k, (screen.y - self.y) / self.k)
    }

    pub fn translate_by(&self, dx: f64, dy: f64) -> Transform {
        Transform::new(self.x + dx, self.y + dy, self.k)
    }

    /// Interpolate translation and scale component-wise
    pub fn lerp(&self, to: &Transform, t: f64) -> Transform {
        Transform::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.k + (to.k - self.k) * t,
        )
    }

    /// `translate(x,y) scale(k)` as an SVG transform attribute
    pub fn to_svg(&self) -> String {
        format!("translate({},{}) scale({})", self.x, self.y, self.k)
    }
}
