//! Point lights.

use irt_math::{Color, Point3};

/// A point light with quadratic falloff.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Position of the light.
    pub center: Point3,
    /// Color at unit distance.
    pub color: Color,
}

impl Light {
    /// Create a light.
    pub fn new(center: Point3, color: Color) -> Self {
        Self { center, color }
    }

    /// Color received at `distance` from the light: `color / distance²`.
    pub fn color_at(&self, distance: f64) -> Color {
        self.color / (distance * distance)
    }
}
