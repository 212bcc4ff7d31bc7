//! Ray representation.

use irt_math::{Dir3, Point3, Vec3};

/// A ray in 3D space defined by origin and unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized, so ray parameters are Euclidean
    /// distances from the origin.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: Dir3::new_normalize(direction),
        }
    }

    /// Create a ray, returning `None` for a (near) zero direction.
    pub fn try_new(origin: Point3, direction: Vec3) -> Option<Self> {
        Dir3::try_new(direction, 1e-12).map(|direction| Self { origin, direction })
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }

    /// Mirror this ray about `normal` at the point `t` along it.
    pub fn reflect(&self, t: f64, normal: &Vec3) -> Self {
        let d = self.direction.as_ref();
        let reflected = d - 2.0 * d.dot(normal) * normal;
        Self::new(self.at(t), reflected)
    }
}
