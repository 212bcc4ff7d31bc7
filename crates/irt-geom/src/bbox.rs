//! Axis-aligned bounding box with slab test and surface-area cost.
//!
//! Used per primitive, per kd-tree node and once for the whole scene.

use irt_math::{Axis, Point3, Vec3};

use crate::Ray;

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub low: Point3,
    /// Maximum corner.
    pub high: Point3,
}

impl BoundingBox {
    /// Create a box from min and max corners.
    pub fn new(low: Point3, high: Point3) -> Self {
        Self { low, high }
    }

    /// Create an empty (inverted) box suitable for accumulation.
    ///
    /// Uses the finite extremes so an accidental cost evaluation on an
    /// empty box stays free of NaN.
    pub fn empty() -> Self {
        Self {
            low: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            high: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// True when `low <= high` on every axis.
    pub fn is_valid(&self) -> bool {
        self.low.x <= self.high.x && self.low.y <= self.high.y && self.low.z <= self.high.z
    }

    /// Extents `high - low`.
    pub fn extent(&self) -> Vec3 {
        self.high - self.low
    }

    /// Expand this box to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.low = self.low.inf(p);
        self.high = self.high.sup(p);
    }

    /// Expand this box to include another box.
    pub fn include(&mut self, other: &BoundingBox) {
        self.low = self.low.inf(&other.low);
        self.high = self.high.sup(&other.high);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut merged = *self;
        merged.include(other);
        merged
    }

    /// Test if a point lies inside the box (boundary included).
    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|i| p[i] >= self.low[i] && p[i] <= self.high[i])
    }

    /// The part of this box below `position` on `axis`.
    pub fn clipped_high(&self, axis: Axis, position: f64) -> BoundingBox {
        let mut clipped = *self;
        clipped.high[axis.index()] = position;
        clipped
    }

    /// The part of this box above `position` on `axis`.
    pub fn clipped_low(&self, axis: Axis, position: f64) -> BoundingBox {
        let mut clipped = *self;
        clipped.low[axis.index()] = position;
        clipped
    }

    /// Surface area `2 * (dx*dy + dx*dz + dy*dz)`.
    ///
    /// Only meaningful as a relative cost; negative extents give
    /// unspecified values.
    pub fn surface_area_cost(&self) -> f64 {
        let d = self.extent();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Entry and exit ray parameters over which the ray is inside the box
    /// on all three axes at once.
    ///
    /// The interval starts as `[f64::EPSILON, f64::MAX]` and is narrowed
    /// axis by axis. A zero direction component leaves the interval
    /// unchanged for that axis unless the origin lies outside the slab, in
    /// which case the box is missed.
    pub fn entry_exit_distances(&self, ray: &Ray) -> Option<(f64, f64)> {
        let mut t_far = f64::MAX;
        let mut t_near = f64::EPSILON;

        for i in 0..3 {
            let origin = ray.origin[i];
            let direction = ray.direction[i];
            let (low, high) = (self.low[i], self.high[i]);
            let pos_far = origin + t_far * direction;
            let pos_near = origin + t_near * direction;

            if direction < 0.0 {
                if pos_far < low {
                    t_far = (low - origin) / direction;
                } else if pos_far > high {
                    t_far = f64::EPSILON;
                }
                if pos_near > high {
                    t_near = (high - origin) / direction;
                } else if pos_near < low {
                    t_near = f64::MAX;
                }
            } else if direction > 0.0 {
                if pos_far > high {
                    t_far = (high - origin) / direction;
                } else if pos_far < low {
                    t_far = f64::EPSILON;
                }
                if pos_near < low {
                    t_near = (low - origin) / direction;
                } else if pos_near > high {
                    t_near = f64::MAX;
                }
            } else if origin < low || origin > high {
                return None;
            }

            if t_near > t_far {
                return None;
            }
        }

        Some((t_near, t_far))
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}
