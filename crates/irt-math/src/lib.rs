#![warn(missing_docs)]

//! Math types for the IRT ray tracer.
//!
//! Thin wrappers around nalgebra providing the point, vector and color
//! types shared by the geometry, kd-tree and scene crates, plus the
//! [`Axis`] enum used to name split planes.

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// An RGB color with unbounded linear components.
pub type Color = Vector3<f64>;

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// The x axis (index 0).
    X,
    /// The y axis (index 1).
    Y,
    /// The z axis (index 2).
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis (0, 1 or 2).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Axis for a component index, `None` outside `0..3`.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }

    /// The axis at `(index + 1) mod 3`.
    #[inline]
    pub fn next(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    /// The axis at `(index + 2) mod 3`.
    #[inline]
    pub fn prev(self) -> Self {
        match self {
            Axis::X => Axis::Z,
            Axis::Y => Axis::X,
            Axis::Z => Axis::Y,
        }
    }
}

/// Point coordinates as a plain array, for serialization.
pub fn point_to_array(p: &Point3) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// Build a point from a plain array.
pub fn point_from_array(a: [f64; 3]) -> Point3 {
    Point3::new(a[0], a[1], a[2])
}
