//! The primitive capability consumed by the kd-tree, and the shading
//! extension consumed by the scene.

use std::fmt::Debug;
use std::sync::Arc;

use irt_math::{Color, Vec3};
use serde::{Deserialize, Serialize};

use crate::{BoundingBox, Ray};

/// Anything a kd-tree can partition and intersect.
pub trait Primitive {
    /// Distance along `ray` to the nearest intersection, if any.
    fn intersect(&self, ray: &Ray) -> Option<f64>;

    /// Axis-aligned bounds of the primitive.
    fn bounding_box(&self) -> BoundingBox;
}

impl<P: Primitive + ?Sized> Primitive for &P {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        (**self).intersect(ray)
    }

    fn bounding_box(&self) -> BoundingBox {
        (**self).bounding_box()
    }
}

impl<P: Primitive + ?Sized> Primitive for Box<P> {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        (**self).intersect(ray)
    }

    fn bounding_box(&self) -> BoundingBox {
        (**self).bounding_box()
    }
}

impl<P: Primitive + ?Sized> Primitive for Arc<P> {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        (**self).intersect(ray)
    }

    fn bounding_box(&self) -> BoundingBox {
        (**self).bounding_box()
    }
}

/// Surface characteristics of a primitive at a hit point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialPoint {
    /// Unit normal at the hit point.
    pub normal: Vec3,
}

/// Reflectance parameters of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Diffuse color.
    pub color: Color,
    /// Weight of the mirror-reflected contribution.
    pub reflection: f64,
    /// Weight of the Lambertian light contribution.
    pub diffuse: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::new(1.0, 1.0, 1.0),
            reflection: 0.0,
            diffuse: 1.0,
        }
    }
}

impl Material {
    /// A purely diffuse material of the given color.
    pub fn diffuse(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Set the reflection weight.
    pub fn with_reflection(mut self, reflection: f64) -> Self {
        self.reflection = reflection;
        self
    }
}

/// A primitive that can be shaded.
pub trait Surface: Primitive + Debug + Send + Sync {
    /// Surface characteristics at distance `dist` along `ray`.
    fn material_point(&self, ray: &Ray, dist: f64) -> MaterialPoint;

    /// Reflectance parameters.
    fn material(&self) -> &Material;
}
