//! Axis-aligned box shape, intersected with the bounding box slab test.

use irt_math::{Point3, Vec3};

use crate::{BoundingBox, Material, MaterialPoint, Primitive, Ray, Surface};

/// An axis-aligned box.
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    /// Minimum corner.
    pub low: Point3,
    /// Maximum corner.
    pub high: Point3,
    /// Reflectance parameters.
    pub material: Material,
}

impl Cuboid {
    /// Create a box from two corners given in any order.
    pub fn new(a: Point3, b: Point3) -> Self {
        Self {
            low: a.inf(&b),
            high: a.sup(&b),
            material: Material::default(),
        }
    }

    /// Replace the material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

impl Primitive for Cuboid {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        self.bounding_box()
            .entry_exit_distances(ray)
            .map(|(t_near, _)| t_near)
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.low, self.high)
    }
}

impl Surface for Cuboid {
    /// Outward normal of the face closest to the hit point.
    fn material_point(&self, ray: &Ray, dist: f64) -> MaterialPoint {
        let p = ray.at(dist);
        let mut best = f64::INFINITY;
        let mut normal = Vec3::zeros();

        for i in 0..3 {
            let to_low = (p[i] - self.low[i]).abs();
            if to_low < best {
                best = to_low;
                normal = Vec3::zeros();
                normal[i] = -1.0;
            }
            let to_high = (p[i] - self.high[i]).abs();
            if to_high < best {
                best = to_high;
                normal = Vec3::zeros();
                normal[i] = 1.0;
            }
        }

        MaterialPoint { normal }
    }

    fn material(&self) -> &Material {
        &self.material
    }
}
