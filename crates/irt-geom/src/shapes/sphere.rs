//! Ray-sphere intersection (quadratic equation).

use irt_math::{Point3, Vec3};

use crate::{BoundingBox, Material, MaterialPoint, Primitive, Ray, Surface};

/// A sphere given by center and radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    /// Center of the sphere.
    pub center: Point3,
    /// Radius of the sphere.
    pub radius: f64,
    /// Reflectance parameters.
    pub material: Material,
}

impl Sphere {
    /// Create a sphere with the default material.
    pub fn new(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            material: Material::default(),
        }
    }

    /// Replace the material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

impl Primitive for Sphere {
    /// Nearest non-negative root; the far root when the origin is inside.
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        let oc = ray.origin - self.center;
        let d = ray.direction.as_ref();

        // Unit direction: |oc + t*d|^2 = r^2 reduces to t^2 - 2*b*t + c = 0
        let b = -d.dot(&oc);
        let c = oc.norm_squared() - self.radius * self.radius;

        let delta = b * b - c;
        if delta < 0.0 {
            return None;
        }

        let disc = delta.sqrt();
        let near = b - disc;
        let t = if near < 0.0 { b + disc } else { near };
        (t >= 0.0).then_some(t)
    }

    fn bounding_box(&self) -> BoundingBox {
        let r = Vec3::repeat(self.radius);
        BoundingBox::new(self.center - r, self.center + r)
    }
}

impl Surface for Sphere {
    fn material_point(&self, ray: &Ray, dist: f64) -> MaterialPoint {
        MaterialPoint {
            normal: (ray.at(dist) - self.center).normalize(),
        }
    }

    fn material(&self) -> &Material {
        &self.material
    }
}
