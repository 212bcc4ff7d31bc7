//! Ray-triangle intersection (Möller–Trumbore).

use irt_math::{Point3, Vec3};

use crate::{BoundingBox, Material, MaterialPoint, Primitive, Ray, Surface};

/// Determinants below this are treated as a ray parallel to the triangle.
const PARALLEL_EPSILON: f64 = 1e-12;

/// A single triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// First corner.
    pub a: Point3,
    /// Second corner.
    pub b: Point3,
    /// Third corner.
    pub c: Point3,
    /// Reflectance parameters.
    pub material: Material,
    edge1: Vec3,
    edge2: Vec3,
    normal: Vec3,
}

impl Triangle {
    /// Create a triangle from its corners.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        let edge1 = b - a;
        let edge2 = c - a;
        let normal = edge1.cross(&edge2).try_normalize(0.0).unwrap_or_else(Vec3::zeros);
        Self {
            a,
            b,
            c,
            material: Material::default(),
            edge1,
            edge2,
            normal,
        }
    }

    /// Replace the material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Geometric unit normal following the `a, b, c` winding.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

impl Primitive for Triangle {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        let d = ray.direction.as_ref();
        let p = d.cross(&self.edge2);
        let det = self.edge1.dot(&p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.a;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&self.edge1);
        let v = d.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = self.edge2.dot(&q) * inv_det;
        (t >= 0.0).then_some(t)
    }

    fn bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox::new(self.a, self.a);
        bb.include_point(&self.b);
        bb.include_point(&self.c);
        bb
    }
}

impl Surface for Triangle {
    /// Geometric normal, flipped to face the incoming ray.
    fn material_point(&self, ray: &Ray, _dist: f64) -> MaterialPoint {
        let normal = if self.normal.dot(ray.direction.as_ref()) > 0.0 {
            -self.normal
        } else {
            self.normal
        };
        MaterialPoint { normal }
    }

    fn material(&self) -> &Material {
        &self.material
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy_triangle() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_triangle_hit() {
        let tri = xy_triangle();
        let ray = Ray::new(Point3::new(0.25, 0.25, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let t = tri.intersect(&ray).unwrap();
        assert!((t - 5.0).abs() < 1e-12);
        let mp = tri.material_point(&ray, t);
        assert_eq!(mp.normal, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_triangle_outside_edges() {
        let tri = xy_triangle();
        let ray = Ray::new(Point3::new(0.75, 0.75, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(tri.intersect(&ray).is_none());
    }

    #[test]
    fn test_triangle_parallel_and_behind() {
        let tri = xy_triangle();
        let parallel = Ray::new(Point3::new(0.25, 0.25, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(tri.intersect(&parallel).is_none());
        let behind = Ray::new(Point3::new(0.25, 0.25, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(tri.intersect(&behind).is_none());
    }

    #[test]
    fn test_triangle_normal_faces_ray() {
        let tri = xy_triangle();
        let from_below = Ray::new(Point3::new(0.25, 0.25, -2.0), Vec3::new(0.0, 0.0, 1.0));
        let t = tri.intersect(&from_below).unwrap();
        assert_eq!(tri.material_point(&from_below, t).normal, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_triangle_bounds() {
        let tri = Triangle::new(
            Point3::new(-6.0, 0.0, 30.0),
            Point3::new(6.0, 6.0, 28.0),
            Point3::new(0.0, -6.0, 28.0),
        );
        let bb = tri.bounding_box();
        assert_eq!(bb.low, Point3::new(-6.0, -6.0, 28.0));
        assert_eq!(bb.high, Point3::new(6.0, 6.0, 30.0));
    }
}
