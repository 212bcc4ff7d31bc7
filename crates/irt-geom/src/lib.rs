#![warn(missing_docs)]

//! Rays, bounding boxes and primitive shapes for the IRT ray tracer.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray representation with origin and unit direction
//! - [`BoundingBox`] - Slab test and surface-area cost
//! - [`Primitive`] - The capability the kd-tree is generic over
//! - [`Surface`] - A primitive that also carries shading data
//! - [`shapes`] - Spheres, boxes and triangles
//!
//! # Example
//!
//! ```
//! use irt_geom::{shapes::Sphere, Primitive, Ray};
//! use irt_math::{Point3, Vec3};
//!
//! let sphere = Sphere::new(Point3::origin(), 1.0);
//! let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
//! assert_eq!(sphere.intersect(&ray), Some(4.0));
//! ```

mod bbox;
mod primitive;
mod ray;
pub mod shapes;

pub use bbox::BoundingBox;
pub use primitive::{Material, MaterialPoint, Primitive, Surface};
pub use ray::Ray;
