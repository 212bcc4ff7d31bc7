//! Concrete shapes.
//!
//! Each shape has a dedicated intersector and carries its own
//! [`Material`](crate::Material).

mod cuboid;
mod sphere;
mod triangle;

pub use cuboid::Cuboid;
pub use sphere::Sphere;
pub use triangle::Triangle;
