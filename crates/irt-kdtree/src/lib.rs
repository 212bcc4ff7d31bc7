#![warn(missing_docs)]

//! SAH kd-tree construction and stack-based ray traversal.
//!
//! Build a [`KdTree`] over any slice of [`Primitive`](irt_geom::Primitive)s
//! with a [`KdTreeBuilder`], then query it with the same slice. The tree
//! stores primitive indices only and is immutable once built.
//!
//! # Example
//!
//! ```
//! use irt_geom::{shapes::Sphere, BoundingBox, Primitive, Ray};
//! use irt_kdtree::KdTreeBuilder;
//! use irt_math::{Point3, Vec3};
//!
//! let spheres = vec![
//!     Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0),
//!     Sphere::new(Point3::new(6.0, 0.0, 0.0), 1.0),
//! ];
//! let bounds = spheres
//!     .iter()
//!     .fold(BoundingBox::empty(), |acc, s| acc.union(&s.bounding_box()));
//!
//! let tree = KdTreeBuilder::automatic(spheres.len()).build(&spheres, bounds).unwrap();
//! let ray = Ray::new(Point3::new(10.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
//! let (t_near, t_far) = tree.bounds().entry_exit_distances(&ray).unwrap();
//! let hit = tree.first_hit(&spheres, &ray, t_near, t_far).unwrap().unwrap();
//! assert_eq!(hit.primitive, 1);
//! ```

mod build;
mod error;
mod traverse;
mod tree;

pub use build::{BuildSettings, KdTreeBuilder, DEFAULT_FAILURE_RATIO, MAX_BUILD_DEPTH, SPLIT_COST_OFFSET};
pub use error::{KdTreeError, Result};
pub use traverse::{
    FirstHit, Hit, HitDistance, HitLevel, Occlusion, TraversalCost, TraversalVisitor, LEAF_HIT_EPSILON,
    TRAVERSAL_STACK_SIZE,
};
pub use tree::{KdNode, KdTree, LeafKey, TreeStats};
