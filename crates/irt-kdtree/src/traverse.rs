//! Stack-based front-to-back ray traversal.
//!
//! The walk keeps a fixed array of frames. Each frame records where the
//! ray leaves the current cell: the far child to resume at, the exit
//! distance and exit point, and the index of the frame below it. Leaves are
//! visited in ray order, so the first accepted leaf hit is the nearest one.
//!
//! What a walk reports is chosen by a [`TraversalVisitor`].

use irt_geom::{Primitive, Ray};
use irt_math::Point3;

use crate::error::{KdTreeError, Result};
use crate::tree::{KdNode, KdTree, LeafKey};

/// Number of frames in the traversal stack.
pub const TRAVERSAL_STACK_SIZE: usize = 50;

/// Leaf hits at or below this distance are ignored (self-intersection guard).
pub const LEAF_HIT_EPSILON: f64 = 1e-4;

/// The nearest primitive along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index of the primitive in the slice the tree was built over.
    pub primitive: usize,
    /// Distance along the ray.
    pub distance: f64,
}

/// Observes a traversal and decides what it returns.
///
/// `depth` is the number of interior nodes between the root and the node
/// being visited.
pub trait TraversalVisitor {
    /// Value produced by the walk.
    type Output;

    /// Called each time the walk steps through an interior node.
    fn on_descend(&mut self, _depth: u32) {}

    /// Called for the first leaf holding an accepted hit. Ends the walk.
    fn on_leaf_hit(self, hit: Hit, depth: u32) -> Self::Output;

    /// Called for each leaf without an accepted hit.
    fn on_leaf_miss(&mut self, _depth: u32) {}

    /// Called when the ray leaves the tree without a hit.
    fn on_no_hit(self) -> Self::Output;
}

/// Reports the nearest hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstHit;

impl TraversalVisitor for FirstHit {
    type Output = Option<Hit>;

    fn on_leaf_hit(self, hit: Hit, _depth: u32) -> Self::Output {
        Some(hit)
    }

    fn on_no_hit(self) -> Self::Output {
        None
    }
}

/// Reports the depth of the leaf that produced the hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitLevel;

impl TraversalVisitor for HitLevel {
    type Output = Option<u32>;

    fn on_leaf_hit(self, _hit: Hit, depth: u32) -> Self::Output {
        Some(depth)
    }

    fn on_no_hit(self) -> Self::Output {
        None
    }
}

/// Reports only the distance to the nearest hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitDistance;

impl TraversalVisitor for HitDistance {
    type Output = Option<f64>;

    fn on_leaf_hit(self, hit: Hit, _depth: u32) -> Self::Output {
        Some(hit.distance)
    }

    fn on_no_hit(self) -> Self::Output {
        None
    }
}

/// Reports whether anything blocks the ray.
#[derive(Debug, Clone, Copy, Default)]
pub struct Occlusion;

impl TraversalVisitor for Occlusion {
    type Output = bool;

    fn on_leaf_hit(self, _hit: Hit, _depth: u32) -> Self::Output {
        true
    }

    fn on_no_hit(self) -> Self::Output {
        false
    }
}

/// Counts the work done by a walk.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraversalCost {
    /// Interior nodes stepped through.
    pub descents: u32,
    /// Leaves whose primitives were tested.
    pub leaves_tested: u32,
    /// The hit that ended the walk, if any.
    pub hit: Option<Hit>,
}

impl TraversalVisitor for TraversalCost {
    type Output = TraversalCost;

    fn on_descend(&mut self, _depth: u32) {
        self.descents += 1;
    }

    fn on_leaf_hit(mut self, hit: Hit, _depth: u32) -> Self::Output {
        self.leaves_tested += 1;
        self.hit = Some(hit);
        self
    }

    fn on_leaf_miss(&mut self, _depth: u32) {
        self.leaves_tested += 1;
    }

    fn on_no_hit(self) -> Self::Output {
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Far child to resume at; `None` marks the end of the ray segment.
    node: Option<u32>,
    t: f64,
    point: Point3,
    previous: usize,
    depth: u32,
}

impl Frame {
    fn unused() -> Self {
        Self {
            node: None,
            t: 0.0,
            point: Point3::origin(),
            previous: 0,
            depth: 0,
        }
    }
}

impl KdTree {
    /// Walk the cells pierced by `ray` between `t_near` and `t_far`.
    ///
    /// `primitives` must be the slice the tree was built over. The segment
    /// is normally the ray's entry and exit distances for [`KdTree::bounds`].
    pub fn traverse<P, V>(&self, primitives: &[P], ray: &Ray, t_near: f64, t_far: f64, mut visitor: V) -> Result<V::Output>
    where
        P: Primitive,
        V: TraversalVisitor,
    {
        if primitives.len() != self.primitive_count {
            return Err(KdTreeError::PrimitiveCountMismatch {
                expected: self.primitive_count,
                actual: primitives.len(),
            });
        }

        let mut stack = [Frame::unused(); TRAVERSAL_STACK_SIZE];
        let mut entry = 0usize;
        let mut exit = 1usize;
        stack[entry].t = t_near;
        stack[entry].point = if t_near > 0.0 { ray.at(t_near) } else { ray.origin };
        stack[exit].t = t_far;
        stack[exit].point = ray.at(t_far);

        let mut current = Some(0u32);
        let mut depth = 0u32;

        while let Some(start) = current {
            let mut node = start;
            let leaf = loop {
                let (axis, split, left) = match self.nodes[node as usize] {
                    KdNode::Leaf { primitives } => break primitives,
                    KdNode::Interior { axis, split, left } => (axis, split, left),
                };
                depth += 1;
                visitor.on_descend(depth);

                let a = axis.index();
                let entry_pos = stack[entry].point[a];
                let exit_pos = stack[exit].point[a];
                let (near, far) = if entry_pos <= split {
                    if exit_pos <= split {
                        node = left;
                        continue;
                    }
                    (left, left + 1)
                } else {
                    if exit_pos > split {
                        node = left + 1;
                        continue;
                    }
                    (left + 1, left)
                };

                let t = (split - ray.origin[a]) / ray.direction[a];
                let previous = exit;
                exit += 1;
                if exit == entry {
                    exit += 1;
                }
                if exit >= TRAVERSAL_STACK_SIZE {
                    return Err(KdTreeError::StackOverflow {
                        capacity: TRAVERSAL_STACK_SIZE,
                    });
                }

                let (n, p) = (axis.next().index(), axis.prev().index());
                let mut point = Point3::origin();
                point[a] = split;
                point[n] = ray.origin[n] + t * ray.direction[n];
                point[p] = ray.origin[p] + t * ray.direction[p];
                stack[exit] = Frame {
                    node: Some(far),
                    t,
                    point,
                    previous,
                    depth,
                };
                node = near;
            };

            if let Some(hit) = self.nearest_in_leaf(primitives, leaf, ray) {
                if hit.distance <= stack[exit].t {
                    return Ok(visitor.on_leaf_hit(hit, depth));
                }
            }
            visitor.on_leaf_miss(depth);

            entry = exit;
            current = stack[exit].node;
            depth = stack[exit].depth;
            exit = stack[entry].previous;
        }

        Ok(visitor.on_no_hit())
    }

    /// Nearest hit further than [`LEAF_HIT_EPSILON`] among a leaf's primitives.
    fn nearest_in_leaf<P: Primitive>(&self, primitives: &[P], leaf: LeafKey, ray: &Ray) -> Option<Hit> {
        let mut nearest: Option<Hit> = None;
        for &index in self.leaf_primitives(leaf) {
            let Some(distance) = primitives[index as usize].intersect(ray) else {
                continue;
            };
            if distance > LEAF_HIT_EPSILON && nearest.map_or(true, |hit| distance < hit.distance) {
                nearest = Some(Hit {
                    primitive: index as usize,
                    distance,
                });
            }
        }
        nearest
    }

    /// Nearest hit on the segment.
    pub fn first_hit<P: Primitive>(&self, primitives: &[P], ray: &Ray, t_near: f64, t_far: f64) -> Result<Option<Hit>> {
        self.traverse(primitives, ray, t_near, t_far, FirstHit)
    }

    /// Depth of the leaf holding the nearest hit.
    pub fn hit_level<P: Primitive>(&self, primitives: &[P], ray: &Ray, t_near: f64, t_far: f64) -> Result<Option<u32>> {
        self.traverse(primitives, ray, t_near, t_far, HitLevel)
    }

    /// Distance to the nearest hit.
    pub fn hit_distance<P: Primitive>(&self, primitives: &[P], ray: &Ray, t_near: f64, t_far: f64) -> Result<Option<f64>> {
        self.traverse(primitives, ray, t_near, t_far, HitDistance)
    }

    /// Whether any primitive blocks the segment.
    pub fn occluded<P: Primitive>(&self, primitives: &[P], ray: &Ray, t_near: f64, t_far: f64) -> Result<bool> {
        self.traverse(primitives, ray, t_near, t_far, Occlusion)
    }
}
