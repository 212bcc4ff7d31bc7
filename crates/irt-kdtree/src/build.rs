//! Kd-tree construction using the Surface Area Heuristic (SAH).
//!
//! Split planes are taken from the faces of the primitive bounding boxes.
//! Every candidate is scored by the surface area of each child weighted by
//! the number of primitives it would receive; primitives straddling the
//! plane are counted (and stored) on both sides.

use irt_geom::{BoundingBox, Primitive};
use irt_math::Axis;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::error::{KdTreeError, Result};
use crate::tree::{KdNode, KdTree, LeafKey, TreeStats};

/// Largest accepted `max_depth`; deeper requests are clamped so the
/// traversal stack cannot overflow.
pub const MAX_BUILD_DEPTH: u32 = 40;

/// Constant added to every partition cost before normalization.
pub const SPLIT_COST_OFFSET: f64 = 0.3;

/// Default threshold below which a split never consumes the failure budget.
pub const DEFAULT_FAILURE_RATIO: f64 = 0.75;

// Havran's termination constants.
const DEPTH_LOG_FACTOR: f64 = 1.2;
const DEPTH_OFFSET: f64 = 2.0;
const FAILURE_OFFSET: f64 = 1.0;
const FAILURE_DEPTH_FACTOR: f64 = 0.2;

/// Termination parameters for [`KdTreeBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Number of subdivision levels below the root.
    pub max_depth: u32,
    /// Number of splits allowed whose normalized cost is not below
    /// `failure_ratio`, along any root-to-leaf path.
    pub max_failures: u32,
    /// Normalized cost under which a split is always accepted.
    pub failure_ratio: f64,
}

impl BuildSettings {
    /// Havran's defaults for `primitive_count` primitives.
    ///
    /// `max_depth = ceil(1.2 * ln(n) + 2)`,
    /// `max_failures = ceil(1 + 0.2 * max_depth)`, ratio `0.75`.
    pub fn automatic(primitive_count: usize) -> Self {
        let n = primitive_count.max(1) as f64;
        let max_depth = (DEPTH_LOG_FACTOR * n.ln() + DEPTH_OFFSET).ceil() as u32;
        let max_failures = (FAILURE_OFFSET + FAILURE_DEPTH_FACTOR * max_depth as f64).ceil() as u32;
        Self {
            max_depth,
            max_failures,
            failure_ratio: DEFAULT_FAILURE_RATIO,
        }
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !self.failure_ratio.is_finite() || self.failure_ratio <= 0.0 {
            return Err(KdTreeError::InvalidSettings(format!(
                "failure_ratio must be finite and positive, got {}",
                self.failure_ratio
            )));
        }
        Ok(())
    }
}

/// Builds a [`KdTree`] over a primitive slice.
#[derive(Debug, Clone, Copy)]
pub struct KdTreeBuilder {
    settings: BuildSettings,
}

impl KdTreeBuilder {
    /// Builder with explicit settings.
    pub fn new(settings: BuildSettings) -> Self {
        Self { settings }
    }

    /// Builder with [`BuildSettings::automatic`] for `primitive_count`.
    pub fn automatic(primitive_count: usize) -> Self {
        Self::new(BuildSettings::automatic(primitive_count))
    }

    /// The settings this builder applies.
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Partition `primitives` inside `bounds`.
    ///
    /// Leaves store indices into `primitives`; queries on the returned tree
    /// must be given the same slice.
    #[tracing::instrument(skip_all, fields(primitives = primitives.len()))]
    pub fn build<P: Primitive>(&self, primitives: &[P], bounds: BoundingBox) -> Result<KdTree> {
        self.settings.validate()?;
        if primitives.is_empty() {
            return Err(KdTreeError::EmptyPrimitiveSet);
        }
        let count = u32::try_from(primitives.len())
            .map_err(|_| KdTreeError::TooManyPrimitives(primitives.len()))?;

        let mut max_depth = self.settings.max_depth;
        if max_depth > MAX_BUILD_DEPTH {
            warn!(
                requested = max_depth,
                clamped = MAX_BUILD_DEPTH,
                "kd-tree depth clamped to traversal stack size"
            );
            max_depth = MAX_BUILD_DEPTH;
        }

        let boxes: Vec<BoundingBox> = primitives.iter().map(Primitive::bounding_box).collect();
        let mut subdivider = Subdivider {
            boxes: &boxes,
            failure_ratio: self.settings.failure_ratio,
            tree: UnbuiltTree::new(count),
        };
        subdivider.subdivide(0, bounds, max_depth, self.settings.max_failures);

        let tree = subdivider.tree.finish(bounds, primitives.len());
        let TreeStats {
            nodes,
            leaves,
            max_depth,
            references,
            ..
        } = *tree.stats();
        debug!(nodes, leaves, max_depth, references, "kd-tree built");
        Ok(tree)
    }
}

/// Node arena and leaf store while splits are still being applied.
struct UnbuiltTree {
    nodes: Vec<KdNode>,
    leaves: SlotMap<LeafKey, Vec<u32>>,
}

impl UnbuiltTree {
    /// One root leaf holding every primitive.
    fn new(count: u32) -> Self {
        let mut leaves = SlotMap::with_key();
        let root = leaves.insert((0..count).collect());
        let mut nodes = Vec::with_capacity(3 * count as usize);
        nodes.push(KdNode::Leaf { primitives: root });
        Self { nodes, leaves }
    }

    fn leaf_key(&self, node: usize) -> Option<LeafKey> {
        match self.nodes[node] {
            KdNode::Leaf { primitives } => Some(primitives),
            KdNode::Interior { .. } => None,
        }
    }

    /// Turn leaf `node` into an interior node over a new adjacent pair of
    /// leaves, releasing its own collection. Returns the left child index.
    fn split_leaf(
        &mut self,
        node: usize,
        axis: Axis,
        split: f64,
        left: Vec<u32>,
        right: Vec<u32>,
    ) -> usize {
        let left_index = self.nodes.len();
        let left_key = self.leaves.insert(left);
        let right_key = self.leaves.insert(right);
        self.nodes.push(KdNode::Leaf { primitives: left_key });
        self.nodes.push(KdNode::Leaf { primitives: right_key });

        let interior = KdNode::Interior {
            axis,
            split,
            left: left_index as u32,
        };
        if let KdNode::Leaf { primitives } = std::mem::replace(&mut self.nodes[node], interior) {
            self.leaves.remove(primitives);
        }
        left_index
    }

    fn finish(self, bounds: BoundingBox, primitive_count: usize) -> KdTree {
        let mut tree = KdTree {
            nodes: self.nodes,
            leaves: self.leaves,
            bounds,
            primitive_count,
            stats: TreeStats::default(),
        };
        tree.stats = tree.collect_stats();
        tree
    }
}

/// The cheapest split found for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SplitCandidate {
    axis: Axis,
    position: f64,
    /// Normalized cost.
    cost: f64,
}

struct Subdivider<'a> {
    boxes: &'a [BoundingBox],
    failure_ratio: f64,
    tree: UnbuiltTree,
}

impl Subdivider<'_> {
    fn subdivide(
        &mut self,
        node: usize,
        bounds: BoundingBox,
        remaining_depth: u32,
        mut remaining_failures: u32,
    ) {
        let Some(key) = self.tree.leaf_key(node) else {
            return;
        };
        let boxes = self.boxes;
        let members = &self.tree.leaves[key];
        if members.len() < 2 {
            return;
        }

        let Some(best) = best_split(boxes, members, &bounds) else {
            return;
        };
        let accepted = if best.cost < self.failure_ratio {
            true
        } else if remaining_failures > 0 {
            remaining_failures -= 1;
            true
        } else {
            false
        };
        if !accepted {
            return;
        }

        let (left, right) = partition(boxes, members, best.axis, best.position);
        let (left_len, right_len) = (left.len(), right.len());
        let left_index = self
            .tree
            .split_leaf(node, best.axis, best.position, left, right);

        if remaining_depth > 0 && left_len > 1 {
            self.subdivide(
                left_index,
                bounds.clipped_high(best.axis, best.position),
                remaining_depth - 1,
                remaining_failures,
            );
        }
        if remaining_depth > 0 && right_len > 1 {
            self.subdivide(
                left_index + 1,
                bounds.clipped_low(best.axis, best.position),
                remaining_depth - 1,
                remaining_failures,
            );
        }
    }
}

/// Box faces lying inside `bounds`, unique by exact value, ordered by
/// `(axis, position)`.
fn split_candidates(boxes: &[BoundingBox], members: &[u32], bounds: &BoundingBox) -> Vec<(Axis, f64)> {
    let mut candidates = Vec::with_capacity(members.len() * 6);
    for &member in members {
        let bb = &boxes[member as usize];
        for axis in Axis::ALL {
            let i = axis.index();
            for position in [bb.low[i], bb.high[i]] {
                if position >= bounds.low[i] && position <= bounds.high[i] {
                    candidates.push((axis, position));
                }
            }
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    candidates.dedup();
    candidates
}

/// Lowest normalized cost over all candidates; the first one wins ties.
fn best_split(boxes: &[BoundingBox], members: &[u32], bounds: &BoundingBox) -> Option<SplitCandidate> {
    let parent_cost = bounds.surface_area_cost() * members.len() as f64;
    let mut lowest = f64::MAX;
    let mut best = None;

    for (axis, position) in split_candidates(boxes, members, bounds) {
        let cost = (partition_cost(boxes, members, bounds, axis, position) + SPLIT_COST_OFFSET) / parent_cost;
        if cost < lowest {
            lowest = cost;
            best = Some(SplitCandidate {
                axis,
                position,
                cost,
            });
        }
    }

    best
}

/// `sah(right) * |right| + sah(left) * |left|` for the plane at `position`.
fn partition_cost(boxes: &[BoundingBox], members: &[u32], bounds: &BoundingBox, axis: Axis, position: f64) -> f64 {
    let i = axis.index();
    let (mut left, mut right) = (0usize, 0usize);
    for &member in members {
        let bb = &boxes[member as usize];
        if bb.low[i] <= position {
            left += 1;
        }
        if bb.high[i] >= position {
            right += 1;
        }
    }

    bounds.clipped_low(axis, position).surface_area_cost() * right as f64
        + bounds.clipped_high(axis, position).surface_area_cost() * left as f64
}

/// Left and right members; straddling primitives land in both.
fn partition(boxes: &[BoundingBox], members: &[u32], axis: Axis, position: f64) -> (Vec<u32>, Vec<u32>) {
    let i = axis.index();
    let left = members
        .iter()
        .copied()
        .filter(|&m| boxes[m as usize].low[i] <= position)
        .collect();
    let right = members
        .iter()
        .copied()
        .filter(|&m| boxes[m as usize].high[i] >= position)
        .collect();
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use irt_geom::shapes::{Sphere, Triangle};
    use irt_math::Point3;

    fn scene_bounds<P: Primitive>(primitives: &[P]) -> BoundingBox {
        primitives
            .iter()
            .fold(BoundingBox::empty(), |acc, p| acc.union(&p.bounding_box()))
    }

    /// Spheres with irregular centers and radii so that no two split costs tie.
    fn scattered_spheres(count: usize) -> Vec<Sphere> {
        (0..count)
            .map(|i| {
                let f = i as f64;
                let center = Point3::new(
                    (f * 7.31).sin() * 20.0 + f * 0.013,
                    (f * 3.17).cos() * 15.0 - f * 0.021,
                    (f * 1.93).sin() * 10.0 + f * 0.037,
                );
                Sphere::new(center, 0.5 + (f * 0.618).fract())
            })
            .collect()
    }

    fn assert_tree_invariants(tree: &KdTree, count: usize) {
        // Every primitive is reachable from some leaf.
        let mut seen = vec![false; count];
        for set in tree.leaf_sets() {
            for &p in set {
                seen[p as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s), "primitive missing from every leaf");

        // Children are adjacent, in range, and after their parent.
        for (index, node) in tree.nodes().iter().enumerate() {
            if let Some((left, right)) = node.children() {
                assert_eq!(right, left + 1);
                assert!(left as usize > index);
                assert!((right as usize) < tree.nodes().len());
            }
        }

        // One live collection per leaf; released parents leave no residue.
        assert_eq!(tree.leaf_store_len(), tree.stats().leaves);
        assert_eq!(tree.nodes().len(), 2 * tree.stats().leaves - 1);
    }

    #[test]
    fn test_automatic_settings() {
        let s = BuildSettings::automatic(1);
        assert_eq!(s.max_depth, 2);
        assert_eq!(s.max_failures, 2);
        assert_eq!(s.failure_ratio, 0.75);

        let s = BuildSettings::automatic(100);
        assert_eq!(s.max_depth, 8);
        assert_eq!(s.max_failures, 3);

        let s = BuildSettings::automatic(1000);
        assert_eq!(s.max_depth, 11);
        assert_eq!(s.max_failures, 4);
    }

    #[test]
    fn test_empty_primitive_set_is_rejected() {
        let none: Vec<Sphere> = Vec::new();
        let result = KdTreeBuilder::automatic(0).build(&none, BoundingBox::empty());
        assert_eq!(result.unwrap_err(), KdTreeError::EmptyPrimitiveSet);
    }

    #[test]
    fn test_invalid_failure_ratio_is_rejected() {
        let spheres = scattered_spheres(4);
        let settings = BuildSettings {
            failure_ratio: f64::NAN,
            ..BuildSettings::automatic(4)
        };
        let result = KdTreeBuilder::new(settings).build(&spheres, scene_bounds(&spheres));
        assert!(matches!(result, Err(KdTreeError::InvalidSettings(_))));
    }

    #[test]
    fn test_single_primitive_stays_leaf() {
        let spheres = vec![Sphere::new(Point3::origin(), 1.0)];
        let tree = KdTreeBuilder::automatic(1)
            .build(&spheres, scene_bounds(&spheres))
            .unwrap();
        assert!(tree.root().is_leaf());
        assert_eq!(tree.leaf_sets().collect::<Vec<_>>(), vec![&[0u32][..]]);
    }

    #[test]
    fn test_coincident_primitives_stay_leaf() {
        // Zero-size boxes at one point: the only candidates are that point,
        // and the flat parent box makes every normalized cost infinite.
        let spheres = vec![Sphere::new(Point3::origin(), 0.0); 3];
        let tree = KdTreeBuilder::automatic(3)
            .build(&spheres, scene_bounds(&spheres))
            .unwrap();
        assert!(tree.root().is_leaf());
        assert_eq!(tree.stats().references, 3);
    }

    #[test]
    fn test_scattered_scene_invariants() {
        let spheres = scattered_spheres(200);
        let tree = KdTreeBuilder::automatic(spheres.len())
            .build(&spheres, scene_bounds(&spheres))
            .unwrap();
        assert!(!tree.root().is_leaf());
        assert!(tree.stats().leaves > 8);
        assert!(tree.stats().max_depth <= BuildSettings::automatic(200).max_depth + 1);
        assert_tree_invariants(&tree, spheres.len());
    }

    #[test]
    fn test_zero_failure_budget_and_strict_ratio_keeps_root_leaf() {
        let spheres = scattered_spheres(50);
        let settings = BuildSettings {
            max_depth: 10,
            max_failures: 0,
            failure_ratio: 1e-9,
        };
        let tree = KdTreeBuilder::new(settings)
            .build(&spheres, scene_bounds(&spheres))
            .unwrap();
        assert!(tree.root().is_leaf());
        assert_eq!(tree.nodes().len(), 1);
    }

    #[test]
    fn test_depth_zero_splits_root_once() {
        let spheres = scattered_spheres(50);
        let settings = BuildSettings {
            max_depth: 0,
            max_failures: 5,
            failure_ratio: 0.75,
        };
        let tree = KdTreeBuilder::new(settings)
            .build(&spheres, scene_bounds(&spheres))
            .unwrap();
        assert_eq!(tree.nodes().len(), 3);
        assert_eq!(tree.stats().max_depth, 1);
        assert_tree_invariants(&tree, spheres.len());
    }

    #[test]
    fn test_excessive_depth_is_clamped() {
        let spheres = scattered_spheres(64);
        let settings = BuildSettings {
            max_depth: 10_000,
            max_failures: 10_000,
            failure_ratio: 0.75,
        };
        let tree = KdTreeBuilder::new(settings)
            .build(&spheres, scene_bounds(&spheres))
            .unwrap();
        assert!(tree.stats().max_depth <= MAX_BUILD_DEPTH + 1);
        assert_tree_invariants(&tree, spheres.len());
    }

    /// Primitives referenced by the leaves under `node`.
    fn subtree_primitives(tree: &KdTree, node: u32) -> Vec<u32> {
        let mut found = Vec::new();
        let mut pending = vec![node];
        while let Some(index) = pending.pop() {
            match tree.nodes()[index as usize] {
                KdNode::Leaf { primitives } => found.extend_from_slice(tree.leaf_primitives(primitives)),
                KdNode::Interior { left, .. } => pending.extend([left, left + 1]),
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    #[test]
    fn test_children_receive_every_overlapping_primitive() {
        // Two clusters far apart on x, bridged by a long thin triangle.
        let mut triangles = Vec::new();
        for i in 0..6 {
            let f = i as f64 * 0.37;
            triangles.push(Triangle::new(
                Point3::new(-10.0 - f, 0.0, 0.0),
                Point3::new(-9.0 - f, 1.0, 0.3),
                Point3::new(-9.5 - f, 0.0, 1.0),
            ));
            triangles.push(Triangle::new(
                Point3::new(10.0 + f, 0.0, 0.0),
                Point3::new(9.0 + f, 1.0, 0.2),
                Point3::new(9.5 + f, 0.0, 1.0),
            ));
        }
        triangles.push(Triangle::new(
            Point3::new(-9.0, 0.5, 0.5),
            Point3::new(9.0, 0.5, 0.5),
            Point3::new(0.0, 0.6, 0.5),
        ));

        let tree = KdTreeBuilder::automatic(triangles.len())
            .build(&triangles, scene_bounds(&triangles))
            .unwrap();
        assert!(!tree.root().is_leaf());

        for (index, node) in tree.nodes().iter().enumerate() {
            let KdNode::Interior { axis, split, left } = *node else {
                continue;
            };
            let i = axis.index();
            let left_set = subtree_primitives(&tree, left);
            let right_set = subtree_primitives(&tree, left + 1);
            for p in subtree_primitives(&tree, index as u32) {
                let bb = triangles[p as usize].bounding_box();
                assert_eq!(bb.low[i] <= split, left_set.contains(&p));
                assert_eq!(bb.high[i] >= split, right_set.contains(&p));
            }
        }
        assert_tree_invariants(&tree, triangles.len());
    }

    #[test]
    fn test_build_is_invariant_under_permutation() {
        let spheres = scattered_spheres(60);
        let bounds = scene_bounds(&spheres);
        let settings = BuildSettings::automatic(spheres.len());

        // Reverse, then rotate: a permutation unrelated to coordinate order.
        let mut order: Vec<usize> = (0..spheres.len()).rev().collect();
        order.rotate_left(17);
        let permuted: Vec<Sphere> = order.iter().map(|&i| spheres[i].clone()).collect();

        let canonical = |tree: &KdTree, identity: &dyn Fn(u32) -> usize| {
            let mut sets: Vec<Vec<usize>> = tree
                .leaf_sets()
                .map(|set| {
                    let mut ids: Vec<usize> = set.iter().map(|&p| identity(p)).collect();
                    ids.sort_unstable();
                    ids
                })
                .collect();
            sets.sort();
            sets
        };

        let original = KdTreeBuilder::new(settings).build(&spheres, bounds).unwrap();
        let shuffled = KdTreeBuilder::new(settings).build(&permuted, bounds).unwrap();

        assert_eq!(
            canonical(&original, &|p| p as usize),
            canonical(&shuffled, &|p| order[p as usize]),
        );
    }

    #[test]
    fn test_candidates_are_sorted_and_unique() {
        let spheres = vec![
            Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0),
            Sphere::new(Point3::new(2.0, 0.0, 0.0), 1.0),
        ];
        let boxes: Vec<BoundingBox> = spheres.iter().map(Primitive::bounding_box).collect();
        let bounds = scene_bounds(&spheres);
        let candidates = split_candidates(&boxes, &[0, 1], &bounds);
        // x faces: -1, 1 (shared), 3; y and z: -1, 1 each.
        assert_eq!(
            candidates,
            vec![
                (Axis::X, -1.0),
                (Axis::X, 1.0),
                (Axis::X, 3.0),
                (Axis::Y, -1.0),
                (Axis::Y, 1.0),
                (Axis::Z, -1.0),
                (Axis::Z, 1.0),
            ]
        );
    }

    #[test]
    fn test_candidates_outside_node_bounds_are_ignored() {
        let spheres = vec![Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0)];
        let boxes: Vec<BoundingBox> = spheres.iter().map(Primitive::bounding_box).collect();
        let clipped = BoundingBox::new(Point3::new(0.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let candidates = split_candidates(&boxes, &[0], &clipped);
        assert!(candidates.contains(&(Axis::X, 1.0)));
        assert!(!candidates.contains(&(Axis::X, -1.0)));
    }

    #[test]
    fn test_partition_cost_counts_straddlers_twice() {
        let boxes = vec![
            BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)),
            BoundingBox::new(Point3::new(0.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0)),
        ];
        let bounds = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let (left, right) = partition(&boxes, &[0, 1], Axis::X, 0.75);
        assert_eq!(left, vec![0, 1]);
        assert_eq!(right, vec![0, 1]);

        // left [0,0.75]x1x1: sah 2*(0.75+0.75+1) = 5; right [0.75,2]: 2*(1.25+1.25+1) = 7
        let cost = partition_cost(&boxes, &[0, 1], &bounds, Axis::X, 0.75);
        assert!((cost - (7.0 * 2.0 + 5.0 * 2.0)).abs() < 1e-12);
    }
}
