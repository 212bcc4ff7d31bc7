//! The immutable kd-tree: a node arena plus a keyed store of leaf
//! primitive collections.

use irt_geom::BoundingBox;
use irt_math::Axis;
use serde::Serialize;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle of a leaf's primitive collection in [`KdTree`]'s leaf store.
    pub struct LeafKey;
}

/// A kd-tree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KdNode {
    /// Terminal node holding a primitive collection.
    Leaf {
        /// Key of the collection in the leaf store.
        primitives: LeafKey,
    },
    /// Branching node. Children are adjacent: `left` and `left + 1`.
    Interior {
        /// Split axis.
        axis: Axis,
        /// Split plane position on `axis`.
        split: f64,
        /// Arena index of the left child.
        left: u32,
    },
}

impl KdNode {
    /// True for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        matches!(self, KdNode::Leaf { .. })
    }

    /// Arena indices of the `(left, right)` children of an interior node.
    pub fn children(&self) -> Option<(u32, u32)> {
        match *self {
            KdNode::Interior { left, .. } => Some((left, left + 1)),
            KdNode::Leaf { .. } => None,
        }
    }
}

/// Shape statistics of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TreeStats {
    /// Number of nodes in the arena.
    pub nodes: usize,
    /// Number of leaves.
    pub leaves: usize,
    /// Leaves holding no primitive.
    pub empty_leaves: usize,
    /// Deepest leaf level (root = 0).
    pub max_depth: u32,
    /// Sum of leaf collection sizes (straddlers count once per leaf).
    pub references: usize,
    /// Largest leaf collection.
    pub max_leaf_size: usize,
}

/// A built kd-tree over a primitive slice.
///
/// Produced by [`KdTreeBuilder`](crate::KdTreeBuilder); never mutated
/// afterwards, so concurrent traversal is safe.
#[derive(Debug, Clone)]
pub struct KdTree {
    pub(crate) nodes: Vec<KdNode>,
    pub(crate) leaves: SlotMap<LeafKey, Vec<u32>>,
    pub(crate) bounds: BoundingBox,
    pub(crate) primitive_count: usize,
    pub(crate) stats: TreeStats,
}

impl KdTree {
    /// The node arena; the root is at index 0.
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// The root node.
    pub fn root(&self) -> &KdNode {
        &self.nodes[0]
    }

    /// Bounding box the tree was built in.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Number of primitives the tree was built over.
    pub fn primitive_count(&self) -> usize {
        self.primitive_count
    }

    /// Shape statistics gathered at build time.
    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    /// Primitive handles of a leaf collection.
    pub fn leaf_primitives(&self, key: LeafKey) -> &[u32] {
        self.leaves.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Primitive collections of all leaves, in arena order.
    pub fn leaf_sets(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            KdNode::Leaf { primitives } => Some(self.leaf_primitives(*primitives)),
            KdNode::Interior { .. } => None,
        })
    }

    /// Number of collections in the leaf store. Equals the leaf count.
    pub fn leaf_store_len(&self) -> usize {
        self.leaves.len()
    }

    pub(crate) fn collect_stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            nodes: self.nodes.len(),
            ..TreeStats::default()
        };

        let mut pending = vec![(0u32, 0u32)];
        while let Some((index, depth)) = pending.pop() {
            match self.nodes[index as usize] {
                KdNode::Leaf { primitives } => {
                    let size = self.leaf_primitives(primitives).len();
                    stats.leaves += 1;
                    stats.references += size;
                    stats.max_leaf_size = stats.max_leaf_size.max(size);
                    stats.max_depth = stats.max_depth.max(depth);
                    if size == 0 {
                        stats.empty_leaves += 1;
                    }
                }
                KdNode::Interior { left, .. } => {
                    pending.push((left, depth + 1));
                    pending.push((left + 1, depth + 1));
                }
            }
        }

        stats
    }
}
