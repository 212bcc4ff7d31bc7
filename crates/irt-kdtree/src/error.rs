//! Error types for kd-tree construction and traversal.

use thiserror::Error;

/// Errors that can occur while building or walking a kd-tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KdTreeError {
    /// Nothing to partition.
    #[error("cannot build a kd-tree from an empty primitive set")]
    EmptyPrimitiveSet,

    /// Primitive handles are stored as `u32`.
    #[error("too many primitives for a kd-tree: {0}")]
    TooManyPrimitives(usize),

    /// Invalid build settings.
    #[error("invalid build settings: {0}")]
    InvalidSettings(String),

    /// The ray crossed more split planes than the traversal stack holds.
    #[error("traversal stack overflow ({capacity} frames)")]
    StackOverflow {
        /// Number of frames in the traversal stack.
        capacity: usize,
    },

    /// The primitive slice given to a query is not the one the tree was built from.
    #[error("tree was built over {expected} primitives but {actual} were supplied")]
    PrimitiveCountMismatch {
        /// Primitive count at build time.
        expected: usize,
        /// Length of the slice supplied to the query.
        actual: usize,
    },
}

/// Result type for kd-tree operations.
pub type Result<T> = std::result::Result<T, KdTreeError>;
