//! Error types for scene management and rendering.

use irt_kdtree::KdTreeError;
use thiserror::Error;

/// Errors that can occur while editing, querying or rendering a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// The same primitive handle was added twice.
    #[error("primitive already added")]
    DuplicatePrimitive,

    /// The same light handle was added twice.
    #[error("light already added")]
    DuplicateLight,

    /// The primitive is not part of the scene.
    #[error("primitive not found")]
    PrimitiveNotFound,

    /// The light is not part of the scene.
    #[error("light not found")]
    LightNotFound,

    /// Index past the end of a primitive or light list.
    #[error("index {index} out of range for {len} elements")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of elements.
        len: usize,
    },

    /// A query needs a kd-tree; call `build_tree` first.
    #[error("kd-tree not built")]
    TreeNotBuilt,

    /// Kd-tree construction or traversal failed.
    #[error(transparent)]
    KdTree(#[from] KdTreeError),

    /// Degenerate camera parameters.
    #[error("invalid camera: {0}")]
    InvalidCamera(String),

    /// Invalid render settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Output buffer does not match the camera resolution.
    #[error("buffer holds {actual} values, expected {expected}")]
    BufferSize {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// Scene description could not be read or parsed.
    #[error("scene description: {0}")]
    Config(String),
}

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;
