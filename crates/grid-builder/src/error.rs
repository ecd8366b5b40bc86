//! Error types for grid building and artifact persistence.

use thiserror::Error;

/// Errors that can occur while building or persisting a grid.
#[derive(Error, Debug)]
pub enum GridBuilderError {
    /// The requested grid shape is unusable.
    #[error("invalid grid shape {rows}x{cols}: both dimensions must be nonzero")]
    InvalidShape { rows: usize, cols: usize },

    /// The IDW search radius must be positive and finite.
    #[error("invalid search radius {0}: must be positive and finite")]
    InvalidRadius(f64),

    /// Artifact value payload does not match its sidecar shape.
    #[error("artifact {path} holds {actual} values but sidecar declares {expected}")]
    ShapeMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    /// Sidecar metadata could not be parsed.
    #[error("invalid grid sidecar: {0}")]
    Sidecar(#[from] serde_json::Error),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for grid builder operations.
pub type Result<T> = std::result::Result<T, GridBuilderError>;
