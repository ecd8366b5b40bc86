//! Error types for rendering.

use thiserror::Error;

/// Errors raised while rendering tiles.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("projection error: {0}")]
    Projection(#[from] projection::ProjectionError),

    #[error("cache error: {0}")]
    Cache(#[from] storage::CacheError),
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
