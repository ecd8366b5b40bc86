//! Error types for tile storage.

use thiserror::Error;

/// Errors from the tile buffer cache and tile persistence.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The memory budget does not admit even one resident tile buffer.
    #[error(
        "memory budget of {budget} bytes admits zero {tile_size}px tile buffers ({tile_bytes} bytes each)"
    )]
    ZeroCapacity {
        budget: u64,
        tile_size: u32,
        tile_bytes: u64,
    },

    /// PNG encoding failed.
    #[error("PNG encode failed: {0}")]
    Encode(String),

    /// A persisted tile could not be decoded back into a buffer.
    #[error("failed to decode persisted tile {path}: {message}")]
    Decode { path: String, message: String },

    /// Filesystem error.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, CacheError>;
