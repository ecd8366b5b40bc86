//! Tile persistence: disk layout, PNG codec, and the bounded-memory
//! tile buffer cache with LRU disk spill.

pub mod error;
pub mod layout;
pub mod png;
pub mod tile_buffer_cache;

pub use error::{CacheError, Result};
pub use layout::TileLayout;
pub use tile_buffer_cache::{CacheStats, FailedTile, TileBuffer, TileBufferCache};
