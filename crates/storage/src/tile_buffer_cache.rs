//! Bounded-memory tile buffer cache with LRU disk spill.
//!
//! Holds mutable RGBA canvases keyed by tile coordinate. The resident set is
//! capped at a buffer count derived from a memory budget; inserting past the
//! cap synchronously persists the least-recently-used buffer to its tile
//! path and drops it. A persisted tile found on first access is reloaded as
//! the initial canvas, so interrupted or incremental runs merge with prior
//! output instead of clobbering it.
//!
//! Not safe for concurrent mutation; give each tile coordinate a single
//! owning worker if work is ever partitioned.

use std::fs;
use std::num::NonZeroUsize;

use lru::LruCache;
use tile_common::{Rgb, TileCoord};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::layout::TileLayout;
use crate::png;

/// A mutable RGBA canvas for one tile.
///
/// Owned exclusively by its cache entry while resident; serialized to a PNG
/// on eviction or flush, after which the in-memory instance is gone.
#[derive(Debug, Clone)]
pub struct TileBuffer {
    coord: TileCoord,
    tile_size: u32,
    pixels: Vec<u8>,
}

impl TileBuffer {
    /// A fully transparent canvas.
    fn blank(coord: TileCoord, tile_size: u32) -> Self {
        Self {
            coord,
            tile_size,
            pixels: vec![0u8; (tile_size * tile_size * 4) as usize],
        }
    }

    fn from_raw(coord: TileCoord, tile_size: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (tile_size * tile_size * 4) as usize);
        Self {
            coord,
            tile_size,
            pixels,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Raw RGBA pixel data, row-major, 4 bytes per pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Draw a filled dot centered at `(px, py)` with full opacity.
    ///
    /// Every pixel with `(x-px)^2 + (y-py)^2 <= radius^2` is overwritten,
    /// clipped to the canvas; overlapping dots resolve last-write-wins.
    pub fn draw_dot(&mut self, px: i64, py: i64, radius: u32, color: Rgb) {
        let r = radius as i64;
        let size = self.tile_size as i64;
        let x0 = (px - r).max(0);
        let x1 = (px + r + 1).min(size);
        let y0 = (py - r).max(0);
        let y1 = (py + r + 1).min(size);
        let r2 = r * r;

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x - px;
                let dy = y - py;
                if dx * dx + dy * dy <= r2 {
                    let idx = ((y * size + x) * 4) as usize;
                    self.pixels[idx] = color.r;
                    self.pixels[idx + 1] = color.g;
                    self.pixels[idx + 2] = color.b;
                    self.pixels[idx + 3] = 255;
                }
            }
        }
    }
}

/// A tile whose persistence failed; retained so the caller can retry.
#[derive(Debug, Clone)]
pub struct FailedTile {
    pub coord: TileCoord,
    pub error: String,
}

/// Counters for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub reloads: u64,
    pub resident: usize,
}

/// LRU cache of tile buffers with synchronous disk spill.
pub struct TileBufferCache {
    layout: TileLayout,
    tile_size: u32,
    cache: LruCache<TileCoord, TileBuffer>,
    hits: u64,
    misses: u64,
    evictions: u64,
    reloads: u64,
    failed: Vec<FailedTile>,
}

impl TileBufferCache {
    /// Create a cache whose resident set fits in `memory_budget_bytes`.
    ///
    /// Capacity is the budget divided by one tile's RGBA footprint
    /// (`tile_size^2 * 4`); a budget below one tile is a configuration
    /// error, not an always-evict cache.
    pub fn new(layout: TileLayout, tile_size: u32, memory_budget_bytes: u64) -> Result<Self> {
        let tile_bytes = (tile_size as u64) * (tile_size as u64) * 4;
        let capacity = (memory_budget_bytes / tile_bytes) as usize;
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity {
            budget: memory_budget_bytes,
            tile_size,
            tile_bytes,
        })?;

        debug!(capacity = capacity.get(), tile_size, "tile buffer cache created");

        Ok(Self {
            layout,
            tile_size,
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
            reloads: 0,
            failed: Vec::new(),
        })
    }

    /// Maximum resident buffer count.
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// Current resident buffer count.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Fetch the buffer for a tile, creating or reloading it on a miss.
    ///
    /// A hit promotes the entry to most-recently-used. On a miss, a tile
    /// already persisted at the derived path is decoded as the starting
    /// canvas (incremental merge); otherwise a transparent canvas is
    /// allocated. If the insertion pushes the cache over capacity the
    /// least-recently-used buffer is persisted and dropped.
    pub fn get_or_create(&mut self, coord: TileCoord) -> Result<&mut TileBuffer> {
        if self.cache.contains(&coord) {
            self.hits += 1;
            return Ok(self.cache.get_mut(&coord).expect("checked resident"));
        }

        self.misses += 1;
        let buffer = match self.load_persisted(coord)? {
            Some(buffer) => {
                self.reloads += 1;
                buffer
            }
            None => TileBuffer::blank(coord, self.tile_size),
        };

        // At capacity, push returns the evicted LRU entry; spill it to disk.
        if let Some((evicted_coord, evicted)) = self.cache.push(coord, buffer) {
            self.evictions += 1;
            self.persist(evicted_coord, &evicted);
        }

        Ok(self.cache.get_mut(&coord).expect("just inserted"))
    }

    /// Persist and drop every resident buffer. Idempotent; safe on an empty
    /// cache. Called once at pipeline completion.
    pub fn flush(&mut self) {
        let resident = self.cache.len();
        if resident > 0 {
            debug!(resident, "flushing tile buffer cache");
        }
        while let Some((coord, buffer)) = self.cache.pop_lru() {
            self.persist(coord, &buffer);
        }
    }

    /// Tiles whose persistence failed so far; callers may retry these.
    pub fn failed_tiles(&self) -> &[FailedTile] {
        &self.failed
    }

    /// Hand over the failure ledger, clearing it.
    pub fn take_failed_tiles(&mut self) -> Vec<FailedTile> {
        std::mem::take(&mut self.failed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            reloads: self.reloads,
            resident: self.cache.len(),
        }
    }

    fn load_persisted(&self, coord: TileCoord) -> Result<Option<TileBuffer>> {
        let path = self.layout.tile_path(&coord);
        if !path.exists() {
            return Ok(None);
        }
        let pixels = png::decode_rgba(&path, self.tile_size)?;
        Ok(Some(TileBuffer::from_raw(coord, self.tile_size, pixels)))
    }

    /// Write one buffer to its tile path. Failures land in the ledger
    /// instead of aborting the run.
    fn persist(&mut self, coord: TileCoord, buffer: &TileBuffer) {
        if let Err(e) = self.try_persist(coord, buffer) {
            warn!(tile = %coord, error = %e, "failed to persist tile");
            self.failed.push(FailedTile {
                coord,
                error: e.to_string(),
            });
        }
    }

    fn try_persist(&self, coord: TileCoord, buffer: &TileBuffer) -> Result<()> {
        let path = self.layout.tile_path(&coord);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let encoded = png::encode_rgba(
            buffer.pixels(),
            self.tile_size as usize,
            self.tile_size as usize,
        )?;
        fs::write(&path, encoded)?;
        Ok(())
    }
}
