//! Image pyramid: LOD addressing and the host-memory tile table.
//!
//! An [`ImagePyramid`] derives the level structure for one source image
//! (dimensions and tile grid per level), answers viewport-to-tile-set
//! queries, and holds decoded tile pixels in a mutex-guarded host-memory
//! table. It performs no I/O itself: decoding is the
//! [`crate::loader::TileLoader`]'s job, and the pyramid only records the
//! results.
//!
//! # Thread Safety
//!
//! The pyramid is shared (`Arc`) between the loader path, which writes
//! decoded tiles via [`ImagePyramid::mark_tile_loaded`], and the render
//! path, which reads via [`ImagePyramid::tile_data`]. A single mutex guards
//! the table; critical sections are a map lookup plus a fixed-size buffer
//! move, and never perform I/O or decoding.

mod coord;
mod level;
mod visibility;

pub use coord::TileCoordinate;
pub use level::{build_levels, PyramidLevel, MAX_LEVELS};
pub use visibility::{select_level, tiles_for_viewport, visible_tiles, ViewQuery};

use std::num::NonZeroUsize;
use std::sync::Mutex;

use bytes::Bytes;
use lru::LruCache;
use tracing::{debug, warn};

use crate::error::PyramidError;
use crate::TILE_BYTES;

// =============================================================================
// Image Pyramid
// =============================================================================

/// Multi-resolution tile addressing and host-memory cache for one source
/// image.
pub struct ImagePyramid {
    width: u32,
    height: u32,
    source_id: String,
    levels: Vec<PyramidLevel>,

    /// Decoded tile pixels, capped LRU over coordinates. Each entry is
    /// exactly [`TILE_BYTES`] long.
    tiles: Mutex<LruCache<TileCoordinate, Bytes>>,
}

impl ImagePyramid {
    /// Build the pyramid for a source image.
    ///
    /// `source_id` names the source for the decoder (a path, URL, or other
    /// opener-understood identifier). `host_tile_cap` bounds the number of
    /// decoded tiles retained in host memory.
    ///
    /// # Errors
    ///
    /// Fails if either dimension is zero.
    pub fn new(
        width: u32,
        height: u32,
        source_id: impl Into<String>,
        host_tile_cap: usize,
    ) -> Result<Self, PyramidError> {
        if width == 0 || height == 0 {
            return Err(PyramidError::InvalidDimensions { width, height });
        }

        let levels = build_levels(width, height);
        for (i, level) in levels.iter().enumerate() {
            debug!(
                level = i,
                width = level.width,
                height = level.height,
                tiles_x = level.tiles_x,
                tiles_y = level.tiles_y,
                "pyramid level"
            );
        }

        let cap = NonZeroUsize::new(host_tile_cap.max(1)).expect("max(1) is non-zero");
        Ok(Self {
            width,
            height,
            source_id: source_id.into(),
            levels,
            tiles: Mutex::new(LruCache::new(cap)),
        })
    }

    /// Original image dimensions (level 0).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Identifier of the backing source image.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Number of pyramid levels. Always at least 1.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Level metadata, or `None` if out of range.
    pub fn level(&self, index: usize) -> Option<&PyramidLevel> {
        self.levels.get(index)
    }

    /// All levels, finest first.
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    /// Whether a coordinate falls inside this pyramid's level and grid
    /// bounds.
    pub fn has_tile(&self, coord: TileCoordinate) -> bool {
        match self.levels.get(coord.level as usize) {
            Some(level) => coord.x < level.tiles_x && coord.y < level.tiles_y,
            None => false,
        }
    }

    /// Decoded pixels for a tile, if host-resident.
    ///
    /// Never triggers decoding. The returned [`Bytes`] is a cheap shared
    /// handle to the table entry.
    pub fn tile_data(&self, coord: TileCoordinate) -> Option<Bytes> {
        let mut tiles = self.tiles.lock().expect("tile table poisoned");
        tiles.get(&coord).cloned()
    }

    /// Record decoded pixels for a tile.
    ///
    /// Rejects coordinates outside the pyramid and buffers shorter than one
    /// tile; oversized buffers are truncated to exactly [`TILE_BYTES`].
    /// Marking the same coordinate again overwrites.
    pub fn mark_tile_loaded(&self, coord: TileCoordinate, data: &[u8]) {
        if !self.has_tile(coord) {
            warn!(?coord, "mark_tile_loaded: coordinate outside pyramid");
            return;
        }
        if data.len() < TILE_BYTES {
            warn!(
                ?coord,
                len = data.len(),
                expected = TILE_BYTES,
                "mark_tile_loaded: undersized buffer"
            );
            return;
        }

        let pixels = Bytes::copy_from_slice(&data[..TILE_BYTES]);
        let mut tiles = self.tiles.lock().expect("tile table poisoned");
        tiles.put(coord, pixels);
    }

    /// Number of tiles currently host-resident.
    pub fn resident_tile_count(&self) -> usize {
        self.tiles.lock().expect("tile table poisoned").len()
    }

    /// Visible tile set for a view, with automatic LOD selection.
    ///
    /// See [`visibility::visible_tiles`] for the projection details.
    pub fn visible_tiles(&self, query: &ViewQuery) -> Vec<TileCoordinate> {
        visibility::visible_tiles(&self.levels, self.width, self.height, query)
    }

    /// Tiles overlapping a viewport rectangle at a fixed level, in that
    /// level's own pixel units.
    pub fn tiles_for_viewport(
        &self,
        level: usize,
        viewport_x: f64,
        viewport_y: f64,
        viewport_width: f64,
        viewport_height: f64,
        zoom: f64,
    ) -> Vec<TileCoordinate> {
        visibility::tiles_for_viewport(
            &self.levels,
            level,
            viewport_x,
            viewport_y,
            viewport_width,
            viewport_height,
            zoom,
        )
    }

    /// Map tile indices from one level's grid into another's.
    ///
    /// Returns `None` if either level is out of range.
    pub fn convert_to_level(
        &self,
        source_level: u32,
        x: u32,
        y: u32,
        target_level: u32,
    ) -> Option<(u32, u32)> {
        if source_level as usize >= self.levels.len() || target_level as usize >= self.levels.len()
        {
            return None;
        }
        let mapped = TileCoordinate::new(source_level, x, y).shift_to_level(target_level);
        Some((mapped.x, mapped.y))
    }
}

// =============================================================================
// Tests
// =============================================================================
