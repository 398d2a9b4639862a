//! Pyramid level structure.
//!
//! Levels are derived once from the source image dimensions and are
//! read-only afterwards. Level 0 matches the original image; each
//! subsequent level halves both dimensions (floor division, minimum 1 per
//! axis). Construction stops once both dimensions drop below the tile size,
//! with a hard cap of [`MAX_LEVELS`] as a safety bound against degenerate
//! inputs such as 1xN images.

use crate::TILE_SIZE;

/// Safety cap on the number of pyramid levels.
pub const MAX_LEVELS: usize = 16;

/// Dimensions and tile grid of one resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidLevel {
    /// Level width in pixels
    pub width: u32,

    /// Level height in pixels
    pub height: u32,

    /// Number of tile columns (`ceil(width / 256)`)
    pub tiles_x: u32,

    /// Number of tile rows (`ceil(height / 256)`)
    pub tiles_y: u32,
}

impl PyramidLevel {
    fn from_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles_x: width.div_ceil(TILE_SIZE),
            tiles_y: height.div_ceil(TILE_SIZE),
        }
    }

    /// Total number of tiles in this level.
    pub fn tile_count(&self) -> u64 {
        self.tiles_x as u64 * self.tiles_y as u64
    }
}

/// Build the level list for a source image by repeated halving.
///
/// The list is never empty for non-zero dimensions: if the image is already
/// smaller than the tile size on both axes, a single level matching the
/// original size is synthesized.
pub fn build_levels(width: u32, height: u32) -> Vec<PyramidLevel> {
    let mut levels = Vec::new();

    let mut w = width;
    let mut h = height;
    while (w >= TILE_SIZE || h >= TILE_SIZE) && levels.len() < MAX_LEVELS {
        levels.push(PyramidLevel::from_dimensions(w, h));
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }

    if levels.is_empty() {
        levels.push(PyramidLevel::from_dimensions(width, height));
    }

    levels
}

// =============================================================================
// Tests
// =============================================================================
