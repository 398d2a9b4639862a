//! Viewport to visible-tile-set math.
//!
//! These functions are pure with respect to their inputs so the LOD
//! selection and tile-range projection can be tested without constructing
//! any decoder or GPU state. The projection mirrors the render transform:
//! a screen position in normalized device coordinates is divided by the
//! displayed image size, scaled by the inverse user zoom, offset by the pan,
//! and mapped back to level-0 pixel coordinates.
//!
//! # Coordinate Spaces
//!
//! - **Screen/NDC**: viewport corners at `[-1, 1]` on both axes.
//! - **Image space**: `[0, 1]` normalized over the level-0 image.
//! - **Pixel space**: level-0 pixels.
//! - **Tile space**: pixel space divided by the tile size, then right-shifted
//!   by the level index for coarser levels (a level-N tile covers `2^N`
//!   level-0 tiles per axis).

use super::coord::TileCoordinate;
use super::level::PyramidLevel;
use crate::TILE_SIZE;

// =============================================================================
// View Query
// =============================================================================

/// Viewport, zoom, and pan state for one visibility query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewQuery {
    /// Viewport offset on screen in pixels.
    ///
    /// Carried for callers that track a sub-window; the projection treats
    /// the viewport as the full render surface, so the offset does not
    /// shift the visible region.
    pub viewport_x: u32,

    /// Viewport offset on screen in pixels (vertical).
    pub viewport_y: u32,

    /// Viewport width in pixels.
    pub viewport_width: u32,

    /// Viewport height in pixels.
    pub viewport_height: u32,

    /// User zoom factor. 1.0 displays the image at fit-to-window; the
    /// displayed size and the projected visible window both scale by
    /// `1 / zoom`, so values above 1.0 narrow the window and select
    /// coarser levels, while values below 1.0 move toward the native
    /// resolution with the full image in range.
    pub zoom: f64,

    /// Normalized pan offset, image-space units in `[-1, 1]`.
    pub pan_x: f64,

    /// Normalized pan offset (vertical).
    pub pan_y: f64,
}

impl ViewQuery {
    /// A centered, unpanned view at the given zoom.
    pub fn centered(viewport_width: u32, viewport_height: u32, zoom: f64) -> Self {
        Self {
            viewport_x: 0,
            viewport_y: 0,
            viewport_width,
            viewport_height,
            zoom,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

// =============================================================================
// LOD Selection
// =============================================================================

/// Pick the level whose native resolution is closest to the on-screen
/// display size, by L1 distance over width + height.
///
/// The display size is the aspect-preserving fit of the image into the
/// viewport, divided by the user zoom. Ties keep the first minimal level in
/// level order.
pub fn select_level(
    levels: &[PyramidLevel],
    image_width: u32,
    image_height: u32,
    query: &ViewQuery,
) -> usize {
    let fit = fit_scale(
        image_width,
        image_height,
        query.viewport_width,
        query.viewport_height,
    );
    let display_width = image_width as f64 * fit / query.zoom;
    let display_height = image_height as f64 * fit / query.zoom;

    let mut best = 0usize;
    let mut min_diff = f64::MAX;
    for (i, level) in levels.iter().enumerate() {
        let diff = (level.width as f64 - display_width).abs()
            + (level.height as f64 - display_height).abs();
        if diff < min_diff {
            min_diff = diff;
            best = i;
        }
    }
    best
}

/// Aspect-preserving scale that fits the image inside the viewport.
fn fit_scale(image_width: u32, image_height: u32, viewport_width: u32, viewport_height: u32) -> f64 {
    let scale_x = viewport_width as f64 / image_width as f64;
    let scale_y = viewport_height as f64 / image_height as f64;
    scale_x.min(scale_y)
}

// =============================================================================
// Visible Tile Selection
// =============================================================================

/// Compute the visible tile set for a view, selecting the LOD automatically.
///
/// Returns every coordinate, at the selected level, whose tile rectangle
/// overlaps the viewport. Each coordinate appears at most once per call.
/// Invalid input (zero image or viewport dimension, non-positive zoom)
/// yields an empty set.
pub fn visible_tiles(
    levels: &[PyramidLevel],
    image_width: u32,
    image_height: u32,
    query: &ViewQuery,
) -> Vec<TileCoordinate> {
    if levels.is_empty()
        || image_width == 0
        || image_height == 0
        || query.viewport_width == 0
        || query.viewport_height == 0
        || query.zoom <= 0.0
    {
        return Vec::new();
    }

    let level_index = select_level(levels, image_width, image_height, query);
    let level = &levels[level_index];

    // Displayed image size normalized to the viewport; the NDC corner
    // positions divide by this to land in image space.
    let fit = fit_scale(
        image_width,
        image_height,
        query.viewport_width,
        query.viewport_height,
    );
    let display_norm_w = image_width as f64 * fit / query.viewport_width as f64;
    let display_norm_h = image_height as f64 * fit / query.viewport_height as f64;
    if display_norm_w <= 0.0 || display_norm_h <= 0.0 {
        return Vec::new();
    }

    // Project the four viewport corners through the inverse render
    // transform into level-0 pixel coordinates and take the bounding box.
    let mut min_px = f64::MAX;
    let mut max_px = f64::MIN;
    let mut min_py = f64::MAX;
    let mut max_py = f64::MIN;
    for &(corner_x, corner_y) in &[(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0f64)] {
        let image_x = (corner_x / display_norm_w) / query.zoom + query.pan_x;
        let image_y = (corner_y / display_norm_h) / query.zoom + query.pan_y;

        let px = (image_x * 0.5 + 0.5) * image_width as f64;
        let py = (image_y * 0.5 + 0.5) * image_height as f64;

        min_px = min_px.min(px);
        max_px = max_px.max(px);
        min_py = min_py.min(py);
        max_py = max_py.max(py);
    }

    // Bounding box to an inclusive tile-index range in the level-0 grid.
    let tile_size = TILE_SIZE as f64;
    let max_tile_x = image_width.div_ceil(TILE_SIZE) as i64;
    let max_tile_y = image_height.div_ceil(TILE_SIZE) as i64;

    let start_x = ((min_px / tile_size).floor() as i64).max(0);
    let end_x = ((max_px / tile_size).ceil() as i64).min(max_tile_x);
    let start_y = ((min_py / tile_size).floor() as i64).max(0);
    let end_y = ((max_py / tile_size).ceil() as i64).min(max_tile_y);
    if start_x > end_x || start_y > end_y {
        return Vec::new();
    }

    // A level-N tile covers 2^N level-0 tiles per axis, so the range
    // right-shifts into the target level's own grid.
    let shift = level_index as u32;
    let start_x = (start_x >> shift).max(0) as u32;
    let start_y = (start_y >> shift).max(0) as u32;
    let end_x = ((end_x >> shift) as u32).min(level.tiles_x.saturating_sub(1));
    let end_y = ((end_y >> shift) as u32).min(level.tiles_y.saturating_sub(1));

    let mut tiles = Vec::new();
    for y in start_y..=end_y {
        for x in start_x..=end_x {
            // Range clamping should already guarantee validity; re-check
            // defensively against the level grid.
            if x < level.tiles_x && y < level.tiles_y {
                tiles.push(TileCoordinate::new(level_index as u32, x, y));
            }
        }
    }
    tiles
}

/// Fixed-level variant: tiles overlapping a viewport rectangle expressed in
/// the level's own pixel units, with a one-tile prefetch margin on every
/// side.
///
/// Used when the caller has already chosen the level and tracks the camera
/// rectangle directly.
pub fn tiles_for_viewport(
    levels: &[PyramidLevel],
    level_index: usize,
    viewport_x: f64,
    viewport_y: f64,
    viewport_width: f64,
    viewport_height: f64,
    zoom: f64,
) -> Vec<TileCoordinate> {
    let Some(level) = levels.get(level_index) else {
        return Vec::new();
    };
    if zoom <= 0.0 {
        return Vec::new();
    }

    let scale = 1.0 / zoom;
    let x0 = viewport_x * scale;
    let y0 = viewport_y * scale;
    let x1 = x0 + viewport_width * scale;
    let y1 = y0 + viewport_height * scale;

    let tile_size = TILE_SIZE as f64;
    let start_x = (((x0 / tile_size).floor() as i64) - 1).max(0);
    let start_y = (((y0 / tile_size).floor() as i64) - 1).max(0);
    let end_x = (((x1 / tile_size).ceil() as i64) + 1).min(level.tiles_x as i64 - 1);
    let end_y = (((y1 / tile_size).ceil() as i64) + 1).min(level.tiles_y as i64 - 1);

    let mut tiles = Vec::new();
    for y in start_y..=end_y {
        for x in start_x..=end_x {
            if x >= 0 && y >= 0 {
                tiles.push(TileCoordinate::new(level_index as u32, x as u32, y as u32));
            }
        }
    }
    tiles
}

// =============================================================================
// Tests
// =============================================================================
