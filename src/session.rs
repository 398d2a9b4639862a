//! Top-level viewer session.
//!
//! A [`ViewerSession`] owns the pyramid, the device tile cache, and the
//! loader for one source image, and orchestrates the per-frame flow:
//! compute the visible tile set, load what is missing, and emit a draw list
//! in which not-yet-resident tiles are stood in for by their nearest
//! resident ancestor. All shared state is rooted here; nothing in the crate
//! is process-global.

use std::sync::Arc;

use crate::cache::{CacheStats, GpuTileCache, RenderDevice};
use crate::config::CacheConfig;
use crate::decode::TileSource;
use crate::error::SessionError;
use crate::loader::TileLoader;
use crate::pyramid::{ImagePyramid, TileCoordinate, ViewQuery};
use crate::render::{resolve_fallback, tile_placement, TileRect, TransformPipeline};

// =============================================================================
// Frame Output
// =============================================================================

/// One drawable tile: which slot to sample and where to place it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDraw {
    pub coord: TileCoordinate,
    pub slot: u32,
    /// Placement in level-0 source-image pixel space.
    pub rect: TileRect,
    /// True when this draw is a coarser ancestor standing in for a tile
    /// that is not yet resident.
    pub fallback: bool,
}

/// Result of preparing one frame.
#[derive(Debug, Default)]
pub struct FrameSet {
    /// Tiles the view needs at the chosen level.
    pub visible: Vec<TileCoordinate>,
    /// How many of them loaded (or were already resident) this frame.
    pub loaded: usize,
    /// Deduplicated draw list, coarse-to-fine so finer tiles paint over
    /// their fallback ancestors.
    pub draws: Vec<TileDraw>,
}

// =============================================================================
// Viewer Session
// =============================================================================

/// Owns all viewer state for one source image.
pub struct ViewerSession<S: TileSource, D: RenderDevice> {
    pyramid: Arc<ImagePyramid>,
    cache: Arc<GpuTileCache<D>>,
    loader: TileLoader<S, D>,
}

impl<S: TileSource, D: RenderDevice> ViewerSession<S, D> {
    /// Build a session for an image of the given dimensions.
    ///
    /// `source_id` is handed to `source` on the first tile load; the
    /// session itself performs no I/O here.
    pub fn new(
        width: u32,
        height: u32,
        source_id: impl Into<String>,
        source: S,
        device: D,
        config: &CacheConfig,
    ) -> Result<Self, SessionError> {
        let pyramid = Arc::new(ImagePyramid::new(
            width,
            height,
            source_id,
            config.host_tile_cap,
        )?);
        let cache = Arc::new(GpuTileCache::new(device, config)?);
        let loader = TileLoader::new(Arc::clone(&pyramid), Arc::clone(&cache), source);
        Ok(Self {
            pyramid,
            cache,
            loader,
        })
    }

    /// Apply `pipeline` to every tile decoded from here on.
    pub fn with_pipeline(mut self, pipeline: TransformPipeline) -> Self {
        self.loader = self.loader.with_pipeline(pipeline);
        self
    }

    pub fn pyramid(&self) -> &Arc<ImagePyramid> {
        &self.pyramid
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Compute, load, and resolve the tile set for one frame.
    ///
    /// Load failures are non-fatal; affected tiles simply resolve through
    /// their resident ancestors or drop out of the draw list until a later
    /// frame succeeds.
    pub fn prepare_frame(&mut self, query: &ViewQuery) -> FrameSet {
        let visible = self.pyramid.visible_tiles(query);
        let loaded = self.loader.load_tiles(&visible);

        let level_count = self.pyramid.level_count();
        let mut draws: Vec<TileDraw> = Vec::with_capacity(visible.len());
        for &coord in &visible {
            let Some((resolved, slot)) =
                resolve_fallback(coord, level_count, |c| self.cache.slot_index(c))
            else {
                continue;
            };
            // Several tiles can resolve to one shared ancestor.
            if draws.iter().any(|d| d.coord == resolved) {
                continue;
            }
            draws.push(TileDraw {
                coord: resolved,
                slot,
                rect: tile_placement(resolved),
                fallback: resolved != coord,
            });
        }
        // Coarse first, then the pyramid's (level, y, x) order.
        draws.sort_by(|a, b| b.coord.level.cmp(&a.coord.level).then(a.coord.cmp(&b.coord)));

        FrameSet {
            visible,
            loaded,
            draws,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryDevice;
    use crate::decode::{MemoryDecoder, MemorySource};
    use crate::TILE_BYTES;

    const SOURCE: &str = "session-image";

    fn gradient_source() -> MemorySource {
        let decoder = MemoryDecoder::from_fn(600, 500, |x, y| {
            [(x % 256) as u8, (y % 256) as u8, 0, 255]
        });
        MemorySource::new().with(SOURCE, decoder)
    }

    fn session(source: MemorySource) -> ViewerSession<MemorySource, MemoryDevice> {
        let config = CacheConfig::default();
        ViewerSession::new(600, 500, SOURCE, source, MemoryDevice::new(), &config).unwrap()
    }

    #[test]
    fn test_first_frame_loads_all_visible() {
        let mut session = session(gradient_source());
        let query = ViewQuery::centered(800, 600, 1.0);

        let frame = session.prepare_frame(&query);
        assert!(!frame.visible.is_empty());
        assert_eq!(frame.loaded, frame.visible.len());
        assert_eq!(frame.draws.len(), frame.visible.len());
        assert!(frame.draws.iter().all(|d| !d.fallback));
    }

    #[test]
    fn test_second_frame_is_all_hits() {
        let mut session = session(gradient_source());
        let query = ViewQuery::centered(800, 600, 1.0);

        let first = session.prepare_frame(&query);
        let misses_after_first = session.cache_stats().misses;
        let second = session.prepare_frame(&query);

        assert_eq!(second.visible, first.visible);
        assert_eq!(second.loaded, second.visible.len());
        assert_eq!(session.cache_stats().misses, misses_after_first);
        assert!(second.draws.iter().all(|d| !d.fallback));
    }

    #[test]
    fn test_unloadable_tiles_fall_back_to_resident_ancestor() {
        // Empty source: every load fails. Seed one coarse ancestor directly.
        let mut session = session(MemorySource::new());
        let ancestor = TileCoordinate::new(1, 0, 0);
        session
            .cache
            .request_tile(ancestor, &vec![5u8; TILE_BYTES])
            .unwrap();

        let frame = session.prepare_frame(&ViewQuery::centered(800, 600, 1.0));
        assert_eq!(frame.loaded, 0);

        // Level-0 tiles under the ancestor collapse into one fallback draw.
        assert_eq!(frame.draws.len(), 1);
        let draw = &frame.draws[0];
        assert_eq!(draw.coord, ancestor);
        assert!(draw.fallback);
        assert_eq!(draw.rect.size, 512);
    }

    #[test]
    fn test_nothing_resident_empty_draw_list() {
        let mut session = session(MemorySource::new());
        let frame = session.prepare_frame(&ViewQuery::centered(800, 600, 1.0));
        assert_eq!(frame.loaded, 0);
        assert!(frame.draws.is_empty());
    }

    #[test]
    fn test_draws_sorted_coarse_first() {
        let mut session = session(gradient_source());
        // Seed a coarse tile, then load fine tiles over it.
        let ancestor = TileCoordinate::new(1, 1, 0);
        session
            .cache
            .request_tile(ancestor, &vec![5u8; TILE_BYTES])
            .unwrap();

        let frame = session.prepare_frame(&ViewQuery::centered(800, 600, 1.0));
        let levels: Vec<u32> = frame.draws.iter().map(|d| d.coord.level).collect();
        let mut sorted = levels.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(levels, sorted);
    }
}
