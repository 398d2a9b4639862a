//! On-demand tile loading: windowed decode, host-table fill, device upload.
//!
//! The [`TileLoader`] is the only component that decodes pixels. Per tile it
//! reads exactly the tile's source footprint through the [`RegionDecoder`]
//! seam (the full image is never materialized), records the result in the
//! pyramid's host table, and requests a device slot from the cache. Loads
//! are independent per tile and idempotent, so callers simply re-request
//! every visible tile each frame.
//!
//! The source is opened lazily on the first load. An open failure is
//! permanent for the loader instance and is surfaced as
//! [`LoadError::SourceUnavailable`] on every subsequent call.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{GpuTileCache, RenderDevice};
use crate::decode::{output_len, Rect, RegionDecoder, TileSource};
use crate::error::{DecodeError, LoadError, TransformError};
use crate::pyramid::{ImagePyramid, TileCoordinate};
use crate::render::{TileImage, TransformPipeline};
use crate::{BYTES_PER_PIXEL, TILE_BYTES, TILE_SIZE};

// =============================================================================
// Tile Loader
// =============================================================================

/// Decodes tiles on demand and moves them into the device slot pool.
pub struct TileLoader<S: TileSource, D: RenderDevice> {
    pyramid: Arc<ImagePyramid>,
    cache: Arc<GpuTileCache<D>>,
    source: S,

    /// `None` until the first load; then the open result, kept for the
    /// loader's lifetime.
    decoder: Option<Result<S::Decoder, DecodeError>>,
    pipeline: Option<TransformPipeline>,
}

impl<S: TileSource, D: RenderDevice> TileLoader<S, D> {
    pub fn new(pyramid: Arc<ImagePyramid>, cache: Arc<GpuTileCache<D>>, source: S) -> Self {
        Self {
            pyramid,
            cache,
            source,
            decoder: None,
            pipeline: None,
        }
    }

    /// Apply `pipeline` to every decoded tile before caching it.
    ///
    /// Both caches hold post-transform pixels; changing the pipeline does
    /// not retroactively touch tiles already cached.
    pub fn with_pipeline(mut self, pipeline: TransformPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Ensure a tile is device-resident and return its slot.
    ///
    /// Resolution order: device slot pool, host table, windowed decode.
    /// Idempotent; repeated calls for a resident tile only refresh its
    /// recency.
    pub fn load_tile(&mut self, coord: TileCoordinate) -> Result<u32, LoadError> {
        if !self.pyramid.has_tile(coord) {
            return Err(LoadError::InvalidCoordinate(coord));
        }

        // Host-resident pixels let request_tile refresh recency on a device
        // hit and re-upload after an eviction in one call.
        if let Some(data) = self.pyramid.tile_data(coord) {
            return Ok(self.cache.request_tile(coord, &data)?);
        }
        if let Some(slot) = self.cache.slot_index(coord) {
            return Ok(slot);
        }

        let pixels = self.decode_tile(coord)?;
        self.pyramid.mark_tile_loaded(coord, &pixels);
        Ok(self.cache.request_tile(coord, &pixels)?)
    }

    /// Load a batch of tiles, returning how many succeeded.
    ///
    /// Tiles are independent; a failure is logged and skipped without
    /// affecting the rest of the batch.
    pub fn load_tiles(&mut self, coords: &[TileCoordinate]) -> usize {
        let mut loaded = 0;
        for &coord in coords {
            match self.load_tile(coord) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(?coord, error = %e, "tile load failed"),
            }
        }
        loaded
    }

    fn decoder(&mut self) -> Result<&S::Decoder, LoadError> {
        if self.decoder.is_none() {
            let opened = self.source.open(self.pyramid.source_id());
            match &opened {
                Ok(_) => debug!(source = self.pyramid.source_id(), "opened tile source"),
                Err(e) => warn!(source = self.pyramid.source_id(), error = %e, "source open failed"),
            }
            self.decoder = Some(opened);
        }
        match self.decoder.as_ref() {
            Some(Ok(decoder)) => Ok(decoder),
            Some(Err(e)) => Err(LoadError::SourceUnavailable(e.clone())),
            None => Err(LoadError::SourceUnavailable(DecodeError::Open {
                source_id: self.pyramid.source_id().to_string(),
                reason: "decoder not initialized".to_string(),
            })),
        }
    }

    /// Windowed decode of one tile into an exact [`TILE_BYTES`] buffer.
    ///
    /// The tile's footprint in level-0 space is clipped to the image; the
    /// decoder resamples the clipped rect to its size at the tile's level
    /// (at most 256 per axis) in one pass. Pixels beyond the source extent
    /// stay zero.
    fn decode_tile(&mut self, coord: TileCoordinate) -> Result<Vec<u8>, LoadError> {
        let (image_width, image_height) = self.pyramid.dimensions();
        let (src_x, src_y, footprint) = coord.source_rect();

        // has_tile guarantees the footprint origin is inside the image.
        let clipped_w = footprint.min(image_width as u64 - src_x) as u32;
        let clipped_h = footprint.min(image_height as u64 - src_y) as u32;

        let scale = 1u64 << coord.level;
        let dst_w = (clipped_w as u64).div_ceil(scale) as u32;
        let dst_h = (clipped_h as u64).div_ceil(scale) as u32;

        let mut region = vec![0u8; output_len(dst_w, dst_h)];
        self.decoder()?.read_region(
            Rect::new(src_x as u32, src_y as u32, clipped_w, clipped_h),
            dst_w,
            dst_h,
            &mut region,
        )?;

        let mut tile = vec![0u8; TILE_BYTES];
        let tile_stride = TILE_SIZE as usize * BYTES_PER_PIXEL;
        let row_bytes = dst_w as usize * BYTES_PER_PIXEL;
        for row in 0..dst_h as usize {
            tile[row * tile_stride..row * tile_stride + row_bytes]
                .copy_from_slice(&region[row * row_bytes..(row + 1) * row_bytes]);
        }

        match &self.pipeline {
            Some(pipeline) if !pipeline.is_empty() => {
                let out = pipeline.apply(TileImage::new(TILE_SIZE, TILE_SIZE, tile)?)?;
                if out.width != TILE_SIZE || out.height != TILE_SIZE {
                    return Err(LoadError::Transform(TransformError::BadOutput {
                        expected: TILE_BYTES,
                        actual: out.pixels.len(),
                    }));
                }
                Ok(out.pixels)
            }
            _ => Ok(tile),
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
    use crate::render::AdjustTransform;

    const SOURCE: &str = "test-image";

    /// 600x500 gradient: two pyramid levels, 3x2 tile grid at level 0.
    fn gradient_source() -> MemorySource {
        let decoder = MemoryDecoder::from_fn(600, 500, |x, y| {
            [(x % 256) as u8, (y % 256) as u8, 0, 255]
        });
        MemorySource::new().with(SOURCE, decoder)
    }

    fn loader(
        source: MemorySource,
        slots: u32,
    ) -> TileLoader<MemorySource, MemoryDevice> {
        let pyramid = Arc::new(ImagePyramid::new(600, 500, SOURCE, 64).unwrap());
        let cache = Arc::new(GpuTileCache::with_slots(MemoryDevice::new(), slots).unwrap());
        TileLoader::new(pyramid, cache, source)
    }

    fn pixel(tile: &[u8], x: usize, y: usize) -> &[u8] {
        let off = (y * TILE_SIZE as usize + x) * BYTES_PER_PIXEL;
        &tile[off..off + BYTES_PER_PIXEL]
    }

    #[test]
    fn test_invalid_coordinate() {
        let mut loader = loader(gradient_source(), 8);
        let err = loader.load_tile(TileCoordinate::new(0, 3, 0)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_level0_decode_copies_source_region() {
        let mut loader = loader(gradient_source(), 8);
        let coord = TileCoordinate::new(0, 1, 1);
        let slot = loader.load_tile(coord).unwrap();

        let tile = loader.pyramid.tile_data(coord).unwrap();
        assert_eq!(tile.len(), TILE_BYTES);
        // Tile origin is source pixel (256, 256).
        assert_eq!(pixel(&tile, 0, 0), &[0, 0, 0, 255]);
        assert_eq!(pixel(&tile, 10, 20), &[10, 20, 0, 255]);
        assert_eq!(loader.cache.slot_index(coord), Some(slot));
    }

    #[test]
    fn test_edge_tile_zero_padded() {
        let mut loader = loader(gradient_source(), 8);
        // Covers source x 512..600, y 256..500: 88x244 of real pixels.
        let coord = TileCoordinate::new(0, 2, 1);
        loader.load_tile(coord).unwrap();

        let tile = loader.pyramid.tile_data(coord).unwrap();
        assert_eq!(pixel(&tile, 87, 0), &[(599 % 256) as u8, 0, 0, 255]);
        assert_eq!(pixel(&tile, 88, 0), &[0, 0, 0, 0]);
        assert_eq!(pixel(&tile, 0, 243)[3], 255);
        assert_eq!(pixel(&tile, 0, 244), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_level1_decode_resamples() {
        let mut loader = loader(gradient_source(), 8);
        // Level-1 tile (0,0) covers source 0..512 x 0..500, resampled to
        // 256x250 and padded below.
        let coord = TileCoordinate::new(1, 0, 0);
        loader.load_tile(coord).unwrap();

        let tile = loader.pyramid.tile_data(coord).unwrap();
        assert_eq!(pixel(&tile, 0, 249)[3], 255);
        assert_eq!(pixel(&tile, 0, 250), &[0, 0, 0, 0]);
        // Halved gradient: red at column 100 averages source columns 200-201.
        assert_eq!(pixel(&tile, 100, 0)[0], 200);
    }

    #[test]
    fn test_repeated_load_is_idempotent() {
        let mut loader = loader(gradient_source(), 8);
        let coord = TileCoordinate::new(0, 0, 0);

        let first = loader.load_tile(coord).unwrap();
        let second = loader.load_tile(coord).unwrap();
        assert_eq!(first, second);

        let stats = loader.cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_reupload_from_host_after_eviction() {
        let mut loader = loader(gradient_source(), 1);
        let a = TileCoordinate::new(0, 0, 0);
        let b = TileCoordinate::new(0, 1, 0);

        loader.load_tile(a).unwrap();
        loader.load_tile(b).unwrap();
        assert!(loader.cache.slot_index(a).is_none());

        // Still host-resident, so this re-uploads without decoding.
        assert_eq!(loader.pyramid.resident_tile_count(), 2);
        loader.load_tile(a).unwrap();
        assert!(loader.cache.slot_index(a).is_some());
    }

    #[test]
    fn test_open_failure_is_permanent() {
        let mut loader = loader(MemorySource::new(), 8);
        let coord = TileCoordinate::new(0, 0, 0);

        for _ in 0..2 {
            let err = loader.load_tile(coord).unwrap_err();
            assert!(matches!(err, LoadError::SourceUnavailable(_)));
        }
    }

    #[test]
    fn test_load_tiles_counts_successes() {
        let mut loader = loader(gradient_source(), 8);
        let coords = [
            TileCoordinate::new(0, 0, 0),
            TileCoordinate::new(0, 9, 9),
            TileCoordinate::new(1, 1, 0),
        ];
        assert_eq!(loader.load_tiles(&coords), 2);
    }

    #[test]
    fn test_pipeline_applies_before_caching() {
        let pipeline = TransformPipeline::new().with(AdjustTransform::exposure(1.0));
        let mut loader = loader(gradient_source(), 8).with_pipeline(pipeline);

        let coord = TileCoordinate::new(0, 0, 0);
        loader.load_tile(coord).unwrap();

        let tile = loader.pyramid.tile_data(coord).unwrap();
        // Source red at (50, 0) is 50; one stop up roughly doubles it.
        let red = pixel(&tile, 50, 0)[0];
        assert!(red > 80, "expected brightened pixel, got {red}");
    }
}
