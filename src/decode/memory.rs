//! In-memory region decoder.
//!
//! Holds a full RGBA raster in host memory and serves region reads by
//! direct row copies, with a box filter for downsampled reads. This is the
//! reference [`RegionDecoder`] implementation and doubles as the test
//! backend: tests build deterministic rasters with [`MemoryDecoder::from_fn`]
//! and assert on the exact bytes the loader produces.

use std::collections::HashMap;

use bytes::Bytes;

use super::{output_len, Rect, RegionDecoder, TileSource};
use crate::error::DecodeError;
use crate::BYTES_PER_PIXEL;

// =============================================================================
// Memory Decoder
// =============================================================================

/// A [`RegionDecoder`] over an RGBA raster held in memory.
#[derive(Debug, Clone)]
pub struct MemoryDecoder {
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl MemoryDecoder {
    /// Wrap an existing RGBA buffer of exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, pixels: impl Into<Bytes>) -> Result<Self, DecodeError> {
        let pixels = pixels.into();
        let expected = output_len(width, height);
        if pixels.len() != expected {
            return Err(DecodeError::Open {
                source_id: "<memory>".to_string(),
                reason: format!(
                    "pixel buffer is {} bytes, expected {} for {}x{}",
                    pixels.len(),
                    expected,
                    width,
                    height
                ),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a raster by evaluating `f(x, y) -> [r, g, b, a]` per pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(output_len(width, height));
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels: Bytes::from(pixels),
        }
    }

    fn copy_rows(&self, region: Rect, output: &mut [u8]) {
        let src_stride = self.width as usize * BYTES_PER_PIXEL;
        let row_bytes = region.width as usize * BYTES_PER_PIXEL;
        for row in 0..region.height as usize {
            let src_off = (region.y as usize + row) * src_stride + region.x as usize * BYTES_PER_PIXEL;
            let dst_off = row * row_bytes;
            output[dst_off..dst_off + row_bytes]
                .copy_from_slice(&self.pixels[src_off..src_off + row_bytes]);
        }
    }

    /// Box-filter the region down to the destination size.
    ///
    /// Each destination pixel averages the source box it covers; boxes are
    /// aligned by integer division so the filter is exact for power-of-two
    /// downsampling, which is the only ratio the tile pyramid produces.
    fn box_resample(&self, region: Rect, dst_width: u32, dst_height: u32, output: &mut [u8]) {
        let src_stride = self.width as usize * BYTES_PER_PIXEL;
        for dy in 0..dst_height as u64 {
            let y0 = region.y as u64 + dy * region.height as u64 / dst_height as u64;
            let y1 = region.y as u64 + (dy + 1) * region.height as u64 / dst_height as u64;
            for dx in 0..dst_width as u64 {
                let x0 = region.x as u64 + dx * region.width as u64 / dst_width as u64;
                let x1 = region.x as u64 + (dx + 1) * region.width as u64 / dst_width as u64;

                let mut acc = [0u64; 4];
                let mut count = 0u64;
                for sy in y0..y1.max(y0 + 1) {
                    for sx in x0..x1.max(x0 + 1) {
                        let off = sy as usize * src_stride + sx as usize * BYTES_PER_PIXEL;
                        for c in 0..4 {
                            acc[c] += self.pixels[off + c] as u64;
                        }
                        count += 1;
                    }
                }

                let dst_off =
                    (dy as usize * dst_width as usize + dx as usize) * BYTES_PER_PIXEL;
                for c in 0..4 {
                    output[dst_off + c] = (acc[c] / count) as u8;
                }
            }
        }
    }
}

impl RegionDecoder for MemoryDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_region(
        &self,
        region: Rect,
        dst_width: u32,
        dst_height: u32,
        output: &mut [u8],
    ) -> Result<(), DecodeError> {
        if !region.fits_in(self.width, self.height) {
            return Err(DecodeError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                image_width: self.width,
                image_height: self.height,
            });
        }
        let expected = output_len(dst_width, dst_height);
        if output.len() != expected || dst_width == 0 || dst_height == 0 {
            return Err(DecodeError::Resample(format!(
                "output buffer is {} bytes, expected {} for {}x{}",
                output.len(),
                expected,
                dst_width,
                dst_height
            )));
        }

        if dst_width == region.width && dst_height == region.height {
            self.copy_rows(region, output);
        } else {
            self.box_resample(region, dst_width, dst_height, output);
        }
        Ok(())
    }
}

// =============================================================================
// Memory Source
// =============================================================================

/// A [`TileSource`] over named in-memory rasters.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    images: HashMap<String, MemoryDecoder>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster under an identifier.
    pub fn insert(&mut self, source_id: impl Into<String>, decoder: MemoryDecoder) {
        self.images.insert(source_id.into(), decoder);
    }

    /// Builder-style [`MemorySource::insert`].
    pub fn with(mut self, source_id: impl Into<String>, decoder: MemoryDecoder) -> Self {
        self.insert(source_id, decoder);
        self
    }
}

impl TileSource for MemorySource {
    type Decoder = MemoryDecoder;

    fn open(&self, source_id: &str) -> Result<Self::Decoder, DecodeError> {
        self.images
            .get(source_id)
            .cloned()
            .ok_or_else(|| DecodeError::Open {
                source_id: source_id.to_string(),
                reason: "no such in-memory image".to_string(),
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
