//! `image`-crate-backed region decoder for ordinary image files.
//!
//! [`StandardDecoder`] adapts formats without native windowed access (plain
//! PNG/JPEG/TIFF files) to the [`RegionDecoder`] contract. Opening probes
//! only the header for dimensions; pixels are materialized once, lazily, on
//! the first region read and shared across all subsequent reads.
//!
//! This adapter necessarily holds one full decode in memory, so it suits
//! sources up to normal photo sizes. Gigapixel sources need a decoder with
//! real windowed access (tiled TIFF, etc.) behind the same trait.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::imageops::{self, FilterType};
use image::{ImageReader, RgbaImage};

use super::{output_len, Rect, RegionDecoder, TileSource};
use crate::error::DecodeError;

// =============================================================================
// Standard Decoder
// =============================================================================

/// A [`RegionDecoder`] over a file decodable by the `image` crate.
#[derive(Debug)]
pub struct StandardDecoder {
    path: PathBuf,
    width: u32,
    height: u32,

    /// Lazily materialized full decode, shared across reads.
    pixels: Mutex<Option<Arc<RgbaImage>>>,
}

impl StandardDecoder {
    /// Open a file, probing its dimensions from the header only.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DecodeError> {
        let path = path.into();
        let open_err = |reason: String| DecodeError::Open {
            source_id: path.display().to_string(),
            reason,
        };

        let reader = ImageReader::open(&path)
            .map_err(|e| open_err(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| open_err(e.to_string()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| open_err(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(open_err(format!("zero-sized image: {}x{}", width, height)));
        }

        Ok(Self {
            path,
            width,
            height,
            pixels: Mutex::new(None),
        })
    }

    /// Decode the full image on first use; later calls reuse the result.
    fn materialize(&self) -> Result<Arc<RgbaImage>, DecodeError> {
        let mut slot = self.pixels.lock().expect("decode cache poisoned");
        if let Some(ref pixels) = *slot {
            return Ok(Arc::clone(pixels));
        }

        let decoded = ImageReader::open(&self.path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| DecodeError::Open {
                source_id: self.path.display().to_string(),
                reason: e.to_string(),
            })?
            .decode()
            .map_err(|e| DecodeError::Open {
                source_id: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let pixels = Arc::new(decoded.into_rgba8());
        *slot = Some(Arc::clone(&pixels));
        Ok(pixels)
    }
}

impl RegionDecoder for StandardDecoder {
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

        let pixels = self.materialize()?;
        let cropped =
            imageops::crop_imm(&*pixels, region.x, region.y, region.width, region.height)
                .to_image();

        if dst_width == region.width && dst_height == region.height {
            output.copy_from_slice(cropped.as_raw());
        } else {
            let resized = imageops::resize(&cropped, dst_width, dst_height, FilterType::Triangle);
            output.copy_from_slice(resized.as_raw());
        }
        Ok(())
    }
}

// =============================================================================
// Standard Source
// =============================================================================

/// A [`TileSource`] that treats source identifiers as filesystem paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardSource;

impl TileSource for StandardSource {
    type Decoder = StandardDecoder;

    fn open(&self, source_id: &str) -> Result<Self::Decoder, DecodeError> {
        StandardDecoder::open(source_id)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Write a deterministic gradient PNG and hand its path to the test.
    fn with_test_png(name: &str, width: u32, height: u32, f: impl FnOnce(&Path)) {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        });
        let path = std::env::temp_dir().join(format!("gigaview-{}-{}", std::process::id(), name));
        img.save(&path).unwrap();
        f(&path);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_open_reports_dimensions() {
        with_test_png("dims.png", 64, 48, |path| {
            let decoder = StandardDecoder::open(path).unwrap();
            assert_eq!(decoder.dimensions(), (64, 48));
        });
    }

    #[test]
    fn test_open_missing_file() {
        let err = StandardDecoder::open("/nonexistent/missing.png").unwrap_err();
        assert!(matches!(err, DecodeError::Open { .. }));
    }

    #[test]
    fn test_region_matches_full_decode_crop() {
        with_test_png("crop.png", 64, 48, |path| {
            let decoder = StandardDecoder::open(path).unwrap();

            let mut out = vec![0u8; 8 * 8 * 4];
            decoder
                .read_region(Rect::new(10, 20, 8, 8), 8, 8, &mut out)
                .unwrap();

            // First pixel of the region is (10, 20) in the gradient.
            assert_eq!(&out[0..4], &[10, 20, 0, 255]);
            // Last pixel is (17, 27).
            assert_eq!(&out[out.len() - 4..], &[17, 27, 0, 255]);
        });
    }

    #[test]
    fn test_region_out_of_bounds() {
        with_test_png("oob.png", 64, 48, |path| {
            let decoder = StandardDecoder::open(path).unwrap();
            let mut out = vec![0u8; 8 * 8 * 4];
            let err = decoder
                .read_region(Rect::new(60, 0, 8, 8), 8, 8, &mut out)
                .unwrap_err();
            assert!(matches!(err, DecodeError::RegionOutOfBounds { .. }));
        });
    }

    #[test]
    fn test_downsampled_read() {
        with_test_png("down.png", 64, 64, |path| {
            let decoder = StandardDecoder::open(path).unwrap();
            let mut out = vec![0u8; 16 * 16 * 4];
            decoder
                .read_region(Rect::new(0, 0, 64, 64), 16, 16, &mut out)
                .unwrap();
            // Gradient survives downsampling: red increases along X.
            let first_red = out[0];
            let last_in_row_red = out[15 * 4];
            assert!(last_in_row_red > first_red);
        });
    }

    #[test]
    fn test_standard_source_open() {
        with_test_png("src.png", 32, 32, |path| {
            let source = StandardSource;
            let decoder = source.open(path.to_str().unwrap()).unwrap();
            assert_eq!(decoder.dimensions(), (32, 32));
        });
    }
}
