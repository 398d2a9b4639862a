//! Codec seam: windowed access to source image pixels.
//!
//! The viewer core never decodes image files itself; it consumes an opaque
//! [`RegionDecoder`] that can (1) report the source's native dimensions and
//! (2) copy an arbitrary pixel rectangle, optionally resampled, into a
//! caller buffer. This is what makes gigapixel sources workable: the loader
//! asks for exactly one tile's footprint per request, and a capable decoder
//! (tiled TIFF, JPEG with restart markers, ...) can serve it without
//! materializing the full image.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryDecoder`]: pixels held in RAM; the reference implementation
//!   and the test double.
//! - [`StandardDecoder`]: adapter over the `image` crate for ordinary
//!   files; probes dimensions from the header only and materializes pixels
//!   lazily on the first region read.

mod memory;
mod standard;

pub use memory::{MemoryDecoder, MemorySource};
pub use standard::{StandardDecoder, StandardSource};

use crate::error::DecodeError;
use crate::BYTES_PER_PIXEL;

// =============================================================================
// Pixel Rectangle
// =============================================================================

/// A pixel rectangle in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether this rectangle lies fully inside an image of the given size.
    pub fn fits_in(&self, image_width: u32, image_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= image_width as u64
            && self.y as u64 + self.height as u64 <= image_height as u64
    }
}

// =============================================================================
// Region Decoder
// =============================================================================

/// Windowed pixel access to one opened source image.
///
/// Pixel format is fixed crate-wide: 4 bytes per pixel, RGBA channel order.
pub trait RegionDecoder: Send + Sync {
    /// Native dimensions of the opened source.
    fn dimensions(&self) -> (u32, u32);

    /// Copy the pixels of `region`, resampled to `dst_width x dst_height`
    /// when those differ from the region size, into `output`.
    ///
    /// `output` must be exactly `dst_width * dst_height * 4` bytes.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::RegionOutOfBounds`] if `region` exceeds the image.
    /// - [`DecodeError::Resample`] if resampling fails or `output` has the
    ///   wrong length.
    /// - [`DecodeError::Open`] if lazily materialized pixels cannot be
    ///   produced.
    fn read_region(
        &self,
        region: Rect,
        dst_width: u32,
        dst_height: u32,
        output: &mut [u8],
    ) -> Result<(), DecodeError>;
}

/// Opens sources by identifier, producing decoders.
///
/// The loader opens its source lazily on first use and keeps the decoder
/// for all subsequent tile reads, so implementations should do their
/// expensive setup in [`TileSource::open`].
pub trait TileSource: Send + Sync {
    type Decoder: RegionDecoder;

    /// Open the source named by `source_id`.
    ///
    /// Fails with [`DecodeError::Open`] for missing or unparseable sources.
    fn open(&self, source_id: &str) -> Result<Self::Decoder, DecodeError>;
}

/// Expected buffer length for a destination size, in bytes.
pub(crate) fn output_len(dst_width: u32, dst_height: u32) -> usize {
    dst_width as usize * dst_height as usize * BYTES_PER_PIXEL
}

// =============================================================================
// Tests
// =============================================================================
