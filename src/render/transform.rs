//! Per-tile pixel transforms.
//!
//! Transforms run on decoded tiles before they enter the host table and the
//! device pool, so the caches always hold post-transform pixels and the
//! render path draws them untouched. Stages are composed by
//! [`TransformPipeline`] and applied in insertion order.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::TransformError;
use crate::BYTES_PER_PIXEL;

// =============================================================================
// Tile Image
// =============================================================================

/// An owned RGBA raster flowing through a transform pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TileImage {
    /// Wrap a buffer of exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TransformError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(TransformError::BadOutput {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    fn into_rgba(self) -> Result<RgbaImage, TransformError> {
        let (width, height, len) = (self.width, self.height, self.pixels.len());
        RgbaImage::from_raw(width, height, self.pixels).ok_or(TransformError::BadOutput {
            expected: width as usize * height as usize * BYTES_PER_PIXEL,
            actual: len,
        })
    }
}

// =============================================================================
// Transform Trait
// =============================================================================

/// One pipeline stage.
pub trait TileTransform: Send + Sync {
    fn transform(&self, tile: TileImage) -> Result<TileImage, TransformError>;
}

// =============================================================================
// Adjust Transform
// =============================================================================

/// Exposure, contrast, and saturation adjustment.
///
/// All three parameters default to the identity: exposure 0.0 (stops),
/// contrast 1.0, saturation 1.0. Alpha passes through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct AdjustTransform {
    pub exposure: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for AdjustTransform {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

impl AdjustTransform {
    pub fn exposure(exposure: f32) -> Self {
        Self {
            exposure,
            ..Self::default()
        }
    }

    fn adjust_channelwise(&self, rgb: [f32; 3]) -> [f32; 3] {
        let gain = self.exposure.exp2();
        let luma = 0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2];
        let mut out = [0f32; 3];
        for c in 0..3 {
            let exposed = rgb[c] * gain;
            let saturated = luma * gain + (exposed - luma * gain) * self.saturation;
            out[c] = ((saturated - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0);
        }
        out
    }
}

impl TileTransform for AdjustTransform {
    fn transform(&self, mut tile: TileImage) -> Result<TileImage, TransformError> {
        for px in tile.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            let rgb = [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ];
            let out = self.adjust_channelwise(rgb);
            for c in 0..3 {
                px[c] = (out[c] * 255.0).round() as u8;
            }
        }
        Ok(tile)
    }
}

// =============================================================================
// Scale Transform
// =============================================================================

/// Resample a tile to a fixed target size.
#[derive(Debug, Clone, Copy)]
pub struct ScaleTransform {
    pub target_width: u32,
    pub target_height: u32,
}

impl ScaleTransform {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }
}

impl TileTransform for ScaleTransform {
    fn transform(&self, tile: TileImage) -> Result<TileImage, TransformError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(TransformError::Failed(format!(
                "zero target size: {}x{}",
                self.target_width, self.target_height
            )));
        }
        if tile.width == self.target_width && tile.height == self.target_height {
            return Ok(tile);
        }
        let resized = imageops::resize(
            &tile.into_rgba()?,
            self.target_width,
            self.target_height,
            FilterType::Triangle,
        );
        TileImage::new(self.target_width, self.target_height, resized.into_raw())
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Ordered composition of transform stages.
#[derive(Default)]
pub struct TransformPipeline {
    stages: Vec<Box<dyn TileTransform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: impl TileTransform + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Builder-style [`TransformPipeline::push`].
    pub fn with(mut self, stage: impl TileTransform + 'static) -> Self {
        self.push(stage);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order. An empty pipeline is the identity.
    pub fn apply(&self, mut tile: TileImage) -> Result<TileImage, TransformError> {
        for stage in &self.stages {
            tile = stage.transform(tile)?;
        }
        Ok(tile)
    }
}

// =============================================================================
// Tests
// =============================================================================
