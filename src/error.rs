use thiserror::Error;

use crate::pyramid::TileCoordinate;

/// Errors that can occur when constructing an image pyramid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PyramidError {
    /// Source image has a zero dimension
    #[error("Invalid image dimensions: {width}x{height} (both must be >= 1)")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Errors reported by a region decoder
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The source could not be opened or parsed
    #[error("Failed to open source '{source_id}': {reason}")]
    Open { source_id: String, reason: String },

    /// Requested pixel rectangle falls outside the source image
    #[error(
        "Region out of bounds: ({x},{y}) {width}x{height} exceeds image {image_width}x{image_height}"
    )]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Resampling a region to the requested output size failed
    #[error("Resample failed: {0}")]
    Resample(String),
}

/// Errors reported by the render device when uploading tile data
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// Device-side failure (lost device, out of memory, ...)
    #[error("Device error: {0}")]
    Device(String),

    /// Slot index outside the allocated slot pool
    #[error("Slot {slot} out of range (pool has {capacity} slots)")]
    SlotOutOfRange { slot: u32, capacity: u32 },

    /// Pixel buffer is not exactly one tile
    #[error("Bad tile buffer: expected {expected} bytes, got {actual}")]
    BadTileSize { expected: usize, actual: usize },

    /// The device granted no slots at all
    #[error("Device allocated an empty slot pool")]
    NoSlots,
}

/// Errors reported by a tile transform stage
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// A stage produced a buffer of the wrong length
    #[error("Transform produced {actual} bytes, expected {expected}")]
    BadOutput { expected: usize, actual: usize },

    /// Stage-specific failure
    #[error("Transform failed: {0}")]
    Failed(String),
}

/// Errors that can occur while resolving a tile to a GPU slot
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Coordinate does not exist in the pyramid
    #[error("Invalid tile coordinate: level={} x={} y={}", .0.level, .0.x, .0.y)]
    InvalidCoordinate(TileCoordinate),

    /// The loader's source failed to open; permanent for this loader
    #[error("Source unavailable: {0}")]
    SourceUnavailable(DecodeError),

    /// A single tile's windowed decode failed; local to that tile
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// A transform stage rejected the decoded pixels
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    /// GPU upload failed; transient, retry allowed
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
}

/// Errors that can occur while constructing a viewer session
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Pyramid construction rejected the image dimensions
    #[error(transparent)]
    Pyramid(#[from] PyramidError),

    /// The device slot pool could not be allocated
    #[error(transparent)]
    Cache(#[from] UploadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PyramidError::InvalidDimensions {
            width: 0,
            height: 100,
        };
        assert!(err.to_string().contains("0x100"));

        let err = DecodeError::RegionOutOfBounds {
            x: 10000,
            y: 0,
            width: 256,
            height: 256,
            image_width: 5000,
            image_height: 4000,
        };
        assert!(err.to_string().contains("5000x4000"));
    }

    #[test]
    fn test_load_error_from_upload() {
        let upload = UploadError::Device("lost".to_string());
        let load: LoadError = upload.into();
        assert!(matches!(load, LoadError::Upload(_)));
    }
}
