//! Render-consumer helpers: placement math, fallback resolution, and
//! per-tile transforms. Nothing here touches a device; the render backend
//! consumes slot indices and draw rectangles and does its own drawing.

mod fallback;
mod transform;

pub use fallback::resolve_fallback;
pub use transform::{
    AdjustTransform, ScaleTransform, TileImage, TileTransform, TransformPipeline,
};

use crate::pyramid::TileCoordinate;

/// Axis-aligned draw rectangle in level-0 source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x: u64,
    pub y: u64,
    pub size: u64,
}

/// Where a tile lands in source-image space.
///
/// A level-L tile covers a square of side `256 << L` level-0 pixels, so a
/// fallback ancestor naturally covers the whole footprint of the finer
/// tiles it stands in for.
pub fn tile_placement(coord: TileCoordinate) -> TileRect {
    let (x, y, size) = coord.source_rect();
    TileRect { x, y, size }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level0_placement() {
        let rect = tile_placement(TileCoordinate::new(0, 3, 2));
        assert_eq!(
            rect,
            TileRect {
                x: 768,
                y: 512,
                size: 256
            }
        );
    }

    #[test]
    fn test_coarse_placement_covers_children() {
        let parent = tile_placement(TileCoordinate::new(2, 1, 1));
        assert_eq!(
            parent,
            TileRect {
                x: 1024,
                y: 1024,
                size: 1024
            }
        );

        // Level-0 descendant (4..8, 4..8) footprints all fall inside.
        let child = tile_placement(TileCoordinate::new(0, 7, 4));
        assert!(child.x >= parent.x && child.x + child.size <= parent.x + parent.size);
        assert!(child.y >= parent.y && child.y + child.size <= parent.y + parent.size);
    }
}
