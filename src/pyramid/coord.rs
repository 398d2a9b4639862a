//! Tile addressing.
//!
//! A [`TileCoordinate`] names one fixed-size tile within one pyramid level.
//! Coordinates are pure values: they carry no reference to the pyramid that
//! defines their bounds, so validity is always relative to a specific
//! [`crate::pyramid::ImagePyramid`] instance (checked via
//! [`crate::pyramid::ImagePyramid::has_tile`]).

use std::cmp::Ordering;

use crate::TILE_SIZE;

/// Identifies a tile by (pyramid level, column, row).
///
/// Level 0 is the highest resolution. A tile at level N covers a
/// `256 * 2^N` pixel square of the level-0 image.
///
/// Ordered by `(level, y, x)` so that iterating a sorted collection walks
/// tiles level by level in row-major order, which keeps loader batches and
/// test expectations deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    /// Pyramid level (0 = highest resolution)
    pub level: u32,

    /// Tile column, 0-indexed from the left
    pub x: u32,

    /// Tile row, 0-indexed from the top
    pub y: u32,
}

impl TileCoordinate {
    /// Create a new tile coordinate.
    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Map this coordinate into another level's tile grid.
    ///
    /// Moving to a coarser level (larger index) right-shifts the indices;
    /// moving to a finer level left-shifts them. Equal levels are the
    /// identity. The mapping is lossy toward coarser levels: four finer
    /// tiles share one coarser ancestor.
    ///
    /// No bounds checking is performed; use
    /// [`crate::pyramid::ImagePyramid::convert_to_level`] when both levels
    /// must be validated against a pyramid.
    pub fn shift_to_level(&self, target_level: u32) -> Self {
        let (x, y) = if target_level > self.level {
            let shift = target_level - self.level;
            (self.x >> shift, self.y >> shift)
        } else {
            let shift = self.level - target_level;
            (self.x << shift, self.y << shift)
        };
        Self {
            level: target_level,
            x,
            y,
        }
    }

    /// The coarser parent tile, or `None` at the coarsest possible level.
    pub fn parent(&self) -> Option<Self> {
        if self.level == u32::MAX {
            return None;
        }
        Some(Self {
            level: self.level + 1,
            x: self.x >> 1,
            y: self.y >> 1,
        })
    }

    /// Footprint of this tile in level-0 (source image) pixel space.
    ///
    /// Returns `(x, y, side)` where `side = 256 * 2^level`. The footprint
    /// may extend past the image edge for edge tiles; callers clip.
    pub fn source_rect(&self) -> (u64, u64, u64) {
        let scale = 1u64 << self.level;
        let side = TILE_SIZE as u64 * scale;
        (self.x as u64 * side, self.y as u64 * side, side)
    }
}

impl Ord for TileCoordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.level, self.y, self.x).cmp(&(other.level, other.y, other.x))
    }
}

impl PartialOrd for TileCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    #[test]
    fn test_equality_and_hash() {
        fn hash<T: Hash>(t: &T) -> u64 {
            let mut s = DefaultHasher::new();
            t.hash(&mut s);
            s.finish()
        }

        let a = TileCoordinate::new(1, 2, 3);
        let b = TileCoordinate::new(1, 2, 3);
        let c = TileCoordinate::new(2, 2, 3);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn test_ordering_is_level_row_column() {
        let mut coords = vec![
            TileCoordinate::new(1, 0, 0),
            TileCoordinate::new(0, 3, 0),
            TileCoordinate::new(0, 0, 1),
            TileCoordinate::new(0, 1, 0),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                TileCoordinate::new(0, 1, 0),
                TileCoordinate::new(0, 3, 0),
                TileCoordinate::new(0, 0, 1),
                TileCoordinate::new(1, 0, 0),
            ]
        );
    }

    #[test]
    fn test_shift_to_level() {
        let coord = TileCoordinate::new(0, 5, 3);

        // Identity
        assert_eq!(coord.shift_to_level(0), coord);

        // Coarser: right shift
        assert_eq!(coord.shift_to_level(1), TileCoordinate::new(1, 2, 1));
        assert_eq!(coord.shift_to_level(2), TileCoordinate::new(2, 1, 0));

        // Finer: left shift
        let coarse = TileCoordinate::new(2, 1, 1);
        assert_eq!(coarse.shift_to_level(0), TileCoordinate::new(0, 4, 4));
    }

    #[test]
    fn test_round_trip_is_lossy_then_stable() {
        let coord = TileCoordinate::new(0, 5, 3);
        let there_and_back = coord.shift_to_level(1).shift_to_level(0);

        // Non-increasing in both axes
        assert!(there_and_back.x <= coord.x);
        assert!(there_and_back.y <= coord.y);
        assert_eq!(there_and_back, TileCoordinate::new(0, 4, 2));

        // Idempotent once stabilized
        let again = there_and_back.shift_to_level(1).shift_to_level(0);
        assert_eq!(again, there_and_back);
    }

    #[test]
    fn test_parent() {
        assert_eq!(
            TileCoordinate::new(0, 5, 3).parent(),
            Some(TileCoordinate::new(1, 2, 1))
        );
    }

    #[test]
    fn test_source_rect() {
        assert_eq!(TileCoordinate::new(0, 2, 1).source_rect(), (512, 256, 256));
        assert_eq!(
            TileCoordinate::new(2, 1, 1).source_rect(),
            (1024, 1024, 1024)
        );
    }
}
