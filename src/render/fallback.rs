//! Coarser-ancestor fallback resolution.
//!
//! When a desired tile is not yet device-resident the render consumer draws
//! whatever resident ancestor covers the same screen area, scaled up, so
//! zooming never shows holes while the loader catches up. Resolution is a
//! pure walk over a residency predicate and never mutates cache state.

use crate::pyramid::TileCoordinate;

/// Resolve `desired` to a drawable resident tile.
///
/// Tries the desired coordinate first, then each coarser ancestor up to the
/// top of the pyramid. Returns the first resident coordinate with its slot,
/// or `None` when nothing on the ancestor chain is resident.
pub fn resolve_fallback(
    desired: TileCoordinate,
    level_count: usize,
    residency: impl Fn(TileCoordinate) -> Option<u32>,
) -> Option<(TileCoordinate, u32)> {
    let mut candidate = desired;
    loop {
        if let Some(slot) = residency(candidate) {
            return Some((candidate, slot));
        }
        if candidate.level as usize + 1 >= level_count {
            return None;
        }
        candidate = match candidate.parent() {
            Some(parent) => parent,
            None => return None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn residency_of(map: &HashMap<TileCoordinate, u32>) -> impl Fn(TileCoordinate) -> Option<u32> + '_ {
        move |coord| map.get(&coord).copied()
    }

    #[test]
    fn test_resident_tile_wins() {
        let desired = TileCoordinate::new(0, 5, 3);
        let mut map = HashMap::new();
        map.insert(desired, 7);
        map.insert(desired.parent().unwrap(), 1);

        assert_eq!(
            resolve_fallback(desired, 4, residency_of(&map)),
            Some((desired, 7))
        );
    }

    #[test]
    fn test_walks_to_distant_ancestor() {
        // Only the level-2 ancestor of a level-0 tile is resident.
        let desired = TileCoordinate::new(0, 5, 3);
        let ancestor = TileCoordinate::new(2, 1, 0);
        let mut map = HashMap::new();
        map.insert(ancestor, 9);

        assert_eq!(
            resolve_fallback(desired, 4, residency_of(&map)),
            Some((ancestor, 9))
        );
    }

    #[test]
    fn test_nothing_resident() {
        let map = HashMap::new();
        assert_eq!(
            resolve_fallback(TileCoordinate::new(0, 0, 0), 4, residency_of(&map)),
            None
        );
    }

    #[test]
    fn test_stops_at_top_level() {
        // A resident coordinate above the pyramid's level count is ignored.
        let mut map = HashMap::new();
        map.insert(TileCoordinate::new(3, 0, 0), 2);
        assert_eq!(
            resolve_fallback(TileCoordinate::new(0, 1, 1), 3, residency_of(&map)),
            None
        );
    }
}
