//! Fixed-capacity device-resident tile cache.
//!
//! One pool of tile slots is allocated up front on a [`RenderDevice`] and
//! never grows; residency is tracked per [`TileCoordinate`] and slots are
//! recycled least-recently-used once the pool is full. Requesting a tile
//! that is already resident is a cheap map lookup plus a recency touch, so
//! callers re-request every visible tile every frame without bookkeeping.
//!
//! Upload ordering is the one subtle invariant here: on a miss the pixel
//! upload happens before the residency map is rewritten, so a failed upload
//! leaves the previous occupant resident and addressable.

mod device;

pub use device::{MemoryDevice, RenderDevice};

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::UploadError;
use crate::pyramid::TileCoordinate;
use crate::TILE_BYTES;

// =============================================================================
// Cache State
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Slot {
    coord: TileCoordinate,
    last_used: u64,
    in_use: bool,
}

#[derive(Debug)]
struct CacheState {
    slots: Vec<Slot>,
    map: HashMap<TileCoordinate, u32>,
    /// Logical access clock; bumped once per request.
    clock: u64,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn with_capacity(capacity: u32) -> Self {
        Self {
            slots: vec![
                Slot {
                    coord: TileCoordinate::new(0, 0, 0),
                    last_used: 0,
                    in_use: false,
                };
                capacity as usize
            ],
            map: HashMap::new(),
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// First never-used slot, else the least-recently-used occupant.
    fn pick_slot(&self) -> u32 {
        if let Some(free) = self.slots.iter().position(|s| !s.in_use) {
            return free as u32;
        }
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.last_used)
            .map(|(i, _)| i as u32)
            .unwrap_or(0)
    }
}

/// Snapshot of cache occupancy and hit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub used_slots: u32,
    pub total_slots: u32,
}

// =============================================================================
// GPU Tile Cache
// =============================================================================

/// Fixed pool of device tile slots with LRU recycling.
pub struct GpuTileCache<D: RenderDevice> {
    device: D,
    state: Mutex<CacheState>,
    capacity: u32,
}

impl<D: RenderDevice> GpuTileCache<D> {
    /// Allocate a pool sized from `config` on `device`.
    ///
    /// The configured pool size is clamped to the supported range before
    /// conversion to slots; the device may grant fewer slots than asked.
    pub fn new(device: D, config: &CacheConfig) -> Result<Self, UploadError> {
        Self::with_slots(device, config.slot_count())
    }

    /// Allocate a pool of exactly `slots` requested slots.
    pub fn with_slots(device: D, slots: u32) -> Result<Self, UploadError> {
        let granted = device.allocate(slots)?;
        let capacity = granted.min(slots);
        if capacity == 0 {
            return Err(UploadError::NoSlots);
        }
        debug!(requested = slots, granted = capacity, "allocated tile pool");
        Ok(Self {
            device,
            state: Mutex::new(CacheState::with_capacity(capacity)),
            capacity,
        })
    }

    /// Total slot count of the pool.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Slot holding `coord`, if resident. Read-only: no recency update.
    pub fn slot_index(&self, coord: TileCoordinate) -> Option<u32> {
        let state = self.state.lock().expect("cache state poisoned");
        state.map.get(&coord).copied()
    }

    /// Ensure `coord` is resident, uploading `pixels` if it is not, and
    /// return its slot.
    ///
    /// Idempotent: a resident tile only gets its recency refreshed and
    /// `pixels` is ignored. On a miss a free or least-recently-used slot is
    /// recycled; the upload commits before the residency map changes, so an
    /// upload failure leaves the cache exactly as it was.
    pub fn request_tile(&self, coord: TileCoordinate, pixels: &[u8]) -> Result<u32, UploadError> {
        if pixels.len() != TILE_BYTES {
            return Err(UploadError::BadTileSize {
                expected: TILE_BYTES,
                actual: pixels.len(),
            });
        }

        let mut guard = self.state.lock().expect("cache state poisoned");
        let state = &mut *guard;
        state.clock += 1;
        let now = state.clock;

        if let Some(&slot) = state.map.get(&coord) {
            state.slots[slot as usize].last_used = now;
            state.hits += 1;
            return Ok(slot);
        }
        state.misses += 1;

        let slot = state.pick_slot();
        self.device.upload_tile(slot, pixels)?;

        let evicted = state.slots[slot as usize];
        if evicted.in_use {
            state.map.remove(&evicted.coord);
            trace!(?coord, victim = ?evicted.coord, slot, "recycled tile slot");
        }
        state.slots[slot as usize] = Slot {
            coord,
            last_used: now,
            in_use: true,
        };
        state.map.insert(coord, slot);
        Ok(slot)
    }

    /// Occupancy and hit counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().expect("cache state poisoned");
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            used_slots: state.map.len() as u32,
            total_slots: self.capacity,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
