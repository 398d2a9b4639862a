//! Render device seam: the surface the tile cache uploads through.
//!
//! The cache never talks to a graphics API directly; it drives a
//! [`RenderDevice`] that owns one texture-atlas-style pool of fixed-size
//! tile slots. A real backend maps `allocate` to texture array creation and
//! `upload_tile` to a subresource copy. [`MemoryDevice`] is the software
//! backend used by tests and headless callers.

use std::sync::Mutex;

use bytes::Bytes;

use crate::error::UploadError;
use crate::TILE_BYTES;

// =============================================================================
// Render Device
// =============================================================================

/// A device that holds decoded tiles in fixed-size slots.
pub trait RenderDevice: Send + Sync {
    /// Reserve a pool of `slots` tile slots, returning how many were
    /// actually granted. Devices may grant fewer than requested; granting
    /// zero makes the cache unusable and surfaces as
    /// [`UploadError::NoSlots`] at construction.
    fn allocate(&self, slots: u32) -> Result<u32, UploadError>;

    /// Copy one tile's pixels into `slot`.
    ///
    /// `pixels` is always exactly [`TILE_BYTES`] long and `slot` is always
    /// below the granted pool size; implementations may still re-check and
    /// fail with [`UploadError`] on device loss or transfer errors.
    fn upload_tile(&self, slot: u32, pixels: &[u8]) -> Result<(), UploadError>;
}

// Callers that keep their own handle to the device can hand the cache a
// shared one.
impl<D: RenderDevice + ?Sized> RenderDevice for std::sync::Arc<D> {
    fn allocate(&self, slots: u32) -> Result<u32, UploadError> {
        (**self).allocate(slots)
    }

    fn upload_tile(&self, slot: u32, pixels: &[u8]) -> Result<(), UploadError> {
        (**self).upload_tile(slot, pixels)
    }
}

// =============================================================================
// Memory Device
// =============================================================================

/// Software [`RenderDevice`] backed by host memory.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    slots: Mutex<Vec<Option<Bytes>>>,
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixels currently held in `slot`, if any upload landed there.
    pub fn slot_pixels(&self, slot: u32) -> Option<Bytes> {
        let slots = self.slots.lock().expect("device pool poisoned");
        slots.get(slot as usize).and_then(|s| s.clone())
    }

    /// Number of slots that have received at least one upload.
    pub fn uploaded_count(&self) -> usize {
        let slots = self.slots.lock().expect("device pool poisoned");
        slots.iter().filter(|s| s.is_some()).count()
    }
}

impl RenderDevice for MemoryDevice {
    fn allocate(&self, slots: u32) -> Result<u32, UploadError> {
        let mut pool = self.slots.lock().expect("device pool poisoned");
        *pool = vec![None; slots as usize];
        Ok(slots)
    }

    fn upload_tile(&self, slot: u32, pixels: &[u8]) -> Result<(), UploadError> {
        if pixels.len() != TILE_BYTES {
            return Err(UploadError::BadTileSize {
                expected: TILE_BYTES,
                actual: pixels.len(),
            });
        }
        let mut pool = self.slots.lock().expect("device pool poisoned");
        let capacity = pool.len() as u32;
        match pool.get_mut(slot as usize) {
            Some(entry) => {
                *entry = Some(Bytes::copy_from_slice(pixels));
                Ok(())
            }
            None => Err(UploadError::SlotOutOfRange { slot, capacity }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
