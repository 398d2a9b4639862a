//! Configuration for the viewer core.
//!
//! The viewer is a library; configuration is plain data with sensible
//! defaults rather than a CLI surface. Host applications typically
//! deserialize a [`CacheConfig`] from their own settings file and hand it to
//! [`crate::session::ViewerSession`].
//!
//! # Example
//!
//! ```
//! use gigaview::config::CacheConfig;
//!
//! let config = CacheConfig::default();
//! assert!(config.validate().is_ok());
//!
//! // Slot count follows from the GPU pool size: bytes / (256 * 256 * 4).
//! assert_eq!(CacheConfig { gpu_pool_mb: 512, ..config }.slot_count(), 2048);
//! ```

use serde::{Deserialize, Serialize};

use crate::TILE_BYTES;

// =============================================================================
// Default Values
// =============================================================================

/// Default GPU tile pool size in megabytes.
pub const DEFAULT_GPU_POOL_MB: u32 = 512;

/// Minimum accepted GPU pool size; smaller requests are clamped up.
pub const MIN_GPU_POOL_MB: u32 = 512;

/// Maximum accepted GPU pool size; larger requests are clamped down.
pub const MAX_GPU_POOL_MB: u32 = 2048;

/// Default cap on host-memory decoded tiles (4096 tiles ~= 1 GiB).
pub const DEFAULT_HOST_TILE_CAP: usize = 4096;

// =============================================================================
// Cache Configuration
// =============================================================================

/// Sizing for the GPU slot pool and the host-memory tile table.
///
/// `gpu_pool_mb` is clamped to `[512, 2048]` MB before the slot count is
/// derived, matching the bounds the render device can realistically back
/// with a single array texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// GPU tile pool size in megabytes.
    pub gpu_pool_mb: u32,

    /// Maximum number of decoded tiles retained in host memory.
    ///
    /// Host retention is an LRU over tile coordinates; decoded pixels for
    /// evicted tiles are re-decoded on demand.
    pub host_tile_cap: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            gpu_pool_mb: DEFAULT_GPU_POOL_MB,
            host_tile_cap: DEFAULT_HOST_TILE_CAP,
        }
    }
}

impl CacheConfig {
    /// Validate the configuration.
    ///
    /// Returns a human-readable message for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.host_tile_cap == 0 {
            return Err("host_tile_cap must be at least 1".to_string());
        }
        if self.gpu_pool_mb == 0 {
            return Err("gpu_pool_mb must be at least 1".to_string());
        }
        Ok(())
    }

    /// GPU pool size clamped to the supported range.
    pub fn clamped_pool_mb(&self) -> u32 {
        self.gpu_pool_mb.clamp(MIN_GPU_POOL_MB, MAX_GPU_POOL_MB)
    }

    /// Number of GPU slots the clamped pool size can hold.
    pub fn slot_count(&self) -> u32 {
        let pool_bytes = self.clamped_pool_mb() as u64 * 1024 * 1024;
        let slots = (pool_bytes / TILE_BYTES as u64) as u32;
        slots.max(1)
    }
}

// =============================================================================
// Tests
// =============================================================================
