//! # gigaview
//!
//! Viewer core for gigapixel images: a multi-resolution tile pyramid, an
//! on-demand windowed tile loader, and a fixed-capacity device-resident
//! tile cache with LRU eviction.
//!
//! Images far larger than GPU texture limits (or RAM) are decomposed into
//! fixed 256x256 RGBA tiles across halving resolution levels. Per frame the
//! viewer maps the viewport, zoom, and pan to the minimal covering tile set
//! at the closest level of detail, decodes only those tiles' source
//! footprints, and streams them into a bounded slot pool on the render
//! device. Tiles that have not arrived yet are drawn from their nearest
//! resident coarser ancestor, so interaction never waits on decoding.
//!
//! ## Architecture
//!
//! ```text
//! ViewerSession
//!   |- ImagePyramid      level structure + host-memory tile table
//!   |- TileLoader        windowed decode via RegionDecoder / TileSource
//!   `- GpuTileCache      fixed slot pool on a RenderDevice, LRU eviction
//! ```
//!
//! The graphics backend and the image codec both sit behind traits
//! ([`RenderDevice`], [`decode::RegionDecoder`]); the crate ships in-memory
//! implementations of each ([`MemoryDevice`], [`decode::MemoryDecoder`])
//! plus an `image`-crate file adapter ([`decode::StandardDecoder`]).
//!
//! ## Example
//!
//! ```
//! use gigaview::config::CacheConfig;
//! use gigaview::decode::{MemoryDecoder, MemorySource};
//! use gigaview::{MemoryDevice, ViewerSession, ViewQuery};
//!
//! let source = MemorySource::new().with(
//!     "gradient",
//!     MemoryDecoder::from_fn(600, 500, |x, y| [x as u8, y as u8, 0, 255]),
//! );
//! let mut session = ViewerSession::new(
//!     600,
//!     500,
//!     "gradient",
//!     source,
//!     MemoryDevice::new(),
//!     &CacheConfig::default(),
//! )
//! .unwrap();
//!
//! let frame = session.prepare_frame(&ViewQuery::centered(800, 600, 1.0));
//! assert_eq!(frame.loaded, frame.visible.len());
//! ```

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod loader;
pub mod pyramid;
pub mod render;
pub mod session;

pub use cache::{CacheStats, GpuTileCache, MemoryDevice, RenderDevice};
pub use config::CacheConfig;
pub use error::{DecodeError, LoadError, PyramidError, SessionError, TransformError, UploadError};
pub use loader::TileLoader;
pub use pyramid::{ImagePyramid, PyramidLevel, TileCoordinate, ViewQuery};
pub use render::{resolve_fallback, tile_placement, TileRect, TransformPipeline};
pub use session::{FrameSet, TileDraw, ViewerSession};

/// Tile edge length in pixels, uniform across every level.
pub const TILE_SIZE: u32 = 256;

/// Bytes per pixel (RGBA, 8 bits per channel).
pub const BYTES_PER_PIXEL: usize = 4;

/// Size of one decoded tile buffer in bytes.
pub const TILE_BYTES: usize = TILE_SIZE as usize * TILE_SIZE as usize * BYTES_PER_PIXEL;
