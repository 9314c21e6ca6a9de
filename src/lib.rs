//! # slippymap
//!
//! A tile-based slippy map engine: spherical Mercator coordinate transforms,
//! a pan/zoom/drag viewport state machine, a coalescing tile loader with an
//! LRU cache, and a compositor that stitches tiles into a raster for any
//! output size and device scale.
//!
//! The engine has no widget of its own. A host shell forwards input to
//! [`Map`], listens for redraw notifications and displays the raster that
//! [`Map::draw`] produces.

pub mod core;
pub mod prelude;
pub mod rendering;
pub mod tiles;
pub use crate::core::constants;

use std::time::Duration;

// Re-export public API
pub use crate::core::{
    builder::MapBuilder,
    config::{AttributionOptions, MapOptions},
    geo::{LatLng, TileCoord},
    map::{Map, RedrawRequest},
    viewport::Viewport,
};

pub use tiles::{
    cache::{CacheStats, TileCache, TileImage},
    loader::{TileLoader, TileLoaderConfig},
    source::{TileSource, UrlTemplate},
    transport::{HttpTransport, ReqwestTransport},
};

pub use rendering::{
    compositor::{Compositor, DrawReport, Raster, VisibleTile},
    resample::{ResampleFilter, Resampler},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid tile URL template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Why a single tile could not be resolved.
///
/// Cloneable so one failed download can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TileError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("could not decode tile: {0}")]
    Decode(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("tile {0} is outside the world")]
    OutOfRange(TileCoord),

    #[error("fetch task failed: {0}")]
    Task(String),
}

/// Error type alias for convenience
pub type Error = MapError;
