//! Prelude module for common slippymap types and traits
//!
//! `use slippymap::prelude::*;` brings in everything a host shell usually needs.

pub use crate::core::{
    builder::MapBuilder,
    config::{AttributionOptions, MapOptions},
    geo::{LatLng, TileCoord},
    map::{Map, RedrawRequest},
    viewport::Viewport,
};

pub use crate::tiles::{
    cache::{TileCache, TileImage},
    loader::{TileLoader, TileLoaderConfig},
    source::{TileSource, UrlTemplate},
    transport::{HttpTransport, ReqwestTransport},
};

pub use crate::rendering::{
    compositor::{DrawReport, Raster},
    resample::{ResampleFilter, Resampler},
};

pub use crate::{MapError, Result, TileError};

/// Fast hasher for small integer keys such as tile coordinates.
pub type HashMap<K, V> = fxhash::FxHashMap<K, V>;
