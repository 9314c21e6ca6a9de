//! Engine-wide constants for the slippy map tile scheme.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Largest tile edge the engine accepts.
pub const MAX_TILE_SIZE: u32 = 4096;

/// Highest device scale tiles are upscaled for; denser displays are drawn at this.
pub const MAX_DEVICE_SCALE: f32 = 4.0;

/// Lowest zoom level; the whole world is a single tile.
pub const MIN_ZOOM: u8 = 0;

/// Highest zoom level served by standard OpenStreetMap-style tile servers.
pub const MAX_ZOOM: u8 = 19;

/// Discrete pan calls needed to move the view by one whole tile.
pub const PAN_STEPS_PER_TILE: i32 = 4;

/// Latitude limit of the spherical Mercator projection, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Default tile source (positional placeholders: zoom, x, y).
pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/%d/%d/%d.png";

/// Attribution label shown for the default tile source.
pub const OSM_ATTRIBUTION_LABEL: &str = "OpenStreetMap";

/// Attribution link for the default tile source.
pub const OSM_ATTRIBUTION_URL: &str = "https://openstreetmap.org";

/// Smallest sensible widget size in logical pixels.
pub const MIN_VIEW_SIZE: (u32, u32) = (64, 64);

/// Default number of decoded tiles kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Default cap on simultaneous tile downloads.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// Default per-tile fetch timeout in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// User agent sent with tile requests. Public tile servers reject anonymous clients.
pub const DEFAULT_USER_AGENT: &str = "slippymap/0.1 (+https://github.com/slippymap/slippymap)";
