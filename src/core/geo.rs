use crate::core::constants::{MAX_LATITUDE, MAX_ZOOM};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Whether the point can be projected with spherical Mercator.
    pub fn is_projectable(&self) -> bool {
        self.is_valid() && self.lat.abs() <= MAX_LATITUDE
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a tile coordinate in the slippy map tile system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Builds a coordinate from signed indices, rejecting anything off the map.
    pub fn checked(x: i64, y: i64, z: u8) -> Option<Self> {
        if z > MAX_ZOOM {
            return None;
        }
        let count = tile_count(z) as i64;
        if x < 0 || y < 0 || x >= count || y >= count {
            return None;
        }
        Some(Self::new(x as u32, y as u32, z))
    }

    /// Creates a tile coordinate from a LatLng and zoom level.
    ///
    /// Returns `None` for coordinates outside the projectable range or an
    /// unsupported zoom.
    pub fn from_lat_lng(lat_lng: &LatLng, zoom: u8) -> Option<Self> {
        let (x, y) = lat_lng_to_tile(lat_lng.lat, lat_lng.lng, zoom)?;
        Self::checked(x, y, zoom)
    }

    /// Converts tile coordinate to LatLng (northwest corner)
    pub fn to_lat_lng(&self) -> LatLng {
        tile_to_lat_lng(self.x as f64, self.y as f64, self.z)
    }

    /// Geographic center of the tile
    pub fn center(&self) -> LatLng {
        tile_to_lat_lng(self.x as f64 + 0.5, self.y as f64 + 0.5, self.z)
    }

    /// Checks if the tile is valid for the given zoom level
    pub fn is_valid(&self) -> bool {
        self.z <= MAX_ZOOM && self.x < tile_count(self.z) && self.y < tile_count(self.z)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Number of tiles along one axis at `zoom`.
pub fn tile_count(zoom: u8) -> u32 {
    1u32 << zoom.min(31)
}

/// Index of the tile the world is centered on at `zoom`, i.e. `floor(count / 2 - 0.5)`.
///
/// Viewport origins are stored relative to this tile.
pub fn center_tile_index(zoom: u8) -> i32 {
    (tile_count(zoom) as f64 / 2.0 - 0.5).floor() as i32
}

/// Spherical Mercator slippy-map projection from degrees to tile indices.
///
/// Points on the antimeridian (`lng == 180`) land on the last column. Returns
/// `None` for non-finite input, latitudes beyond the Mercator limit or zoom
/// levels above the maximum.
pub fn lat_lng_to_tile(lat: f64, lng: f64, zoom: u8) -> Option<(i64, i64)> {
    let point = LatLng::new(lat, lng);
    if zoom > MAX_ZOOM || !lat.is_finite() || !lng.is_finite() || !point.is_projectable() {
        return None;
    }

    let n = tile_count(zoom) as f64;
    let lat_rad = lat.to_radians();
    let x = ((lng + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    let max = n as i64 - 1;
    Some(((x as i64).clamp(0, max), (y as i64).clamp(0, max)))
}

/// Inverse projection of fractional tile indices back to degrees.
pub fn tile_to_lat_lng(x: f64, y: f64, zoom: u8) -> LatLng {
    let n = tile_count(zoom) as f64;
    let lng = x / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    LatLng::new(lat_rad.to_degrees(), lng)
}
