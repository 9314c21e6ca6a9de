//! Map configuration
//!
//! [`MapOptions`] holds everything about a map that is plain data: the tile
//! source, attribution, which controls the shell should show and the tuning
//! knobs of the tile pipeline. It can be built in code with the `with_*`
//! constructors or loaded from JSON.

use crate::core::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_CONCURRENT_FETCHES,
    DEFAULT_USER_AGENT, MAX_TILE_SIZE, OSM_ATTRIBUTION_LABEL, OSM_ATTRIBUTION_URL, OSM_TILE_URL,
    PAN_STEPS_PER_TILE, TILE_SIZE,
};
use crate::rendering::resample::ResampleFilter;
use crate::tiles::loader::TileLoaderConfig;
use crate::tiles::source::UrlTemplate;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Attribution text and link the shell displays for the tile source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionOptions {
    pub enabled: bool,
    pub label: String,
    pub url: String,
}

impl Default for AttributionOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            label: OSM_ATTRIBUTION_LABEL.to_string(),
            url: OSM_ATTRIBUTION_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// URL template with zoom, x and y placeholders
    pub tile_source: String,
    pub attribution: AttributionOptions,
    pub show_zoom_controls: bool,
    pub show_pan_controls: bool,
    /// Nominal edge length of a tile in logical pixels
    pub tile_size: u32,
    /// Decoded tiles kept in memory
    pub cache_capacity: usize,
    pub max_concurrent_fetches: usize,
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
    pub resample: ResampleFilter,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            tile_source: OSM_TILE_URL.to_string(),
            attribution: AttributionOptions::default(),
            show_zoom_controls: true,
            show_pan_controls: true,
            tile_size: TILE_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            resample: ResampleFilter::default(),
        }
    }
}

impl MapOptions {
    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Use the public OpenStreetMap tile server and its attribution.
    pub fn with_osm_tiles(mut self) -> Self {
        self.tile_source = OSM_TILE_URL.to_string();
        self.attribution.label = OSM_ATTRIBUTION_LABEL.to_string();
        self.attribution.url = OSM_ATTRIBUTION_URL.to_string();
        self
    }

    pub fn with_tile_source<S: Into<String>>(mut self, template: S) -> Self {
        self.tile_source = template.into();
        self
    }

    pub fn with_attribution<L: Into<String>, U: Into<String>>(
        mut self,
        enabled: bool,
        label: L,
        url: U,
    ) -> Self {
        self.attribution = AttributionOptions {
            enabled,
            label: label.into(),
            url: url.into(),
        };
        self
    }

    /// Show or hide the zoom in/out buttons.
    pub fn with_zoom_buttons(mut self, show: bool) -> Self {
        self.show_zoom_controls = show;
        self
    }

    /// Show or hide the four pan buttons.
    pub fn with_scroll_buttons(mut self, show: bool) -> Self {
        self.show_pan_controls = show;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_fetch_limits(mut self, max_concurrent: usize, timeout: Duration) -> Self {
        self.max_concurrent_fetches = max_concurrent;
        self.fetch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_resample(mut self, filter: ResampleFilter) -> Self {
        self.resample = filter;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn loader_config(&self) -> TileLoaderConfig {
        TileLoaderConfig {
            max_concurrent: self.max_concurrent_fetches.max(1),
            fetch_timeout: self.fetch_timeout(),
        }
    }

    /// Parse the configured tile source.
    pub fn url_template(&self) -> Result<UrlTemplate> {
        UrlTemplate::new(self.tile_source.as_str())
    }

    /// Reject option sets that could never produce a working map.
    pub fn validate(&self) -> Result<()> {
        self.check_tile_size()?;
        self.url_template().map(|_| ())
    }

    /// Tiles must split into whole pan steps and stay small enough to raster.
    pub fn check_tile_size(&self) -> Result<()> {
        let steps = PAN_STEPS_PER_TILE as u32;
        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE || self.tile_size % steps != 0 {
            return Err(MapError::InvalidOption(format!(
                "tile_size must be a multiple of {} in 1..={}, got {}",
                steps, MAX_TILE_SIZE, self.tile_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_openstreetmap() {
        let options = MapOptions::default();
        assert_eq!(options.tile_source, "https://tile.openstreetmap.org/%d/%d/%d.png");
        assert_eq!(options.attribution.label, "OpenStreetMap");
        assert_eq!(options.attribution.url, "https://openstreetmap.org");
        assert!(options.attribution.enabled);
        assert!(options.show_zoom_controls && options.show_pan_controls);
        assert_eq!(options.cache_capacity, 1024);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_constructors_chain() {
        let options = MapOptions::default()
            .with_tile_source("https://tiles.example.com/{z}/{x}/{y}.png")
            .with_attribution(false, "Example", "https://example.com")
            .with_zoom_buttons(false)
            .with_scroll_buttons(false)
            .with_fetch_limits(2, Duration::from_secs(3));

        assert!(!options.attribution.enabled);
        assert!(!options.show_zoom_controls);
        assert!(!options.show_pan_controls);
        assert_eq!(
            options.loader_config(),
            TileLoaderConfig {
                max_concurrent: 2,
                fetch_timeout: Duration::from_secs(3)
            }
        );

        let back = options.with_osm_tiles();
        assert_eq!(back.tile_source, OSM_TILE_URL);
        assert_eq!(back.attribution.label, OSM_ATTRIBUTION_LABEL);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let options = MapOptions::from_json_str(
            r#"{ "show_pan_controls": false, "resample": "nearest", "attribution": { "label": "Mine" } }"#,
        )
        .unwrap();
        assert!(!options.show_pan_controls);
        assert!(options.show_zoom_controls);
        assert_eq!(options.resample, ResampleFilter::Nearest);
        assert_eq!(options.attribution.label, "Mine");
        assert_eq!(options.attribution.url, OSM_ATTRIBUTION_URL);
        assert_eq!(options.tile_size, 256);
    }

    #[test]
    fn test_json_rejects_bad_template() {
        let err = MapOptions::from_json_str(r#"{ "tile_source": "https://example.com/tile.png" }"#)
            .unwrap_err();
        assert!(matches!(err, MapError::InvalidTemplate(_)));

        let err = MapOptions::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, MapError::Serialization(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let options = MapOptions::default().with_zoom_buttons(false);
        let json = options.to_json_string().unwrap();
        assert_eq!(MapOptions::from_json_str(&json).unwrap(), options);
    }

    #[test]
    fn test_tile_size_must_pan_evenly() {
        for size in [0u64, 250, 4100, 4294967295] {
            let json = format!(r#"{{ "tile_size": {} }}"#, size);
            let err = MapOptions::from_json_str(&json).unwrap_err();
            assert!(matches!(err, MapError::InvalidOption(_)), "tile_size {}", size);
        }
        for size in [4u32, 256, 512, 4096] {
            let options = MapOptions {
                tile_size: size,
                ..MapOptions::default()
            };
            assert!(options.validate().is_ok(), "tile_size {}", size);
        }
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let options = MapOptions::default().with_fetch_limits(1, Duration::MAX);
        assert_eq!(options.fetch_timeout_ms, u64::MAX);
    }
}
