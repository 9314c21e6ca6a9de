//! Map builder for fluent API configuration
//!
//! Collects options, an optional transport and the initial view, then wires
//! up the tile source, cache, loader and compositor behind a [`Map`].

use crate::{
    core::{config::MapOptions, geo::LatLng, map::Map, viewport::Viewport},
    rendering::{compositor::Compositor, resample::Resampler},
    tiles::{
        cache::TileCache,
        loader::TileLoader,
        source::TileSource,
        transport::{HttpTransport, ReqwestTransport},
    },
    Result,
};
use std::sync::Arc;

/// Builder for creating and configuring Map instances
#[derive(Default)]
pub struct MapBuilder {
    options: MapOptions,
    /// Overrides the template in `options.tile_source`
    tile_source: Option<Arc<dyn TileSource>>,
    transport: Option<Arc<dyn HttpTransport>>,
    resampler: Option<Box<dyn Resampler>>,
    zoom: u8,
    center: Option<LatLng>,
}

impl MapBuilder {
    /// Create a new MapBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set map options
    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a custom tile source instead of a URL template
    pub fn with_tile_source(mut self, source: Arc<dyn TileSource>) -> Self {
        self.tile_source = Some(source);
        self
    }

    /// Download tiles through `transport` instead of the built-in reqwest client
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Scale tiles for high-density output with a custom strategy
    pub fn with_resampler(mut self, resampler: Box<dyn Resampler>) -> Self {
        self.resampler = Some(resampler);
        self
    }

    /// Set the initial zoom level; out-of-range values leave the map at zoom 0
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Set the initial center, applied after the zoom
    pub fn with_center(mut self, center: LatLng) -> Self {
        self.center = Some(center);
        self
    }

    /// Set the initial center and zoom level
    pub fn with_center_and_zoom(self, center: LatLng, zoom: u8) -> Self {
        self.with_zoom(zoom).with_center(center)
    }

    /// Build the map with the configured options
    pub fn build(self) -> Result<Map> {
        let options = self.options;
        options.check_tile_size()?;

        let source: Arc<dyn TileSource> = match self.tile_source {
            Some(source) => source,
            None => Arc::new(options.url_template()?),
        };
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_settings(
                &options.user_agent,
                options.fetch_timeout(),
            )?),
        };
        let resampler: Box<dyn Resampler> = match self.resampler {
            Some(resampler) => resampler,
            None => Box::new(options.resample),
        };

        let loader = TileLoader::new(
            source,
            transport,
            TileCache::new(options.cache_capacity),
            options.loader_config(),
        );
        let compositor = Compositor::with_resampler(loader, resampler);

        let mut viewport = Viewport::new(options.tile_size);
        viewport.set_zoom(self.zoom as i32);
        if let Some(center) = self.center {
            viewport.center_on(center.lat, center.lng);
        }

        log::debug!(
            "built map at zoom {} origin {:?} from {}",
            viewport.zoom(),
            viewport.origin(),
            options.tile_source
        );
        Ok(Map::from_parts(options, viewport, compositor))
    }
}

/// Convenience methods for common map configurations
impl MapBuilder {
    /// An OpenStreetMap-backed map centered on `center`
    pub fn osm_map(center: LatLng, zoom: u8) -> Self {
        Self::new()
            .with_options(MapOptions::default().with_osm_tiles())
            .with_center_and_zoom(center, zoom)
    }

    /// A map with every shell control hidden
    pub fn minimal_map(center: LatLng, zoom: u8) -> Self {
        Self::new()
            .with_options(
                MapOptions::default()
                    .with_zoom_buttons(false)
                    .with_scroll_buttons(false),
            )
            .with_center_and_zoom(center, zoom)
    }
}
