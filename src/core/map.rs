use crate::{
    core::{
        builder::MapBuilder, config::MapOptions, constants::MIN_VIEW_SIZE, viewport::Viewport,
    },
    rendering::compositor::{Compositor, DrawReport, Raster},
    tiles::{cache::CacheStats, loader::TileLoader},
    Result,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::path::Path;

/// Sent to the shell after every operation that changed the view.
///
/// Carries the state that should be drawn. At most one request is queued:
/// a change made before the shell picks it up replaces it with the newer
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawRequest {
    pub zoom: u8,
    pub origin: (i32, i32),
    pub offset: (i32, i32),
}

impl RedrawRequest {
    fn from_viewport(viewport: &Viewport) -> Self {
        Self {
            zoom: viewport.zoom(),
            origin: viewport.origin(),
            offset: viewport.offset(),
        }
    }
}

/// The map engine a shell talks to.
///
/// Input operations mutate the owned [`Viewport`] and, when they change it,
/// push a [`RedrawRequest`] onto the redraw channel. [`Map::draw`] renders
/// the current view into the reusable raster. Like the viewport, a map is
/// driven from one thread; only tile downloads run elsewhere.
pub struct Map {
    viewport: Viewport,
    options: MapOptions,
    compositor: Compositor,
    redraw_tx: Sender<RedrawRequest>,
    redraw_rx: Receiver<RedrawRequest>,
}

impl Map {
    /// Build a map from `options` with the default HTTP transport.
    pub fn new(options: MapOptions) -> Result<Self> {
        MapBuilder::new().with_options(options).build()
    }

    pub(crate) fn from_parts(options: MapOptions, viewport: Viewport, compositor: Compositor) -> Self {
        let (redraw_tx, redraw_rx) = crossbeam_channel::bounded(1);
        Self {
            viewport,
            options,
            compositor,
            redraw_tx,
            redraw_rx,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Smallest size, in logical pixels, the shell should give the map.
    pub fn min_size(&self) -> (u32, u32) {
        MIN_VIEW_SIZE
    }

    /// Receiver for redraw notifications. All clones share one single-slot queue.
    pub fn redraw_events(&self) -> Receiver<RedrawRequest> {
        self.redraw_rx.clone()
    }

    pub fn loader(&self) -> &TileLoader {
        self.compositor.loader()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.compositor.loader().cache().stats()
    }

    /// Zoom straight to level `target`. Out-of-range targets are ignored.
    pub fn zoom(&mut self, target: i32) {
        let changed = self.viewport.set_zoom(target);
        self.request_redraw_if(changed);
    }

    pub fn zoom_in(&mut self) {
        let changed = self.viewport.zoom_in();
        self.request_redraw_if(changed);
    }

    pub fn zoom_out(&mut self) {
        let changed = self.viewport.zoom_out();
        self.request_redraw_if(changed);
    }

    pub fn pan_east(&mut self) {
        self.viewport.pan_east();
        self.request_redraw();
    }

    pub fn pan_west(&mut self) {
        self.viewport.pan_west();
        self.request_redraw();
    }

    pub fn pan_north(&mut self) {
        self.viewport.pan_north();
        self.request_redraw();
    }

    pub fn pan_south(&mut self) {
        self.viewport.pan_south();
        self.request_redraw();
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.viewport.begin_drag(x, y);
    }

    pub fn continue_drag(&mut self, x: f32, y: f32) {
        let before = self.viewport.clone();
        self.viewport.continue_drag(x, y);
        self.request_redraw_if(self.viewport != before);
    }

    pub fn end_drag(&mut self) {
        self.viewport.end_drag();
    }

    /// Pan until the tile containing (`lat`, `lng`) is centered.
    pub fn center_on(&mut self, lat: f64, lng: f64) {
        let changed = self.viewport.center_on(lat, lng);
        self.request_redraw_if(changed);
    }

    /// Render the current view at `width` x `height` physical pixels.
    ///
    /// Missing tiles are downloaded concurrently. Tiles that fail are left
    /// blank and listed in the report; the draw itself never fails.
    pub async fn draw(&mut self, width: u32, height: u32, device_scale: f32) -> DrawReport {
        self.compositor
            .draw(&self.viewport, width, height, device_scale)
            .await
    }

    /// The last frame produced by [`Map::draw`].
    pub fn raster(&self) -> &Raster {
        self.compositor.raster()
    }

    /// Write the last frame to `path`, format chosen by its extension.
    pub fn save_raster<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.raster().save(path)?;
        Ok(())
    }

    fn request_redraw_if(&self, changed: bool) {
        if changed {
            self.request_redraw();
        }
    }

    fn request_redraw(&self) {
        let request = RedrawRequest::from_viewport(&self.viewport);
        log::trace!("redraw requested: {:?}", request);
        let mut pending = request;
        // Disconnection cannot happen while `self` holds the receiver.
        while let Err(TrySendError::Full(rejected)) = self.redraw_tx.try_send(pending) {
            // Unread request is stale; swap it for the current state.
            let _ = self.redraw_rx.try_recv();
            pending = rejected;
        }
    }
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("viewport", &self.viewport)
            .field("options", &self.options)
            .field("compositor", &self.compositor)
            .field("pending_redraws", &self.redraw_rx.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::tiles::transport::HttpTransport;
    use crate::TileError;
    use std::sync::Arc;

    fn map() -> Map {
        MapBuilder::new().build().unwrap()
    }

    fn drain(rx: &Receiver<RedrawRequest>) -> Vec<RedrawRequest> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_every_change_requests_one_redraw() {
        let mut map = map();
        let rx = map.redraw_events();

        map.zoom_in();
        map.pan_east();
        map.pan_south();
        map.zoom(5);
        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], RedrawRequest::from_viewport(map.viewport()));

        map.zoom_in();
        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].zoom, 6);
        assert_eq!(events[0].offset, map.viewport().offset());
    }

    #[test]
    fn test_unread_redraws_coalesce() {
        let mut map = map();
        let rx = map.redraw_events();
        map.zoom(10);

        for _ in 0..10_000 {
            map.pan_east();
            map.pan_south();
            assert!(rx.len() <= 1);
        }
        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].origin, map.viewport().origin());
        assert_eq!(events[0].origin, (2500, 2500));
    }

    #[test]
    fn test_no_op_operations_stay_quiet() {
        let mut map = map();
        let rx = map.redraw_events();

        map.zoom_out();
        map.zoom(0);
        map.zoom(20);
        map.zoom(-1);
        map.continue_drag(10.0, 10.0);
        map.center_on(f64::NAN, 0.0);
        map.center_on(0.0, 0.0);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_drag_lifecycle_through_map() {
        let mut map = map();
        let rx = map.redraw_events();

        map.begin_drag(100.0, 100.0);
        assert!(drain(&rx).is_empty());
        map.continue_drag(100.0, 100.0);
        assert!(drain(&rx).is_empty());
        map.continue_drag(40.0, 100.0);
        assert_eq!(drain(&rx).len(), 1);
        assert_eq!(map.viewport().offset(), (60, 0));
        map.end_drag();
        assert!(!map.viewport().is_dragging());
    }

    #[test]
    fn test_center_on_reports_target() {
        let mut map = MapBuilder::new().with_zoom(12).build().unwrap();
        let rx = map.redraw_events();
        let target = LatLng::new(35.83, 10.64);

        map.center_on(target.lat, target.lng);
        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert_eq!(map.viewport().center_tile(), (2169, 1610));
    }

    struct Offline;

    #[async_trait::async_trait]
    impl HttpTransport for Offline {
        async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TileError> {
            Err(TileError::Network(format!("offline: {}", url)))
        }
    }

    #[tokio::test]
    async fn test_save_raster_writes_last_frame() {
        let mut map = MapBuilder::new()
            .with_transport(Arc::new(Offline))
            .build()
            .unwrap();
        let report = map.draw(96, 64, 1.0).await;
        assert_eq!(report.failures.len(), 1);

        let path = std::env::temp_dir().join(format!("slippymap-frame-{}.png", std::process::id()));
        map.save_raster(&path).unwrap();
        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (96, 64));
        assert_eq!(&saved, map.raster());
        std::fs::remove_file(&path).unwrap();

        let err = map.save_raster(path.with_extension("nope")).unwrap_err();
        assert!(matches!(err, crate::MapError::Image(_)));
    }

    #[test]
    fn test_min_size_and_options() {
        let map = map();
        assert_eq!(map.min_size(), (64, 64));
        assert_eq!(map.options(), &MapOptions::default());
        assert_eq!(map.cache_stats(), CacheStats::default());
    }
}
