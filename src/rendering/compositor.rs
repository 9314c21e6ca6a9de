//! Stitches resolved tiles into a single raster for the current viewport.

use super::resample::{ResampleFilter, Resampler};
use crate::core::constants::MAX_DEVICE_SCALE;
use crate::core::geo::{tile_count, TileCoord};
use crate::core::viewport::Viewport;
use crate::tiles::cache::TileImage;
use crate::tiles::loader::TileLoader;
use crate::TileError;
use futures::stream::{FuturesUnordered, StreamExt};
use image::{imageops, RgbaImage};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// The output buffer handed to the shell.
pub type Raster = RgbaImage;

/// Scaled copies kept around so repeated frames don't resample again.
const SCALED_TILE_CAPACITY: usize = 256;

/// The position and size of a specific tile on the output raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleTile {
    pub coord: TileCoord,
    pub x: i64,
    pub y: i64,
    pub size: u32,
}

/// Outcome of one draw pass.
#[derive(Debug, Default)]
pub struct DrawReport {
    /// Tiles whose footprint overlaps the output
    pub planned: usize,
    pub painted: usize,
    /// Tiles left blank this frame, with the reason
    pub failures: Vec<(TileCoord, TileError)>,
}

impl DrawReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.painted == self.planned
    }
}

/// Device scales below one or not finite are drawn at one; tiles are only
/// scaled up, and never past [`MAX_DEVICE_SCALE`].
pub fn effective_scale(device_scale: f32) -> f32 {
    if device_scale.is_finite() && device_scale > 1.0 {
        device_scale.min(MAX_DEVICE_SCALE)
    } else {
        1.0
    }
}

/// Works out which tiles cover a `width` x `height` output and where each goes.
///
/// The center tile is anchored so the world center sits mid-output (at zoom 0
/// the single tile is itself centered), then shifted by the sub-tile offset.
/// Indices beyond the world edges are dropped; there is no wraparound.
pub fn plan_visible_tiles(
    viewport: &Viewport,
    width: u32,
    height: u32,
    device_scale: f32,
) -> Vec<VisibleTile> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let scale = effective_scale(device_scale);
    let tile_size = ((viewport.tile_size() as f32 * scale).round() as i64).max(1);
    let (w, h) = (width as i64, height as i64);
    let zoom = viewport.zoom();

    let mut mid_x = (w - tile_size * 2) / 2;
    let mut mid_y = (h - tile_size * 2) / 2;
    if zoom == 0 {
        mid_x += tile_size / 2;
        mid_y += tile_size / 2;
    }
    let (offset_x, offset_y) = viewport.offset();
    mid_x -= (offset_x as f32 * scale).round() as i64;
    mid_y -= (offset_y as f32 * scale).round() as i64;

    let (center_x, center_y) = viewport.center_tile();
    let first_x = center_x - (mid_x as f64 / tile_size as f64).ceil() as i64;
    let first_y = center_y - (mid_y as f64 / tile_size as f64).ceil() as i64;
    let count = tile_count(zoom) as i64;

    let mut tiles = Vec::new();
    let mut x = first_x;
    while (x - first_x) * tile_size <= w + tile_size {
        let mut y = first_y;
        while (y - first_y) * tile_size <= h + tile_size {
            let left = mid_x + (x - center_x) * tile_size;
            let top = mid_y + (y - center_y) * tile_size;
            let overlaps = left < w && top < h && left + tile_size > 0 && top + tile_size > 0;
            let on_map = (0..count).contains(&x) && (0..count).contains(&y);
            if overlaps && on_map {
                if let Some(coord) = TileCoord::checked(x, y, zoom) {
                    tiles.push(VisibleTile {
                        coord,
                        x: left,
                        y: top,
                        size: tile_size as u32,
                    });
                }
            }
            y += 1;
        }
        x += 1;
    }

    log::debug!(
        "planned {} tiles at zoom {} for {}x{} @{}",
        tiles.len(),
        zoom,
        width,
        height,
        scale
    );
    tiles
}

/// Draws viewport states into a reusable raster.
pub struct Compositor {
    loader: TileLoader,
    resampler: Box<dyn Resampler>,
    raster: Raster,
    scaled: LruCache<(TileCoord, u32), TileImage>,
}

impl Compositor {
    pub fn new(loader: TileLoader) -> Self {
        Self::with_resampler(loader, Box::new(ResampleFilter::default()))
    }

    pub fn with_resampler(loader: TileLoader, resampler: Box<dyn Resampler>) -> Self {
        let capacity = NonZeroUsize::new(SCALED_TILE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            loader,
            resampler,
            raster: RgbaImage::new(0, 0),
            scaled: LruCache::new(capacity),
        }
    }

    pub fn set_resampler(&mut self, resampler: Box<dyn Resampler>) {
        self.resampler = resampler;
        self.scaled.clear();
    }

    pub fn loader(&self) -> &TileLoader {
        &self.loader
    }

    /// The most recently drawn frame.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Draws `viewport` into the raster at `width` x `height` physical pixels.
    ///
    /// All tiles are resolved concurrently and painted as each arrives. A tile
    /// that fails is reported in the returned [`DrawReport`] and its area is
    /// left as it was. The raster is reused when the size is unchanged.
    pub async fn draw(
        &mut self,
        viewport: &Viewport,
        width: u32,
        height: u32,
        device_scale: f32,
    ) -> DrawReport {
        if self.raster.dimensions() != (width, height) {
            self.raster = RgbaImage::new(width, height);
        }

        let plan = plan_visible_tiles(viewport, width, height, device_scale);
        let mut report = DrawReport {
            planned: plan.len(),
            ..DrawReport::default()
        };

        let mut pending: FuturesUnordered<_> = plan
            .into_iter()
            .map(|tile| {
                let loader = self.loader.clone();
                async move { (tile, loader.resolve(tile.coord).await) }
            })
            .collect();

        while let Some((tile, result)) = pending.next().await {
            match result {
                Ok(image) => {
                    let image = self.scale_tile(tile.coord, image, tile.size);
                    imageops::replace(&mut self.raster, &*image, tile.x, tile.y);
                    report.painted += 1;
                }
                Err(e) => {
                    log::warn!("leaving tile {} blank: {}", tile.coord, e);
                    report.failures.push((tile.coord, e));
                }
            }
        }
        report
    }

    fn scale_tile(&mut self, coord: TileCoord, image: TileImage, size: u32) -> TileImage {
        if image.dimensions() == (size, size) {
            return image;
        }
        let key = (coord, size);
        if let Some(scaled) = self.scaled.get(&key) {
            return Arc::clone(scaled);
        }
        let scaled = Arc::new(self.resampler.resample(&image, size));
        self.scaled.put(key, Arc::clone(&scaled));
        scaled
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("loader", &self.loader)
            .field("raster", &self.raster.dimensions())
            .field("scaled_tiles", &self.scaled.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(plan: &[VisibleTile]) -> Vec<(u32, u32)> {
        plan.iter().map(|t| (t.coord.x, t.coord.y)).collect()
    }

    #[test]
    fn test_zoom_zero_centers_single_tile() {
        let viewport = Viewport::default();
        let plan = plan_visible_tiles(&viewport, 256, 256, 1.0);
        assert_eq!(
            plan,
            vec![VisibleTile {
                coord: TileCoord::new(0, 0, 0),
                x: 0,
                y: 0,
                size: 256
            }]
        );

        let wide = plan_visible_tiles(&viewport, 800, 600, 1.0);
        assert_eq!(wide.len(), 1);
        assert_eq!((wide[0].x, wide[0].y), (272, 172));
    }

    #[test]
    fn test_world_center_sits_mid_output() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(2);
        let plan = plan_visible_tiles(&viewport, 512, 512, 1.0);
        assert_eq!(coords(&plan), vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
        let positions: Vec<_> = plan.iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(positions, vec![(0, 0), (0, 256), (256, 0), (256, 256)]);
    }

    #[test]
    fn test_offset_shifts_tiles_and_adds_partial_edges() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(3);
        viewport.pan_east();
        viewport.pan_east();
        viewport.pan_south();
        viewport.pan_south();
        let plan = plan_visible_tiles(&viewport, 512, 512, 1.0);
        assert_eq!(plan.len(), 9);
        let first = plan.iter().find(|t| t.coord == TileCoord::new(3, 3, 3)).unwrap();
        assert_eq!((first.x, first.y), (-128, -128));
        let last = plan.iter().find(|t| t.coord == TileCoord::new(5, 5, 3)).unwrap();
        assert_eq!((last.x, last.y), (384, 384));
    }

    #[test]
    fn test_never_plans_tiles_off_the_map() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(1);
        for _ in 0..12 {
            viewport.pan_west();
            viewport.pan_north();
        }
        for (w, h) in [(300, 200), (1024, 768), (2000, 2000)] {
            for tile in plan_visible_tiles(&viewport, w, h, 1.0) {
                assert!(tile.coord.is_valid(), "{:?}", tile);
            }
        }
        for _ in 0..40 {
            viewport.pan_west();
        }
        assert!(plan_visible_tiles(&viewport, 1024, 768, 1.0).is_empty());
    }

    #[test]
    fn test_device_scale_enlarges_tiles() {
        let viewport = Viewport::default();
        let plan = plan_visible_tiles(&viewport, 512, 512, 2.0);
        assert_eq!(plan.len(), 1);
        assert_eq!((plan[0].x, plan[0].y, plan[0].size), (0, 0, 512));

        assert_eq!(effective_scale(0.5), 1.0);
        assert_eq!(effective_scale(f32::NAN), 1.0);
    }

    #[test]
    fn test_huge_device_scale_is_capped() {
        assert_eq!(effective_scale(4.0), 4.0);
        assert_eq!(effective_scale(1.0e20), 4.0);
        assert_eq!(effective_scale(f32::MAX), 4.0);

        let plan = plan_visible_tiles(&Viewport::default(), 800, 600, 1.0e20);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].size, 1024);
    }

    #[test]
    fn test_empty_output_plans_nothing() {
        assert!(plan_visible_tiles(&Viewport::default(), 0, 100, 1.0).is_empty());
    }
}
