use crate::core::constants::{MAX_TILE_SIZE, MAX_ZOOM, MIN_ZOOM, PAN_STEPS_PER_TILE, TILE_SIZE};
use crate::core::geo::{center_tile_index, lat_lng_to_tile};
use serde::{Deserialize, Serialize};

/// Origins stay within this many tiles of the world center, far beyond any real map.
const ORIGIN_LIMIT: i64 = 1 << 22;

/// Pointer position and offsets captured when a drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragAnchor {
    start_x: f32,
    start_y: f32,
    offset_x: i64,
    offset_y: i64,
}

/// Manages the current view of the map: zoom, tile origin and sub-tile pixel offset.
///
/// `origin_x`/`origin_y` count whole tiles away from the world's central tile
/// (see [`center_tile_index`]); `offset_x`/`offset_y` pan by single pixels
/// inside a tile. After every mutation the offsets lie strictly inside
/// `(-tile_size, tile_size)`, overflow having been carried into the origin.
///
/// The viewport is owned by the UI thread and is not reentrant: the host is
/// expected to deliver input events one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    zoom: u8,
    origin_x: i32,
    origin_y: i32,
    offset_x: i32,
    offset_y: i32,
    tile_size: i32,
    #[serde(skip)]
    drag: Option<DragAnchor>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(TILE_SIZE)
    }
}

impl Viewport {
    /// Creates a world view at zoom 0 for tiles of `tile_size` pixels.
    ///
    /// The size is clamped to `[4, 4096]` and rounded down to a multiple of
    /// four so that four pans always move exactly one tile.
    pub fn new(tile_size: u32) -> Self {
        let steps = PAN_STEPS_PER_TILE as u32;
        let clamped = tile_size.clamp(steps, MAX_TILE_SIZE);
        let tile_size = i32::try_from(clamped - clamped % steps).unwrap_or(TILE_SIZE as i32);
        Self {
            zoom: MIN_ZOOM,
            origin_x: 0,
            origin_y: 0,
            offset_x: 0,
            offset_y: 0,
            tile_size,
            drag: None,
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size as u32
    }

    /// Absolute index of the tile under the view center.
    pub fn center_tile(&self) -> (i64, i64) {
        let center = center_tile_index(self.zoom) as i64;
        (center + self.origin_x as i64, center + self.origin_y as i64)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Zooms to `target` one level at a time.
    ///
    /// Each step doubles (in) or halves (out) the origin so the tile under the
    /// view center is kept. Targets outside `[0, 19]` are ignored. Returns
    /// whether the state changed.
    pub fn set_zoom(&mut self, target: i32) -> bool {
        if target < MIN_ZOOM as i32 || target > MAX_ZOOM as i32 || target == self.zoom as i32 {
            return false;
        }
        while (self.zoom as i32) < target {
            self.zoom_in_step();
        }
        while (self.zoom as i32) > target {
            self.zoom_out_step();
        }
        log::trace!("zoom -> {} origin {:?}", self.zoom, self.origin());
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.zoom >= MAX_ZOOM {
            return false;
        }
        self.zoom_in_step();
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom <= MIN_ZOOM {
            return false;
        }
        self.zoom_out_step();
        true
    }

    fn zoom_in_step(&mut self) {
        self.zoom += 1;
        self.origin_x = clamp_origin(self.origin_x as i64 * 2);
        self.origin_y = clamp_origin(self.origin_y as i64 * 2);
    }

    fn zoom_out_step(&mut self) {
        self.zoom -= 1;
        self.origin_x /= 2;
        self.origin_y /= 2;
    }

    fn pan_step(&self) -> i32 {
        self.tile_size / PAN_STEPS_PER_TILE
    }

    /// Moves the view a quarter tile east.
    pub fn pan_east(&mut self) {
        self.offset_x += self.pan_step();
        self.normalize();
    }

    /// Moves the view a quarter tile west.
    pub fn pan_west(&mut self) {
        self.offset_x -= self.pan_step();
        self.normalize();
    }

    /// Moves the view a quarter tile north.
    pub fn pan_north(&mut self) {
        self.offset_y -= self.pan_step();
        self.normalize();
    }

    /// Moves the view a quarter tile south.
    pub fn pan_south(&mut self) {
        self.offset_y += self.pan_step();
        self.normalize();
    }

    /// Starts a drag at pointer position (`x`, `y`).
    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.drag = Some(DragAnchor {
            start_x: x,
            start_y: y,
            offset_x: self.offset_x as i64,
            offset_y: self.offset_y as i64,
        });
    }

    /// Updates the view for the pointer now being at (`x`, `y`).
    ///
    /// Offsets are recomputed from the total displacement since
    /// [`begin_drag`](Self::begin_drag), inverted so dragging the pointer right
    /// moves the content left. Returns `false` when no drag is in progress.
    pub fn continue_drag(&mut self, x: f32, y: f32) -> bool {
        let Some(anchor) = self.drag else {
            return false;
        };
        if !x.is_finite() || !y.is_finite() {
            return false;
        }

        // f32 -> i64 saturates, so far-off pointers cannot overflow.
        let target_x = anchor.offset_x.saturating_sub((x - anchor.start_x) as i64);
        let target_y = anchor.offset_y.saturating_sub((y - anchor.start_y) as i64);
        let ts = self.tile_size as i64;
        let (carried_x, offset_x) = carry(target_x, ts);
        let (carried_y, offset_y) = carry(target_y, ts);
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self.shift_origin(carried_x, carried_y);

        if let Some(anchor) = self.drag.as_mut() {
            // Whole tiles moved into the origin must leave the snapshot too,
            // or the next continue would count them twice.
            anchor.offset_x = anchor.offset_x.saturating_sub(carried_x.saturating_mul(ts));
            anchor.offset_y = anchor.offset_y.saturating_sub(carried_y.saturating_mul(ts));
        }
        true
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Pans, in quarter-tile steps, until the tile containing (`lat`, `lng`)
    /// is under the view center.
    ///
    /// Produces exactly the state the equivalent sequence of pan calls would.
    /// Unprojectable coordinates are ignored. Returns whether any pan happened.
    pub fn center_on(&mut self, lat: f64, lng: f64) -> bool {
        let Some((target_x, target_y)) = lat_lng_to_tile(lat, lng, self.zoom) else {
            log::debug!("ignoring center request for unprojectable ({}, {})", lat, lng);
            return false;
        };
        let (center_x, center_y) = self.center_tile();
        let delta_x = target_x - center_x;
        let delta_y = target_y - center_y;

        for _ in 0..delta_x.abs() * PAN_STEPS_PER_TILE as i64 {
            if delta_x > 0 {
                self.pan_east();
            } else {
                self.pan_west();
            }
        }
        for _ in 0..delta_y.abs() * PAN_STEPS_PER_TILE as i64 {
            if delta_y > 0 {
                self.pan_south();
            } else {
                self.pan_north();
            }
        }
        delta_x != 0 || delta_y != 0
    }

    /// Carries whole tiles of offset into the origin.
    fn normalize(&mut self) {
        let ts = self.tile_size as i64;
        let (carried_x, offset_x) = carry(self.offset_x as i64, ts);
        let (carried_y, offset_y) = carry(self.offset_y as i64, ts);
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self.shift_origin(carried_x, carried_y);
    }

    fn shift_origin(&mut self, tiles_x: i64, tiles_y: i64) {
        self.origin_x = clamp_origin((self.origin_x as i64).saturating_add(tiles_x));
        self.origin_y = clamp_origin((self.origin_y as i64).saturating_add(tiles_y));
    }
}

/// Splits `offset` into whole tiles and a remainder strictly inside
/// `(-tile_size, tile_size)`, carrying toward zero on both sides.
fn carry(offset: i64, tile_size: i64) -> (i64, i32) {
    (offset / tile_size, (offset % tile_size) as i32)
}

fn clamp_origin(tiles: i64) -> i32 {
    tiles.clamp(-ORIGIN_LIMIT, ORIGIN_LIMIT) as i32
}
