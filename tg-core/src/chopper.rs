//! Grid-splitter and per-tile polygon buckets, per §4.E.

use std::collections::BTreeMap;

use log::debug;
use tg_geom::{Contour, Geod, Polygon, Rect};

use crate::bool_ops;

/// One level of the grid: the coarse 1° pass, or the fine 0.125° pass run
/// within each coarse bucket.
const COARSE_STEP_DEG: f64 = 1.0;
const FINE_STEP_DEG: f64 = 0.125;

/// `(tile_id, area_type)` — the chopper's persistence key. `tile_id`
/// encodes the 0.125° cell's southwest corner as `(lon * 8, lat * 8)`
/// integers so it is stable and hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId {
    pub lon8: i32,
    pub lat8: i32,
}

impl TileId {
    pub fn from_point(g: &Geod) -> Self {
        TileId {
            lon8: (g.lon / FINE_STEP_DEG).floor() as i32,
            lat8: (g.lat / FINE_STEP_DEG).floor() as i32,
        }
    }

    pub fn cell_rect(&self) -> Rect {
        let min_lon = self.lon8 as f64 * FINE_STEP_DEG;
        let min_lat = self.lat8 as f64 * FINE_STEP_DEG;
        Rect::new(min_lon, min_lat, min_lon + FINE_STEP_DEG, min_lat + FINE_STEP_DEG)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub tile: TileId,
    pub area_type: u8,
}

/// Where chopped per-tile polygon bundles are persisted. The source
/// system's on-disk bucket files are an external collaborator; this trait
/// is the seam a caller plugs a real store into.
pub trait ChopperStore {
    fn save(&mut self, key: BucketKey, polygons: Vec<Polygon>);
    fn load(&self, key: BucketKey) -> Option<&[Polygon]>;
}

/// In-memory `ChopperStore`, adequate for tests and for callers that keep
/// a whole run's tiles resident.
#[derive(Debug, Default)]
pub struct MemoryChopperStore {
    buckets: BTreeMap<BucketKey, Vec<Polygon>>,
}

impl ChopperStore for MemoryChopperStore {
    fn save(&mut self, key: BucketKey, polygons: Vec<Polygon>) {
        self.buckets.entry(key).or_default().extend(polygons);
    }

    fn load(&self, key: BucketKey) -> Option<&[Polygon]> {
        self.buckets.get(&key).map(|v| v.as_slice())
    }
}

fn cells_covering(rect: &Rect, step: f64) -> Vec<(i32, i32)> {
    let lon0 = (rect.min_lon / step).floor() as i32;
    let lon1 = (rect.max_lon / step).ceil() as i32;
    let lat0 = (rect.min_lat / step).floor() as i32;
    let lat1 = (rect.max_lat / step).ceil() as i32;
    let mut cells = Vec::new();
    for lon in lon0..lon1.max(lon0 + 1) {
        for lat in lat0..lat1.max(lat0 + 1) {
            cells.push((lon, lat));
        }
    }
    cells
}

fn cell_rect(lon_idx: i32, lat_idx: i32, step: f64) -> Rect {
    let min_lon = lon_idx as f64 * step;
    let min_lat = lat_idx as f64 * step;
    Rect::new(min_lon, min_lat, min_lon + step, min_lat + step)
}

/// Clips `polygon` against every cell of a regular grid it straddles.
/// Residues with fewer than 3 vertices on their outer contour are dropped.
fn clip_to_grid(polygon: &Polygon, step: f64, next_id: &mut dyn FnMut() -> u64) -> Vec<(Rect, Polygon)> {
    let Some(rect) = polygon.bounding_rect() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (lon_idx, lat_idx) in cells_covering(&rect, step) {
        let cell = cell_rect(lon_idx, lat_idx, step);
        if !cell.intersects(&rect, 0.0) {
            continue;
        }
        let cell_poly = Polygon::new(rect_contour(&cell), polygon.material.clone(), next_id());
        let residues = bool_ops::intersection(polygon, &cell_poly, next_id);
        for mut r in residues {
            if r.outer().map_or(0, |o| o.nodes.len()) >= 3 {
                r.tex_params = polygon.tex_params;
                out.push((cell, r));
            }
        }
    }
    out
}

fn rect_contour(rect: &Rect) -> Contour {
    Contour::new(
        vec![
            Geod::new_2d(rect.min_lon, rect.min_lat),
            Geod::new_2d(rect.max_lon, rect.min_lat),
            Geod::new_2d(rect.max_lon, rect.max_lat),
            Geod::new_2d(rect.min_lon, rect.max_lat),
        ],
        false,
    )
}

/// Splits `polygon` first by the coarse 1° grid, then each coarse residue
/// by the fine 0.125° grid, and persists the results keyed by
/// `(tile_id, area_type)` in `store`.
pub fn chop(
    polygon: &Polygon,
    area_type: u8,
    store: &mut dyn ChopperStore,
    next_id: &mut dyn FnMut() -> u64,
) {
    let coarse = clip_to_grid(polygon, COARSE_STEP_DEG, next_id);
    debug!(
        "chopper: polygon {} split into {} coarse cell(s)",
        polygon.id,
        coarse.len()
    );
    for (_, coarse_poly) in coarse {
        for (cell, fine_poly) in clip_to_grid(&coarse_poly, FINE_STEP_DEG, next_id) {
            let tile = TileId {
                lon8: (cell.min_lon / FINE_STEP_DEG).round() as i32,
                lat8: (cell.min_lat / FINE_STEP_DEG).round() as i32,
            };
            store.save(BucketKey { tile, area_type }, vec![fine_poly]);
        }
    }
}
