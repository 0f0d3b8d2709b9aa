//! Per-tile area-type buckets and the seven-step tile pipeline, per §4.H.

use std::collections::HashMap;

use tg_geom::{epsilon, Contour, Geod, Polygon};

use crate::accumulator::Accumulator;
use crate::elevation::ElevationCallback;
use crate::node_set::UniqueNodeSet;
use crate::texture;
use crate::triangulator::{self, TriangulationConfig};

/// Fixed priority table: water claims land first, then roads, then urban,
/// then natural cover, with everything else falling back to `Default`.
/// Lower-priority polygons lose any area already claimed by a
/// higher-priority one (see [`TileState::claim`]).
///
/// `Custom` is the material-registry escape hatch: callers with more than
/// the five named kinds (up to a budget of 128 distinct material ids) tag
/// their polygons with a raw id instead, always claimed at the lowest
/// priority tier alongside `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaType {
    Water,
    Roads,
    Urban,
    Natural,
    Default,
    Custom(u8),
}

impl AreaType {
    pub const MAX_CUSTOM_ID: u8 = 127;

    pub const ALL_BY_PRIORITY: [AreaType; 5] = [
        AreaType::Water,
        AreaType::Roads,
        AreaType::Urban,
        AreaType::Natural,
        AreaType::Default,
    ];

    /// Lower sorts first; `claim` callers should offer polygons in this
    /// order (`ALL_BY_PRIORITY`, then any `Custom` ids, which all share
    /// `Default`'s tier).
    pub fn priority(self) -> u8 {
        match self {
            AreaType::Water => 0,
            AreaType::Roads => 1,
            AreaType::Urban => 2,
            AreaType::Natural => 3,
            AreaType::Default => 4,
            AreaType::Custom(_) => 4,
        }
    }

    /// Wire-format code: the five fixed kinds keep their historical `0..=4`
    /// values, `Custom(id)` is encoded at `128 + min(id, MAX_CUSTOM_ID)` so
    /// the two spaces never collide.
    pub fn as_u8(self) -> u8 {
        match self {
            AreaType::Water => 0,
            AreaType::Roads => 1,
            AreaType::Urban => 2,
            AreaType::Natural => 3,
            AreaType::Default => 4,
            AreaType::Custom(id) => 128u8.saturating_add(id.min(Self::MAX_CUSTOM_ID)),
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => AreaType::Water,
            1 => AreaType::Roads,
            2 => AreaType::Urban,
            3 => AreaType::Natural,
            4 => AreaType::Default,
            n if n >= 128 => AreaType::Custom(n - 128),
            _ => AreaType::Default,
        }
    }
}

/// Per-area-type polygon list, per §4.H.
#[derive(Debug, Default)]
pub struct LandclassBucket {
    pub polygons: Vec<Polygon>,
}

/// A finished triangulated polygon ready for serialization: the
/// triangles, per-contour texture coordinates (synthesized from the
/// polygon's `tex_params`), and the owning area type.
#[derive(Debug, Clone)]
pub struct FinishedPolygon {
    pub area_type: AreaType,
    pub polygon: Polygon,
    pub contour_uvs: Vec<Vec<(f64, f64)>>,
}

/// Owns everything a single tile's pipeline run needs: the area-type
/// buckets, the unique node set, the running accumulator, and — once
/// [`TileState::run`] completes — the finished, textured mesh.
pub struct TileState {
    pub buckets: HashMap<AreaType, LandclassBucket>,
    pub node_set: UniqueNodeSet,
    pub accumulator: Accumulator,
    pub finished: Vec<FinishedPolygon>,
    pub vertex_normals: HashMap<u32, [f64; 3]>,
}

impl TileState {
    pub fn new() -> Self {
        TileState {
            buckets: HashMap::new(),
            node_set: UniqueNodeSet::new(epsilon::ROAD_NODE_EPS_2D),
            accumulator: Accumulator::new(),
            finished: Vec::new(),
            vertex_normals: HashMap::new(),
        }
    }

    /// Step 1 — cleans and accumulates one incoming polygon under `area_type`.
    /// Polygons must be offered in priority order (see [`AreaType::ALL_BY_PRIORITY`]);
    /// residues subsumed entirely by higher-priority claims are dropped.
    pub fn claim(&mut self, area_type: AreaType, mut polygon: Polygon, next_id: &mut dyn FnMut() -> u64) {
        for contour in &mut polygon.contours {
            contour.snap(epsilon::SNAP_STEP_DEG);
            contour.remove_dups(epsilon::EPS_2D);
        }
        polygon.contours = polygon
            .contours
            .into_iter()
            .flat_map(|c| clean_contour(c))
            .collect();
        polygon.canonify();
        if polygon.is_empty() {
            return;
        }

        let residues = self.accumulator.diff_and_add(&polygon, next_id);
        let bucket = self.buckets.entry(area_type).or_default();
        for residue in residues {
            if !residue.is_empty() {
                bucket.polygons.push(residue);
            }
        }
    }

    /// Steps 2–7. `elevation` supplies node elevations; `texture_info` is
    /// unused here (it belongs to the road-graph pipeline's Phase 6) —
    /// texture coordinates for landclass polygons come straight from each
    /// polygon's own `tex_params`.
    pub fn finish(&mut self, elevation: &dyn ElevationCallback, triangulation: &TriangulationConfig) {
        // Step 2: gather every boundary node in the tile, then eliminate
        // T-junctions against the combined set using the elevation-
        // preserving variant, which moves each inserted node onto the exact
        // edge and interpolates its elevation from the edge's endpoints.
        let mut all_nodes: Vec<Geod> = Vec::new();
        for bucket in self.buckets.values() {
            for polygon in &bucket.polygons {
                for contour in &polygon.contours {
                    all_nodes.extend(contour.nodes.iter().copied());
                }
            }
        }
        let mut stitched_nodes: Vec<Geod> = Vec::new();
        for bucket in self.buckets.values_mut() {
            for polygon in &mut bucket.polygons {
                for contour in &mut polygon.contours {
                    stitched_nodes.extend(contour.add_colinear_nodes_3d(
                        &all_nodes,
                        epsilon::COLINEAR_3D_BBOX_EPS,
                        epsilon::COLINEAR_3D_SLOPE_EPS,
                    ));
                }
            }
        }

        // Step 3: triangulate every polygon, which populates `node_set`.
        let mut triangulated: Vec<(AreaType, Polygon)> = Vec::new();
        for (area_type, bucket) in self.buckets.iter() {
            for polygon in &bucket.polygons {
                let mut polygon = polygon.clone();
                match triangulator::triangulate(&polygon, &mut self.node_set, triangulation) {
                    Ok(tris) => polygon.triangles = tris,
                    Err(_) => polygon.triangles = Vec::new(),
                }
                triangulated.push((*area_type, polygon));
            }
        }

        // Nodes stitched in at step 2 carry an elevation interpolated from
        // their edge's endpoints; flag them now that they have ids so step
        // 4 leaves that elevation alone.
        for g in &stitched_nodes {
            if let Some(id) = self.node_set.find(g) {
                if let Some(flags) = self.node_set.flags_mut(id) {
                    flags.fixed_elevation = true;
                }
            }
        }

        // Step 4: elevations.
        crate::elevation::assign_elevations(&mut self.node_set, elevation);

        // Step 5: normals, area-weighted across every polygon in the tile,
        // recomputed from post-elevation ECEF positions (step 4 may have
        // changed node elevations since triangulation ran).
        triangulated = triangulated
            .into_iter()
            .map(|(area_type, mut polygon)| {
                polygon.triangles = crate::triangulator::recompute_face_normals(&polygon.triangles, &self.node_set);
                (area_type, polygon)
            })
            .collect();
        let all_tris: Vec<Vec<tg_geom::Tri>> = triangulated.iter().map(|(_, p)| p.triangles.clone()).collect();
        self.vertex_normals = triangulator::vertex_normals(&all_tris);

        // Step 6: texture coordinates, per polygon.
        self.finished = triangulated
            .into_iter()
            .map(|(area_type, polygon)| {
                let contour_uvs = polygon
                    .contours
                    .iter()
                    .map(|c| texture::contour_uvs(&polygon.tex_params, &c.nodes))
                    .collect();
                FinishedPolygon {
                    area_type,
                    polygon,
                    contour_uvs,
                }
            })
            .collect();

        // Step 7 (serialization) is the caller's responsibility — see
        // `crate::serialize`.
    }
}

impl Default for TileState {
    fn default() -> Self {
        Self::new()
    }
}

/// "Remove-bad-contours": splits any self-intersecting ring via
/// `RemoveCycles` (preserving its hole flag on every fragment, per §9's
/// "do NOT silently fix" note — see DESIGN.md), drops spikes, and discards
/// fragments too small to be a polygon.
fn clean_contour(mut contour: Contour) -> Vec<Contour> {
    contour.remove_spikes();
    let pieces = contour.remove_cycles(epsilon::EPS_2D);
    pieces.into_iter().filter(|c| c.nodes.len() >= 3).collect()
}
