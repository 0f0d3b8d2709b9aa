//! The intersection generator: road-graph cleaner, widener, corner
//! resolver, and texturer, per §4.F — the densest subsystem in the
//! pipeline.

mod phases;

pub use phases::{run_pipeline, PipelineOutput};

use std::collections::HashMap;

use tg_geom::{epsilon, Geod};

use crate::node_set::UniqueNodeSet;

/// One directed input segment with its widening/texturing attributes.
#[derive(Debug, Clone)]
pub struct InputSegment {
    pub a: Geod,
    pub b: Geod,
    pub width_m: f64,
    pub z_order: i32,
    pub type_tag: String,
}

/// A line `point + t * direction` together with which side is "outward",
/// used as a clip constraint at edge endpoints (§4.F Phase 3).
#[derive(Debug, Clone, Copy)]
pub struct HalfPlane {
    pub point: Geod,
    /// Outward-facing normal (unit-ish, planar lon/lat units).
    pub normal: (f64, f64),
}

impl HalfPlane {
    /// True if `p` is on the inward (kept) side of the plane.
    pub fn contains(&self, p: &Geod) -> bool {
        let dx = p.lon - self.point.lon;
        let dy = p.lat - self.point.lat;
        dx * self.normal.0 + dy * self.normal.1 <= epsilon::EPS_2D * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    Raw,
    Clean,
    Capped,
    Constrained,
    Completed,
    Textured,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct RoadEdge {
    pub id: u64,
    pub start: u64,
    pub end: u64,
    pub width_m: f64,
    pub z_order: i32,
    pub type_tag: String,
    pub is_cap: bool,
    pub start_half_plane: Option<HalfPlane>,
    pub end_half_plane: Option<HalfPlane>,
    pub ribbon: Option<Vec<Geod>>,
    pub uvs: Option<Vec<(f64, f64)>>,
    pub state: EdgeState,
    pub v_at_start: f64,
}

impl RoadEdge {
    fn centerline<'a>(&self, nodes: &'a HashMap<u64, RoadNode>) -> (Geod, Geod) {
        (nodes[&self.start].pos, nodes[&self.end].pos)
    }

    /// The two rails (left/right, each `±width_m/2` perpendicular to the
    /// centerline) before any endpoint clipping.
    pub fn raw_rails(&self, nodes: &HashMap<u64, RoadNode>) -> (Segment2, Segment2) {
        let (a, b) = self.centerline(nodes);
        offset_rails(&a, &b, self.width_m)
    }
}

/// A planar 2-point line segment kept in plain lon/lat, used internally by
/// the rail/mitre math (distinct from [`tg_geom::Segment`], which carries
/// geodesic operations this module doesn't need).
#[derive(Debug, Clone, Copy)]
pub struct Segment2 {
    pub a: Geod,
    pub b: Geod,
}

fn perpendicular_unit(a: &Geod, b: &Geod) -> (f64, f64) {
    let dx = b.lon - a.lon;
    let dy = b.lat - a.lat;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f64::EPSILON {
        return (0.0, 0.0);
    }
    (-dy / len, dx / len)
}

/// Offsets the centerline `(a,b)` by `±width_m/2` (converted to degrees
/// via an equirectangular approximation at `a`'s latitude — adequate at
/// the scale of a single road edge) to produce its left and right rails.
fn offset_rails(a: &Geod, b: &Geod, width_m: f64) -> (Segment2, Segment2) {
    let (nx, ny) = perpendicular_unit(a, b);
    let deg_per_m_lat = 1.0 / 111_320.0;
    let deg_per_m_lon = 1.0 / (111_320.0 * a.lat.to_radians().cos().max(1e-6));
    let half = width_m / 2.0;
    let ox = nx * half * deg_per_m_lon;
    let oy = ny * half * deg_per_m_lat;
    let left = Segment2 {
        a: Geod::new(a.lon + ox, a.lat + oy, a.elev),
        b: Geod::new(b.lon + ox, b.lat + oy, b.elev),
    };
    let right = Segment2 {
        a: Geod::new(a.lon - ox, a.lat - oy, a.elev),
        b: Geod::new(b.lon - ox, b.lat - oy, b.elev),
    };
    (left, right)
}

#[derive(Debug, Clone)]
pub struct EdgeStub {
    pub edge_id: u64,
    pub bearing_deg: f64,
    pub is_start: bool,
}

#[derive(Debug, Clone)]
pub struct RoadNode {
    pub id: u64,
    pub pos: Geod,
    /// Incident edge stubs, kept sorted by outgoing bearing (§4.F Phase 3).
    pub stubs: Vec<EdgeStub>,
}

impl RoadNode {
    pub fn degree(&self) -> usize {
        self.stubs.len()
    }
}

/// The planar straight-line graph built from an input segment multiset,
/// and the workspace the six phases mutate in place.
pub struct IntersectionNetwork {
    pub nodes: HashMap<u64, RoadNode>,
    pub edges: HashMap<u64, RoadEdge>,
    node_set: UniqueNodeSet,
    next_edge_id: u64,
}

impl IntersectionNetwork {
    pub fn new() -> Self {
        IntersectionNetwork {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            node_set: UniqueNodeSet::new(epsilon::ROAD_NODE_EPS_2D),
            next_edge_id: 0,
        }
    }

    fn node_id(&mut self, g: Geod) -> u64 {
        let id = self.node_set.insert(g);
        self.nodes.entry(id).or_insert_with(|| RoadNode {
            id,
            pos: g,
            stubs: Vec::new(),
        });
        id
    }

    fn fresh_edge_id(&mut self) -> u64 {
        let id = self.next_edge_id;
        self.next_edge_id += 1;
        id
    }

    fn bearing_deg(a: &Geod, b: &Geod) -> f64 {
        let dx = b.lon - a.lon;
        let dy = b.lat - a.lat;
        dy.atan2(dx).to_degrees().rem_euclid(360.0)
    }

    fn add_stub(&mut self, node_id: u64, edge_id: u64, other_end: Geod, is_start: bool) {
        let node_pos = self.nodes[&node_id].pos;
        let bearing = Self::bearing_deg(&node_pos, &other_end);
        let node = self.nodes.get_mut(&node_id).unwrap();
        node.stubs.push(EdgeStub {
            edge_id,
            bearing_deg: bearing,
            is_start,
        });
        node.stubs
            .sort_by(|x, y| x.bearing_deg.partial_cmp(&y.bearing_deg).unwrap());
    }

    /// Inserts one cleaned segment as a new edge, per Phase 1.
    pub fn add_edge(&mut self, seg: &InputSegment) -> Option<u64> {
        if seg.a.eq_2d(&seg.b, epsilon::ROAD_NODE_EPS_2D) {
            return None;
        }
        let start = self.node_id(seg.a);
        let end = self.node_id(seg.b);
        if start == end {
            return None;
        }
        let id = self.fresh_edge_id();
        self.edges.insert(
            id,
            RoadEdge {
                id,
                start,
                end,
                width_m: seg.width_m,
                z_order: seg.z_order,
                type_tag: seg.type_tag.clone(),
                is_cap: false,
                start_half_plane: None,
                end_half_plane: None,
                ribbon: None,
                uvs: None,
                state: EdgeState::Raw,
                v_at_start: 0.0,
            },
        );
        self.add_stub(start, id, seg.b, true);
        self.add_stub(end, id, seg.a, false);
        Some(id)
    }

    pub fn delete_edge(&mut self, edge_id: u64) {
        if let Some(mut edge) = self.edges.remove(&edge_id) {
            edge.state = EdgeState::Deleted;
            for node_id in [edge.start, edge.end] {
                if let Some(node) = self.nodes.get_mut(&node_id) {
                    node.stubs.retain(|s| s.edge_id != edge_id);
                }
            }
        }
    }

    pub fn other_endpoint(&self, edge: &RoadEdge, node_id: u64) -> Geod {
        if edge.start == node_id {
            self.nodes[&edge.end].pos
        } else {
            self.nodes[&edge.start].pos
        }
    }
}

impl Default for IntersectionNetwork {
    fn default() -> Self {
        Self::new()
    }
}
