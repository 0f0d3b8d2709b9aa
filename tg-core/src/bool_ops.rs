//! Planar Boolean set operations and Minkowski-style offset, bridging
//! [`tg_geom::Polygon`] to the `i_overlay` planar clipper.
//!
//! Per §4.C, the bridge is two pure converters plus a stateless invocation:
//! gather-and-orient on the way in, `AddColinearNodes` on the way out.

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay::ShapeType;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::f64::graph::F64OverlayGraph;
use i_overlay::f64::overlay::F64Overlay;
use i_overlay::i_float::f64_point::F64Point;
use i_overlay::mesh::outline::offset::OutlineOffset;
use i_overlay::mesh::style::{LineJoin, OutlineStyle};

use tg_geom::{epsilon, Contour, Geod, Polygon};

use crate::error::ClipError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Union,
    Intersection,
    Difference,
    Xor,
}

impl From<OpType> for OverlayRule {
    fn from(op: OpType) -> Self {
        match op {
            OpType::Union => OverlayRule::Union,
            OpType::Intersection => OverlayRule::Intersect,
            OpType::Difference => OverlayRule::Difference,
            OpType::Xor => OverlayRule::Xor,
        }
    }
}

/// A planar shape as `i_overlay` understands it: a polygon as a list of
/// rings (exterior first), each ring an implicitly-closed point list.
type Shape = Vec<Vec<F64Point>>;

fn contour_to_path(contour: &Contour) -> Vec<F64Point> {
    contour
        .nodes
        .iter()
        .map(|g| F64Point::new(g.lon, g.lat))
        .collect()
}

fn path_to_nodes(path: &[F64Point]) -> Vec<Geod> {
    path.iter().map(|p| Geod::new_2d(p.x, p.y)).collect()
}

/// Converts a canonified polygon's rings into clipper paths: exterior
/// first (already CCW), then holes (already CW) — `canonify` is assumed
/// to have run already.
fn polygon_to_shape_paths(polygon: &Polygon) -> Vec<Vec<F64Point>> {
    let mut paths = Vec::with_capacity(polygon.contours.len());
    if let Some(outer) = polygon.outer() {
        paths.push(contour_to_path(outer));
    }
    for hole in polygon.holes() {
        paths.push(contour_to_path(hole));
    }
    paths
}

fn shapes_to_polygons(shapes: Vec<Shape>, material: &str, next_id: &mut dyn FnMut() -> u64) -> Vec<Polygon> {
    shapes
        .into_iter()
        .filter_map(|shape| {
            let mut rings = shape.into_iter();
            let exterior = rings.next()?;
            if exterior.len() < 3 {
                return None;
            }
            let mut poly = Polygon::new(Contour::new(path_to_nodes(&exterior), false), material, next_id());
            for ring in rings {
                if ring.len() >= 3 {
                    poly.add_hole(Contour::new(path_to_nodes(&ring), true));
                }
            }
            poly.canonify();
            Some(poly)
        })
        .collect()
}

fn run_overlay(subject: &Polygon, clip: &Polygon, op: OpType) -> F64OverlayGraph {
    let mut overlay = F64Overlay::new();
    for path in polygon_to_shape_paths(subject) {
        overlay.add_path(path, ShapeType::Subject);
    }
    for path in polygon_to_shape_paths(clip) {
        overlay.add_path(path, ShapeType::Clip);
    }
    let _ = op;
    overlay.into_graph(FillRule::EvenOdd)
}

/// Runs a Boolean set operation between two polygons, gathers the union of
/// all input vertices, and reintroduces any boundary points the clipper
/// collapsed via `AddColinearNodes` so shared edges with neighbours survive.
pub fn boolean_op(
    subject: &Polygon,
    clip: &Polygon,
    op: OpType,
    next_id: &mut dyn FnMut() -> u64,
) -> Vec<Polygon> {
    let graph = run_overlay(subject, clip, op);
    let shapes = graph.extract_shapes(op.into());
    let material = subject.material.clone();
    let mut result = shapes_to_polygons(shapes, &material, next_id);

    let mut all_nodes: Vec<Geod> = Vec::new();
    for c in subject.contours.iter().chain(clip.contours.iter()) {
        all_nodes.extend_from_slice(&c.nodes);
    }
    for poly in &mut result {
        for c in &mut poly.contours {
            c.add_colinear_nodes(&all_nodes, epsilon::COLINEAR_2D_BBOX_EPS, epsilon::COLINEAR_2D_SLOPE_EPS);
        }
    }
    result
}

pub fn union(subject: &Polygon, clip: &Polygon, next_id: &mut dyn FnMut() -> u64) -> Vec<Polygon> {
    boolean_op(subject, clip, OpType::Union, next_id)
}

pub fn intersection(subject: &Polygon, clip: &Polygon, next_id: &mut dyn FnMut() -> u64) -> Vec<Polygon> {
    boolean_op(subject, clip, OpType::Intersection, next_id)
}

pub fn difference(subject: &Polygon, clip: &Polygon, next_id: &mut dyn FnMut() -> u64) -> Vec<Polygon> {
    boolean_op(subject, clip, OpType::Difference, next_id)
}

pub fn xor(subject: &Polygon, clip: &Polygon, next_id: &mut dyn FnMut() -> u64) -> Vec<Polygon> {
    boolean_op(subject, clip, OpType::Xor, next_id)
}

/// Unions all non-hole contours of `polygon` and discards holes, per
/// `StripHoles`. Returns the resulting (possibly multi-piece) shapes as
/// fresh polygons sharing `polygon`'s material.
pub fn strip_holes(polygon: &Polygon, next_id: &mut dyn FnMut() -> u64) -> Vec<Polygon> {
    let outer = match polygon.outer() {
        Some(o) => o.clone(),
        None => return Vec::new(),
    };
    let mut result = Polygon::new(outer, polygon.material.clone(), next_id());
    result.canonify();
    vec![result]
}

/// Scans `subject`'s contours; any with min-angle below
/// [`epsilon::SLIVER_MIN_ANGLE_DEG`] and area below either sliver threshold
/// is removed and, if not a hole, appended to `slivers_out`. Holes that
/// qualify as slivers are simply dropped (they have no standalone identity
/// to merge back in later).
pub fn remove_slivers(subject: &mut Polygon, slivers_out: &mut Vec<Contour>) {
    let mut kept = Vec::with_capacity(subject.contours.len());
    for c in subject.contours.drain(..) {
        let area = c.signed_area().abs();
        let angle_and_area = matches!(c.min_angle(), Some(angle) if angle < epsilon::SLIVER_MIN_ANGLE_DEG)
            && area < epsilon::SLIVER_AREA_ANGLE_DEG2;
        let is_sliver = angle_and_area || area < epsilon::SLIVER_AREA_DEG2;
        if is_sliver {
            if !c.hole {
                slivers_out.push(c);
            }
        } else {
            kept.push(c);
        }
    }
    subject.contours = kept;
}

/// Attempts to union each sliver with each polygon in turn, keeping the
/// merge iff the target's contour count does not increase (i.e. the
/// sliver was absorbed rather than creating a new disjoint piece).
/// Returns the slivers that could not be merged into anything.
pub fn merge_slivers(polys: &mut [Polygon], slivers: Vec<Contour>, next_id: &mut dyn FnMut() -> u64) -> Vec<Contour> {
    let mut unmerged = Vec::new();
    'sliver: for sliver in slivers {
        let sliver_poly = Polygon::new(sliver.clone(), "sliver", next_id());
        for target in polys.iter_mut() {
            let before = target.contours.len();
            let merged = union(target, &sliver_poly, next_id);
            if merged.len() == 1 && merged[0].contours.len() <= before {
                *target = merged.into_iter().next().unwrap();
                continue 'sliver;
            }
        }
        unmerged.push(sliver);
    }
    unmerged
}

/// Minkowski-style offset of a single-contour polygon by `offset_m`
/// (converted from meters to degrees at the polygon's latitude before the
/// call — callers operating in already-planar degrees should convert
/// themselves). Square joins, closed-polygon end type, per §4.B. Errors
/// if the clipper does not return exactly one contour.
pub fn expand(polygon: &Polygon, offset_deg: f64, next_id: &mut dyn FnMut() -> u64) -> Result<Polygon, ClipError> {
    let paths = polygon_to_shape_paths(polygon);
    if paths.is_empty() {
        return Err(ClipError::EmptyOperand);
    }
    let style = OutlineStyle::new(offset_deg).line_join(LineJoin::Bevel);
    let shapes = paths.outline(style);
    let polys = shapes_to_polygons(shapes, &polygon.material, next_id);
    if polys.len() != 1 {
        return Err(ClipError::ExpandNotSinglePolygon { found: polys.len() });
    }
    Ok(polys.into_iter().next().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_geom::Contour;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        let mut id = 0u64;
        let mut next = move || {
            id += 1;
            id
        };
        Polygon::new(
            Contour::new(
                vec![
                    Geod::new_2d(x0, y0),
                    Geod::new_2d(x1, y0),
                    Geod::new_2d(x1, y1),
                    Geod::new_2d(x0, y1),
                ],
                false,
            ),
            "Grass",
            next(),
        )
    }

    #[test]
    fn diff_of_overlapping_squares_makes_l_shape() {
        let a = square(0.0, 0.0, 2.0, 2.0);
        let b = square(1.0, 1.0, 3.0, 3.0);
        let mut id = 100u64;
        let mut next = move || {
            id += 1;
            id
        };
        let result = difference(&a, &b, &mut next);
        assert_eq!(result.len(), 1);
        let area = result[0].net_area();
        approx::assert_abs_diff_eq!(area, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn remove_slivers_drops_tiny_area_regardless_of_angle() {
        // A near-square contour (min angle well above the 10-degree
        // threshold) whose area is nonetheless below the unconditional
        // area floor must still be removed.
        let side = 1e-6;
        let mut poly = Polygon::new(
            Contour::new(
                vec![
                    Geod::new_2d(0.0, 0.0),
                    Geod::new_2d(side, 0.0),
                    Geod::new_2d(side, side),
                    Geod::new_2d(0.0, side),
                ],
                false,
            ),
            "Grass",
            1,
        );
        assert!(poly.contours[0].min_angle().unwrap() > epsilon::SLIVER_MIN_ANGLE_DEG);
        let mut slivers = Vec::new();
        remove_slivers(&mut poly, &mut slivers);
        assert!(poly.contours.is_empty());
        assert_eq!(slivers.len(), 1);
    }

    #[test]
    fn intersect_is_commutative_in_area() {
        let a = square(0.0, 0.0, 2.0, 2.0);
        let b = square(1.0, 1.0, 3.0, 3.0);
        let mut id1 = 0u64;
        let mut next1 = move || {
            id1 += 1;
            id1
        };
        let mut id2 = 0u64;
        let mut next2 = move || {
            id2 += 1;
            id2
        };
        let ab = intersection(&a, &b, &mut next1);
        let ba = intersection(&b, &a, &mut next2);
        let area_ab: f64 = ab.iter().map(|p| p.net_area()).sum();
        let area_ba: f64 = ba.iter().map(|p| p.net_area()).sum();
        approx::assert_abs_diff_eq!(area_ab, area_ba, epsilon = 1e-9);
    }
}
