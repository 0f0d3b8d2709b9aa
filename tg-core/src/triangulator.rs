//! Constrained Delaunay triangulation of cleaned polygons, per §4.G.

use std::collections::HashMap;

use log::warn;
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation as _};
use tg_geom::{Geod, Polygon, Tri};

use crate::ecef;
use crate::error::TriangulationError;
use crate::node_set::UniqueNodeSet;

/// Tunables controlling how aggressively near-duplicate points are merged
/// before triangulation, mirroring `SpadeTriangulationConfig`'s `snap_radius`.
#[derive(Debug, Clone, Copy)]
pub struct TriangulationConfig {
    pub snap_radius_deg: f64,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        TriangulationConfig {
            snap_radius_deg: 1e-7,
        }
    }
}

fn point_key(p: Point2<f64>, snap: f64) -> (i64, i64) {
    ((p.x / snap).round() as i64, (p.y / snap).round() as i64)
}

/// Triangulates `polygon`'s outer boundary minus its holes, using every
/// node of `node_set` that falls within the polygon's bounding box as
/// additional Steiner points, per §4.G. Every emitted triangle's vertex
/// indices are ids from `node_set`, inserting new ones for any polygon
/// node not already present.
pub fn triangulate(
    polygon: &Polygon,
    node_set: &mut UniqueNodeSet,
    config: &TriangulationConfig,
) -> Result<Vec<Tri>, TriangulationError> {
    let Some(outer) = polygon.outer() else {
        return Ok(Vec::new());
    };
    if outer.nodes.len() < 3 {
        return Ok(Vec::new());
    }
    let Some(rect) = polygon.bounding_rect() else {
        return Ok(Vec::new());
    };

    let mut cdt = ConstrainedDelaunayTriangulation::<Point2<f64>>::new();
    let mut key_to_id: HashMap<(i64, i64), u64> = HashMap::new();

    let mut insert_and_record = |cdt: &mut ConstrainedDelaunayTriangulation<Point2<f64>>, g: Geod| {
        let id = node_set.insert(g);
        let pt = Point2::new(g.lon, g.lat);
        let handle = cdt
            .insert(pt)
            .map_err(|e| TriangulationError::EngineError(format!("{e:?}")))?;
        key_to_id.insert(point_key(pt, config.snap_radius_deg), id);
        Ok::<_, TriangulationError>(handle)
    };

    // Steiner points from the tile's node set within the polygon's bbox.
    for (_, g) in node_set.within_rect(&rect) {
        insert_and_record(&mut cdt, g)?;
    }

    // Constrained ring edges: outer boundary, then each hole.
    for contour in &polygon.contours {
        if contour.nodes.len() < 3 {
            continue;
        }
        let mut handles = Vec::with_capacity(contour.nodes.len());
        for &g in &contour.nodes {
            handles.push(insert_and_record(&mut cdt, g)?);
        }
        let n = handles.len();
        for i in 0..n {
            let a = handles[i];
            let b = handles[(i + 1) % n];
            if a == b {
                continue;
            }
            if cdt.can_add_constraint(a, b) {
                cdt.add_constraint(a, b);
            } else {
                warn!(
                    "triangulator: polygon {} could not constrain edge {i}-{} (likely coincident with an existing constraint)",
                    polygon.id,
                    (i + 1) % n
                );
            }
        }
    }

    let mut triangles = Vec::new();
    for face in cdt.inner_faces() {
        let positions = face.positions();
        let centroid = Geod::new_2d(
            (positions[0].x + positions[1].x + positions[2].x) / 3.0,
            (positions[0].y + positions[1].y + positions[2].y) / 3.0,
        );
        if !polygon_contains_for_triangulation(polygon, &centroid) {
            continue;
        }

        let verts: Vec<&Geod> = positions
            .iter()
            .map(|p| {
                let key = point_key(*p, config.snap_radius_deg);
                key_to_id
                    .get(&key)
                    .and_then(|id| node_set.get(*id))
                    .ok_or(TriangulationError::VertexNotInNodeSet)
            })
            .collect::<Result<_, _>>()?;
        let ids: Vec<u64> = positions
            .iter()
            .map(|p| {
                let key = point_key(*p, config.snap_radius_deg);
                *key_to_id.get(&key).expect("looked up above")
            })
            .collect();

        let Some((normal, area)) = ecef::face_normal(verts[0], verts[1], verts[2]) else {
            continue;
        };
        if area <= f64::EPSILON {
            continue;
        }

        triangles.push(Tri {
            indices: (ids[0] as u32, ids[1] as u32, ids[2] as u32),
            face_normal: normal,
            area,
        });
    }

    Ok(triangles)
}

/// A face's centroid belongs to the triangulated region iff it lies inside
/// the outer boundary and outside every hole.
fn polygon_contains_for_triangulation(polygon: &Polygon, p: &Geod) -> bool {
    let eps = tg_geom::EPS_2D;
    let Some(outer) = polygon.outer() else {
        return false;
    };
    if !outer.contains_point(p, eps) {
        return false;
    }
    !polygon.holes().any(|h| h.contains_point(p, eps))
}

/// Recomputes each triangle's face normal and area from its vertices'
/// current positions in `node_set`, per §4.G's "face normal = geodetic-to-
/// ECEF vectors of the three vertices." Triangulation runs before elevation
/// assignment (§4.H step order), so face normals computed at triangulation
/// time reflect `elev = 0`; callers must call this after elevations are
/// assigned to get normals that reflect terrain slope. Triangles whose
/// vertices are missing or degenerate are dropped.
pub fn recompute_face_normals(triangles: &[Tri], node_set: &UniqueNodeSet) -> Vec<Tri> {
    triangles
        .iter()
        .filter_map(|tri| {
            let a = node_set.get(tri.indices.0 as u64)?;
            let b = node_set.get(tri.indices.1 as u64)?;
            let c = node_set.get(tri.indices.2 as u64)?;
            let (normal, area) = ecef::face_normal(a, b, c)?;
            if area <= f64::EPSILON {
                return None;
            }
            Some(Tri {
                indices: tri.indices,
                face_normal: normal,
                area,
            })
        })
        .collect()
}

/// Computes area-weighted vertex normals for every node touched by any
/// triangle across `triangles_by_polygon`, per §4.G: the area-weighted
/// sum of the face normals of every triangle incident on that node across
/// *all* polygons in the tile.
pub fn vertex_normals(triangles_by_polygon: &[Vec<Tri>]) -> HashMap<u32, [f64; 3]> {
    let mut acc: HashMap<u32, [f64; 3]> = HashMap::new();
    for tris in triangles_by_polygon {
        for tri in tris {
            let weighted = [
                tri.face_normal[0] * tri.area,
                tri.face_normal[1] * tri.area,
                tri.face_normal[2] * tri.area,
            ];
            for idx in [tri.indices.0, tri.indices.1, tri.indices.2] {
                let entry = acc.entry(idx).or_insert([0.0, 0.0, 0.0]);
                entry[0] += weighted[0];
                entry[1] += weighted[1];
                entry[2] += weighted[2];
            }
        }
    }
    for v in acc.values_mut() {
        if let Some(n) = ecef::normalize(*v) {
            *v = n;
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_geom::Contour;

    #[test]
    fn triangulates_simple_square() {
        let mut node_set = UniqueNodeSet::new(1e-9);
        let poly = Polygon::new(
            Contour::new(
                vec![
                    Geod::new_2d(0.0, 0.0),
                    Geod::new_2d(1.0, 0.0),
                    Geod::new_2d(1.0, 1.0),
                    Geod::new_2d(0.0, 1.0),
                ],
                false,
            ),
            "Grass",
            1,
        );
        let tris = triangulate(&poly, &mut node_set, &TriangulationConfig::default()).unwrap();
        assert_eq!(tris.len(), 2);
        for tri in &tris {
            assert!(tri.area > 0.0);
        }
    }

    #[test]
    fn recompute_face_normals_reflects_updated_elevation() {
        let mut node_set = UniqueNodeSet::new(1e-9);
        let a = node_set.insert(Geod::new(0.0, 0.0, 0.0));
        let b = node_set.insert(Geod::new(1.0, 0.0, 0.0));
        let c = node_set.insert(Geod::new(0.0, 1.0, 0.0));
        let tris = vec![Tri {
            indices: (a as u32, b as u32, c as u32),
            face_normal: [0.0, 0.0, 0.0],
            area: 0.0,
        }];
        let flat = recompute_face_normals(&tris, &node_set);
        assert_eq!(flat.len(), 1);

        node_set.set_elevation(c, 50_000.0);
        let sloped = recompute_face_normals(&tris, &node_set);
        assert_eq!(sloped.len(), 1);
        assert!(
            approx::abs_diff_ne!(flat[0].face_normal[0], sloped[0].face_normal[0], epsilon = 1e-6)
                || approx::abs_diff_ne!(flat[0].face_normal[1], sloped[0].face_normal[1], epsilon = 1e-6)
                || approx::abs_diff_ne!(flat[0].face_normal[2], sloped[0].face_normal[2], epsilon = 1e-6),
            "raising one vertex's elevation should change the face normal"
        );
    }

    #[test]
    fn skips_triangles_inside_hole() {
        let mut node_set = UniqueNodeSet::new(1e-9);
        let mut poly = Polygon::new(
            Contour::new(
                vec![
                    Geod::new_2d(0.0, 0.0),
                    Geod::new_2d(4.0, 0.0),
                    Geod::new_2d(4.0, 4.0),
                    Geod::new_2d(0.0, 4.0),
                ],
                false,
            ),
            "Grass",
            1,
        );
        poly.add_hole(Contour::new(
            vec![
                Geod::new_2d(1.0, 1.0),
                Geod::new_2d(1.0, 2.0),
                Geod::new_2d(2.0, 2.0),
                Geod::new_2d(2.0, 1.0),
            ],
            true,
        ));
        let tris = triangulate(&poly, &mut node_set, &TriangulationConfig::default()).unwrap();
        let total_area_deg2: f64 = tris
            .iter()
            .map(|t| {
                // planar area isn't directly comparable to ECEF tri.area (meters²);
                // just assert we produced a reasonable, non-zero triangle count.
                t.area
            })
            .sum();
        assert!(total_area_deg2 > 0.0);
        assert!(!tris.is_empty());
    }
}
