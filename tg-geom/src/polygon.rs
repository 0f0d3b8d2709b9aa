use crate::{Contour, Geod, Rect};

/// How a polygon's texture coordinates are derived from its nodes, per §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexMethod {
    /// UVs wrap around a reference point at a fixed heading and scale,
    /// the default for most landclass polygons.
    UvByReferencePt,
    /// Texture-projected-square, clipping `u` into `[u_min, u_max]` —
    /// used for roads and other ribbon-like polygons that must not tile
    /// sideways across their width.
    UvByTpsClipU,
    /// Texture-projected-square without clipping either axis.
    UvByTpsNoClip,
    /// Runway-specific projection: `u` runs along `length_m`, `v` across
    /// `width_m`, oriented by `heading_deg`.
    UvByRunway,
}

/// Parameters controlling how texture coordinates are synthesized for a
/// polygon's nodes, mirroring the source system's per-polygon texture info.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexParams {
    pub method: TexMethod,
    pub reference: Geod,
    pub width_m: f64,
    pub length_m: f64,
    /// Texture heading, degrees clockwise from north.
    pub heading_deg: f64,
    pub u_min: f64,
    pub v_min: f64,
    pub u_max: f64,
    pub v_max: f64,
}

impl TexParams {
    pub fn reference_pt(reference: Geod, heading_deg: f64, width_m: f64, length_m: f64) -> Self {
        TexParams {
            method: TexMethod::UvByReferencePt,
            reference,
            width_m,
            length_m,
            heading_deg,
            u_min: 0.0,
            v_min: 0.0,
            u_max: 1.0,
            v_max: 1.0,
        }
    }
}

impl Default for TexParams {
    fn default() -> Self {
        TexParams::reference_pt(Geod::new_2d(0.0, 0.0), 0.0, 1000.0, 1000.0)
    }
}

/// One triangle of a triangulated polygon: indices into the polygon's flat
/// node list, the outward face normal (ECEF, unit length), and the planar
/// area in square degrees (used by `RemoveSlivers`-style post-filters on
/// the triangulated mesh).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tri {
    pub indices: (u32, u32, u32),
    pub face_normal: [f64; 3],
    pub area: f64,
}

/// A material-tagged area: one outer boundary plus any number of holes,
/// texture parameters, and (once triangulated) the resulting mesh.
///
/// `id` is a process-global identity assigned when the polygon first enters
/// the pipeline (see `tg-core`'s atomic id counter); it is preserved across
/// Boolean operations so per-polygon callbacks (elevation, texture) can be
/// cached and invalidated correctly.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub contours: Vec<Contour>,
    pub material: String,
    pub tex_params: TexParams,
    pub id: u64,
    pub triangles: Vec<Tri>,
}

impl Polygon {
    pub fn new(outer: Contour, material: impl Into<String>, id: u64) -> Self {
        Polygon {
            contours: vec![outer],
            material: material.into(),
            tex_params: TexParams::default(),
            id,
            triangles: Vec::new(),
        }
    }

    pub fn outer(&self) -> Option<&Contour> {
        self.contours.iter().find(|c| !c.hole)
    }

    pub fn holes(&self) -> impl Iterator<Item = &Contour> {
        self.contours.iter().filter(|c| c.hole)
    }

    pub fn add_hole(&mut self, mut hole: Contour) {
        hole.hole = true;
        self.contours.push(hole);
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        self.contours
            .iter()
            .filter_map(|c| c.bounding_rect())
            .reduce(|a, b| a.merge(&b))
    }

    /// Total signed area of the outer boundary minus its holes, in square
    /// degrees.
    pub fn net_area(&self) -> f64 {
        self.contours.iter().fold(0.0, |acc, c| {
            let a = c.signed_area().abs();
            if c.hole {
                acc - a
            } else {
                acc + a
            }
        })
    }

    /// Puts every contour into canonical winding (CCW outer, CW holes),
    /// drops degenerate (sub-triangle) contours, and enforces the "at most
    /// one non-hole contour" invariant: if more than one survives, the
    /// largest by area keeps the boundary role and the rest are demoted to
    /// holes (re-winding them CW), matching `strip_holes`'s "one true
    /// outer" treatment of a multi-piece result.
    pub fn canonify(&mut self) {
        self.contours.retain(|c| c.nodes.len() >= 3);

        let outer_count = self.contours.iter().filter(|c| !c.hole).count();
        if outer_count > 1 {
            let largest = self
                .contours
                .iter()
                .enumerate()
                .filter(|(_, c)| !c.hole)
                .max_by(|(_, a), (_, b)| a.signed_area().abs().partial_cmp(&b.signed_area().abs()).unwrap())
                .map(|(i, _)| i);
            for (i, c) in self.contours.iter_mut().enumerate() {
                if !c.hole && Some(i) != largest {
                    c.hole = true;
                }
            }
        }

        for c in &mut self.contours {
            c.canonicalize_winding();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outer().map_or(true, |o| o.nodes.len() < 3)
    }
}
