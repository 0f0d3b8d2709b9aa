//! Per-polygon texture coordinate synthesis, per §6's `TexParams` contract
//! and the intersection generator's `TextureInfoCallback`.

use geographiclib_rs::Geodesic;
use tg_geom::{Geod, TexMethod, TexParams};

/// `(type_tag, is_cap) → (material, u0, u1, v_dist_m, v_repeat)`, supplied
/// by the caller and consulted by the road-graph texturer at junctions and
/// caps (§4.F Phase 6).
pub trait TextureInfoCallback {
    fn texture_info(&self, type_tag: &str, is_cap: bool) -> (String, f64, f64, f64, f64);
}

impl<F> TextureInfoCallback for F
where
    F: Fn(&str, bool) -> (String, f64, f64, f64, f64),
{
    fn texture_info(&self, type_tag: &str, is_cap: bool) -> (String, f64, f64, f64, f64) {
        self(type_tag, is_cap)
    }
}

/// Local planar offset of `p` from `params.reference`, in meters, rotated
/// so that `x` runs along `heading_deg` and `y` is perpendicular to it.
fn local_offset_m(params: &TexParams, p: &Geod) -> (f64, f64) {
    let (dist_m, azi_deg, _azi2, _a12) = Geodesic::wgs84().inverse(
        params.reference.lat,
        params.reference.lon,
        p.lat,
        p.lon,
    );
    let relative_bearing = (azi_deg - params.heading_deg).to_radians();
    let along = dist_m * relative_bearing.cos();
    let across = dist_m * relative_bearing.sin();
    (along, across)
}

/// Synthesizes `(u, v)` for a single node of a polygon carrying `params`.
pub fn node_uv(params: &TexParams, p: &Geod) -> (f64, f64) {
    match params.method {
        TexMethod::UvByReferencePt => {
            let (along, across) = local_offset_m(params, p);
            let u = across / params.width_m.max(f64::EPSILON);
            let v = along / params.length_m.max(f64::EPSILON);
            (u, v)
        }
        TexMethod::UvByTpsNoClip => {
            let (along, across) = local_offset_m(params, p);
            let u = params.u_min + across / params.width_m.max(f64::EPSILON) * (params.u_max - params.u_min);
            let v = params.v_min + along / params.length_m.max(f64::EPSILON) * (params.v_max - params.v_min);
            (u, v)
        }
        TexMethod::UvByTpsClipU => {
            let (along, across) = local_offset_m(params, p);
            let u = params.u_min + across / params.width_m.max(f64::EPSILON) * (params.u_max - params.u_min);
            let v = params.v_min + along / params.length_m.max(f64::EPSILON) * (params.v_max - params.v_min);
            (u.clamp(params.u_min, params.u_max), v)
        }
        TexMethod::UvByRunway => {
            let (along, across) = local_offset_m(params, p);
            let u = 0.5 + across / params.width_m.max(f64::EPSILON);
            let v = along / params.length_m.max(f64::EPSILON);
            (u, v)
        }
    }
}

/// Synthesizes `(u, v)` for every node of a contour, in order.
pub fn contour_uvs(params: &TexParams, nodes: &[Geod]) -> Vec<(f64, f64)> {
    nodes.iter().map(|p| node_uv(params, p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_pt_is_zero_at_origin() {
        let params = TexParams::reference_pt(Geod::new_2d(0.0, 0.0), 0.0, 1000.0, 1000.0);
        let (u, v) = node_uv(&params, &Geod::new_2d(0.0, 0.0));
        approx::assert_abs_diff_eq!(u, 0.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn clip_u_respects_bounds() {
        let mut params = TexParams::reference_pt(Geod::new_2d(0.0, 0.0), 0.0, 10.0, 1000.0);
        params.method = TexMethod::UvByTpsClipU;
        params.u_min = 0.0;
        params.u_max = 1.0;
        let far = Geod::new_2d(0.01, 0.0);
        let (u, _v) = node_uv(&params, &far);
        assert!(u <= 1.0 && u >= 0.0);
    }
}
