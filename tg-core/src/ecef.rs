//! WGS-84 geodetic-to-ECEF conversion, used only to compute face/vertex
//! normals for the triangulator (§4.G); the rest of the pipeline stays in
//! geodetic lon/lat per §1's non-goals.

use tg_geom::Geod;

const EQUATORIAL_EARTH_RADIUS: f64 = 6_378_137.0;
const POLAR_EARTH_RADIUS: f64 = 6_356_752.314_245;
const EARTH_FLATTENING: f64 =
    (EQUATORIAL_EARTH_RADIUS - POLAR_EARTH_RADIUS) / EQUATORIAL_EARTH_RADIUS;

/// Earth's first eccentricity squared, `e² = f(2 − f)`.
fn eccentricity_squared() -> f64 {
    EARTH_FLATTENING * (2.0 - EARTH_FLATTENING)
}

/// Converts a geodetic position to Earth-Centered Earth-Fixed Cartesian
/// coordinates, in meters.
pub fn geod_to_ecef(g: &Geod) -> [f64; 3] {
    let lat = g.lat.to_radians();
    let lon = g.lon.to_radians();
    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let n = EQUATORIAL_EARTH_RADIUS / (1.0 - eccentricity_squared() * sin_lat * sin_lat).sqrt();
    let x = (n + g.elev) * cos_lat * lon.cos();
    let y = (n + g.elev) * cos_lat * lon.sin();
    let z = (n * (1.0 - eccentricity_squared()) + g.elev) * sin_lat;
    [x, y, z]
}

pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

pub fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let n = norm(v);
    if n <= f64::EPSILON {
        None
    } else {
        Some([v[0] / n, v[1] / n, v[2] / n])
    }
}

/// Outward unit normal of the triangle `(a, b, c)` in ECEF, or `None` if
/// the triangle is degenerate (zero area).
pub fn face_normal(a: &Geod, b: &Geod, c: &Geod) -> Option<([f64; 3], f64)> {
    let pa = geod_to_ecef(a);
    let pb = geod_to_ecef(b);
    let pc = geod_to_ecef(c);
    let cr = cross(sub(pb, pa), sub(pc, pa));
    let area = norm(cr) / 2.0;
    normalize(cr).map(|n| (n, area))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_prime_meridian_is_on_x_axis() {
        let p = geod_to_ecef(&Geod::new_2d(0.0, 0.0));
        approx::assert_abs_diff_eq!(p[0], EQUATORIAL_EARTH_RADIUS, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(p[1], 0.0, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(p[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn north_pole_is_on_z_axis() {
        let p = geod_to_ecef(&Geod::new_2d(0.0, 90.0));
        approx::assert_abs_diff_eq!(p[0], 0.0, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(p[1], 0.0, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(p[2], POLAR_EARTH_RADIUS, epsilon = 1e-3);
    }
}
