use crate::{Geod, Rect};
use geographiclib_rs::Geodesic;

/// An ordered pair of [`Geod`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Geod,
    pub b: Geod,
}

/// The outcome of classifying how two segments relate to each other, per
/// §4.A: segments can touch at shared endpoints, cross properly in their
/// interiors, or overlap along a colinear run, in addition to the ordinary
/// no-intersection case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentRelation {
    None,
    /// Shared endpoint within 2-D ε.
    Touching(Geod),
    /// Proper interior intersection.
    Crossing(Geod),
    /// Parallel and overlapping by more than ε; carries the overlap interval.
    ColinearOverlap(Geod, Geod),
}

impl Segment {
    pub fn new(a: Geod, b: Geod) -> Self {
        Segment { a, b }
    }

    /// Length of the segment on the WGS-84 ellipsoid, in meters.
    pub fn length_m(&self) -> f64 {
        let (distance_m, _azi1, _azi2, _a12) =
            Geodesic::wgs84().inverse(self.a.lat, self.a.lon, self.b.lat, self.b.lon);
        distance_m
    }

    /// Initial bearing from `a` to `b`, in degrees, north = 0, east = 90.
    pub fn bearing_deg(&self) -> f64 {
        let (_distance_m, azi1, _azi2, _a12) =
            Geodesic::wgs84().inverse(self.a.lat, self.a.lon, self.b.lat, self.b.lon);
        azi1
    }

    /// Midpoint on the ellipsoid (half the geodesic distance along the
    /// great ellipse from `a` to `b`), with linearly-interpolated elevation.
    pub fn midpoint(&self) -> Geod {
        let (distance_m, azi1, _azi2, _a12) =
            Geodesic::wgs84().inverse(self.a.lat, self.a.lon, self.b.lat, self.b.lon);
        let (lat, lon) = Geodesic::wgs84().direct(self.a.lat, self.a.lon, azi1, distance_m / 2.0);
        Geod::new(lon, lat, (self.a.elev + self.b.elev) / 2.0)
    }

    /// A point a given fraction `t` (`0..=1`) of the geodesic distance from
    /// `a` towards `b`, with linearly-interpolated elevation.
    pub fn interpolate(&self, t: f64) -> Geod {
        let (distance_m, azi1, _azi2, _a12) =
            Geodesic::wgs84().inverse(self.a.lat, self.a.lon, self.b.lat, self.b.lon);
        let (lat, lon) = Geodesic::wgs84().direct(self.a.lat, self.a.lon, azi1, distance_m * t);
        Geod::new(lon, lat, self.a.elev + (self.b.elev - self.a.elev) * t)
    }

    pub fn bounding_rect(&self) -> Rect {
        Rect::from_points([&self.a, &self.b]).expect("segment always has two points")
    }

    /// Perpendicular projection of `p` onto the infinite line through `a`,`b`,
    /// in planar lon/lat, returned as a parametric value `t` such that the
    /// projected point is `a + t * (b - a)`.
    pub fn project_param(&self, p: &Geod) -> f64 {
        let dx = self.b.lon - self.a.lon;
        let dy = self.b.lat - self.a.lat;
        let len2 = dx * dx + dy * dy;
        if len2 <= f64::EPSILON {
            return 0.0;
        }
        ((p.lon - self.a.lon) * dx + (p.lat - self.a.lat) * dy) / len2
    }

    /// Perpendicular planar distance (in degrees) from `p` to the infinite
    /// line through `a`,`b`.
    pub fn distance_to_line(&self, p: &Geod) -> f64 {
        let dx = self.b.lon - self.a.lon;
        let dy = self.b.lat - self.a.lat;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f64::EPSILON {
            return ((p.lon - self.a.lon).powi(2) + (p.lat - self.a.lat).powi(2)).sqrt();
        }
        ((p.lon - self.a.lon) * dy - (p.lat - self.a.lat) * dx).abs() / len
    }

    /// Classify how this segment relates to `other` in the planar lon/lat
    /// projection, per [`SegmentRelation`].
    pub fn intersect(&self, other: &Segment, eps: f64) -> SegmentRelation {
        // Shared-endpoint check first: touching dominates crossing/colinear.
        for (p, q) in [
            (&self.a, &other.a),
            (&self.a, &other.b),
            (&self.b, &other.a),
            (&self.b, &other.b),
        ] {
            if p.eq_2d(q, eps) {
                return SegmentRelation::Touching(*p);
            }
        }

        let r = (self.b.lon - self.a.lon, self.b.lat - self.a.lat);
        let s = (other.b.lon - other.a.lon, other.b.lat - other.a.lat);
        let denom = cross(r, s);
        let qp = (other.a.lon - self.a.lon, other.a.lat - self.a.lat);

        if denom.abs() <= eps {
            // Parallel. Colinear iff qp is parallel to r too.
            if cross(qp, r).abs() > eps {
                return SegmentRelation::None;
            }
            return self.colinear_overlap(other, eps);
        }

        let t = cross(qp, s) / denom;
        let u = cross(qp, r) / denom;
        if (-eps..=1.0 + eps).contains(&t) && (-eps..=1.0 + eps).contains(&u) {
            let pt = Geod::new(
                self.a.lon + t * r.0,
                self.a.lat + t * r.1,
                self.a.elev + t * (self.b.elev - self.a.elev),
            );
            SegmentRelation::Crossing(pt)
        } else {
            SegmentRelation::None
        }
    }

    fn colinear_overlap(&self, other: &Segment, eps: f64) -> SegmentRelation {
        let t0 = self.project_param(&other.a);
        let t1 = self.project_param(&other.b);
        let (lo, hi) = (t0.min(t1), t0.max(t1));
        let start = lo.max(0.0);
        let end = hi.min(1.0);
        if end - start > eps {
            SegmentRelation::ColinearOverlap(self.interpolate(start), self.interpolate(end))
        } else {
            SegmentRelation::None
        }
    }

    /// Clip this segment to an axis-aligned rectangle (Liang–Barsky),
    /// returning the clipped sub-segment, if any part survives.
    pub fn intersect_rect(&self, rect: &Rect) -> Option<Segment> {
        let (x0, y0) = (self.a.lon, self.a.lat);
        let (dx, dy) = (self.b.lon - self.a.lon, self.b.lat - self.a.lat);
        let mut t_min = 0.0f64;
        let mut t_max = 1.0f64;

        let clip = |p: f64, q: f64, t_min: &mut f64, t_max: &mut f64| -> bool {
            if p.abs() <= f64::EPSILON {
                return q >= 0.0;
            }
            let r = q / p;
            if p < 0.0 {
                if r > *t_max {
                    return false;
                }
                if r > *t_min {
                    *t_min = r;
                }
            } else {
                if r < *t_min {
                    return false;
                }
                if r < *t_max {
                    *t_max = r;
                }
            }
            true
        };

        if !clip(-dx, x0 - rect.min_lon, &mut t_min, &mut t_max) {
            return None;
        }
        if !clip(dx, rect.max_lon - x0, &mut t_min, &mut t_max) {
            return None;
        }
        if !clip(-dy, y0 - rect.min_lat, &mut t_min, &mut t_max) {
            return None;
        }
        if !clip(dy, rect.max_lat - y0, &mut t_min, &mut t_max) {
            return None;
        }

        if t_min > t_max {
            return None;
        }
        Some(Segment::new(self.interpolate(t_min), self.interpolate(t_max)))
    }
}

fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments() {
        let s1 = Segment::new(Geod::new_2d(0.0, 0.0), Geod::new_2d(2.0, 2.0));
        let s2 = Segment::new(Geod::new_2d(0.0, 2.0), Geod::new_2d(2.0, 0.0));
        match s1.intersect(&s2, 1e-9) {
            SegmentRelation::Crossing(p) => {
                approx::assert_abs_diff_eq!(p.lon, 1.0, epsilon = 1e-9);
                approx::assert_abs_diff_eq!(p.lat, 1.0, epsilon = 1e-9);
            }
            other => panic!("expected Crossing, got {other:?}"),
        }
    }

    #[test]
    fn touching_segments() {
        let s1 = Segment::new(Geod::new_2d(0.0, 0.0), Geod::new_2d(1.0, 0.0));
        let s2 = Segment::new(Geod::new_2d(1.0, 0.0), Geod::new_2d(1.0, 1.0));
        assert!(matches!(s1.intersect(&s2, 1e-9), SegmentRelation::Touching(_)));
    }

    #[test]
    fn colinear_overlap() {
        let s1 = Segment::new(Geod::new_2d(0.0, 0.0), Geod::new_2d(2.0, 0.0));
        let s2 = Segment::new(Geod::new_2d(1.0, 0.0), Geod::new_2d(3.0, 0.0));
        match s1.intersect(&s2, 1e-9) {
            SegmentRelation::ColinearOverlap(p, q) => {
                approx::assert_abs_diff_eq!(p.lon, 1.0, epsilon = 1e-6);
                approx::assert_abs_diff_eq!(q.lon, 2.0, epsilon = 1e-6);
            }
            other => panic!("expected ColinearOverlap, got {other:?}"),
        }
    }

    #[test]
    fn parallel_non_overlapping() {
        let s1 = Segment::new(Geod::new_2d(0.0, 0.0), Geod::new_2d(1.0, 0.0));
        let s2 = Segment::new(Geod::new_2d(0.0, 1.0), Geod::new_2d(1.0, 1.0));
        assert_eq!(s1.intersect(&s2, 1e-9), SegmentRelation::None);
    }

    #[test]
    fn rect_clip() {
        let s = Segment::new(Geod::new_2d(-1.0, 0.5), Geod::new_2d(2.0, 0.5));
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        let clipped = s.intersect_rect(&rect).expect("should clip");
        approx::assert_abs_diff_eq!(clipped.a.lon, 0.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(clipped.b.lon, 1.0, epsilon = 1e-9);
    }
}
