use crate::{epsilon, Geod, Rect, Segment, SegmentRelation};

/// A closed ring of nodes, oriented and flagged as an outer boundary or a
/// hole, per §3's contour model. The final node is implicitly connected
/// back to the first; nodes are never required to repeat the first point.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub nodes: Vec<Geod>,
    pub hole: bool,
    /// Tie-break rank used when two same-area-type contours overlap;
    /// higher wins. Defaults to 0 for contours with no external ranking.
    pub priority: i32,
}

impl Contour {
    pub fn new(nodes: Vec<Geod>, hole: bool) -> Self {
        Contour {
            nodes,
            hole,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Twice the signed planar area of the ring (shoelace formula), positive
    /// for CCW winding. Degenerate (fewer than 3 nodes) contours are zero.
    pub fn signed_area(&self) -> f64 {
        if self.nodes.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        let n = self.nodes.len();
        for i in 0..n {
            let p = &self.nodes[i];
            let q = &self.nodes[(i + 1) % n];
            sum += p.lon * q.lat - q.lon * p.lat;
        }
        sum / 2.0
    }

    pub fn is_cw(&self) -> bool {
        self.signed_area() < 0.0
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn reverse(&mut self) {
        self.nodes.reverse();
    }

    /// Rewrites winding so that outer boundaries are CCW and holes are CW,
    /// the convention the triangulator and the tile writer both assume.
    pub fn canonicalize_winding(&mut self) {
        let should_be_ccw = !self.hole;
        if should_be_ccw && self.is_cw() {
            self.reverse();
        } else if !should_be_ccw && self.is_ccw() {
            self.reverse();
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        Rect::from_points(self.nodes.iter())
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.nodes.len();
        (0..n).filter(move |_| n >= 2).map(move |i| {
            Segment::new(self.nodes[i], self.nodes[(i + 1) % n])
        })
    }

    /// Smallest interior angle in the ring, in degrees; `None` if fewer than
    /// 3 nodes.
    pub fn min_angle(&self) -> Option<f64> {
        let n = self.nodes.len();
        if n < 3 {
            return None;
        }
        let mut min = f64::MAX;
        for i in 0..n {
            let prev = &self.nodes[(i + n - 1) % n];
            let cur = &self.nodes[i];
            let next = &self.nodes[(i + 1) % n];
            let a = interior_angle_deg(prev, cur, next);
            if a < min {
                min = a;
            }
        }
        Some(min)
    }

    /// Drops consecutive duplicate nodes (2-D, within `eps`), including the
    /// wrap-around pair between the last and first node. Of each duplicate
    /// pair, the one with the higher elevation is kept.
    pub fn remove_dups(&mut self, eps: f64) {
        if self.nodes.len() < 2 {
            return;
        }
        let mut out: Vec<Geod> = Vec::with_capacity(self.nodes.len());
        for p in &self.nodes {
            match out.last_mut() {
                Some(last) if last.eq_2d(p, eps) => {
                    if p.elev > last.elev {
                        *last = *p;
                    }
                }
                _ => out.push(*p),
            }
        }
        if out.len() > 1 && out[0].eq_2d(&out[out.len() - 1], eps) {
            let wrap = out.pop().unwrap();
            if wrap.elev > out[0].elev {
                out[0] = wrap;
            }
        }
        self.nodes = out;
    }

    /// Removes nodes whose interior angle falls below
    /// [`epsilon::SPIKE_ANGLE_DEG`], repeatedly until none remain or the
    /// ring degenerates below a triangle.
    pub fn remove_spikes(&mut self) {
        loop {
            if self.nodes.len() < 3 {
                return;
            }
            let n = self.nodes.len();
            let spike = (0..n).find(|&i| {
                let prev = &self.nodes[(i + n - 1) % n];
                let cur = &self.nodes[i];
                let next = &self.nodes[(i + 1) % n];
                interior_angle_deg(prev, cur, next) < epsilon::SPIKE_ANGLE_DEG
            });
            match spike {
                Some(i) => {
                    self.nodes.remove(i);
                }
                None => return,
            }
        }
    }

    /// Inserts intermediate nodes so that no edge exceeds `max_m` meters,
    /// interpolating linearly in lon/lat (not along the geodesic) to match
    /// the source system's behavior. Edges touching a pole are emitted
    /// untouched, since longitude degenerates there and planar interpolation
    /// would produce nonsense intermediate points.
    pub fn split_long_edges(&mut self, max_m: f64) {
        if self.nodes.len() < 2 || max_m <= 0.0 {
            return;
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        let n = self.nodes.len();
        for i in 0..n {
            let a = self.nodes[i];
            let b = self.nodes[(i + 1) % n];
            out.push(a);
            if a.near_pole(epsilon::POLE_EPS_DEG) || b.near_pole(epsilon::POLE_EPS_DEG) {
                continue;
            }
            let seg = Segment::new(a, b);
            let len = seg.length_m();
            if len > max_m {
                let parts = (len / max_m).ceil() as usize;
                for k in 1..parts {
                    let t = k as f64 / parts as f64;
                    out.push(Geod::new(
                        a.lon + (b.lon - a.lon) * t,
                        a.lat + (b.lat - a.lat) * t,
                        a.elev + (b.elev - a.elev) * t,
                    ));
                }
            }
        }
        self.nodes = out;
    }

    pub fn snap(&mut self, step: f64) {
        for p in &mut self.nodes {
            *p = p.snapped(step);
        }
    }

    /// Splits a self-intersecting ring into simple sub-rings at each
    /// self-crossing, per the `RemoveCycles` operation. Inherits `hole`
    /// and `priority` on every output piece; callers that need nesting
    /// flags re-derived should follow up with [`Contour::is_inside`].
    pub fn remove_cycles(&self, eps: f64) -> Vec<Contour> {
        if self.nodes.len() < 3 {
            return vec![self.clone()];
        }
        let mut nodes = self.nodes.clone();
        let mut out = Vec::new();
        let mut guard = 0usize;
        'outer: loop {
            guard += 1;
            if guard > nodes.len() * nodes.len() + 16 {
                break;
            }
            let n = nodes.len();
            if n < 3 {
                break;
            }
            for i in 0..n {
                let a1 = nodes[i];
                let a2 = nodes[(i + 1) % n];
                for j in (i + 2)..n {
                    if i == 0 && j == n - 1 {
                        continue;
                    }
                    let b1 = nodes[j];
                    let b2 = nodes[(j + 1) % n];
                    let seg_a = Segment::new(a1, a2);
                    let seg_b = Segment::new(b1, b2);
                    if let SegmentRelation::Crossing(pt) = seg_a.intersect(&seg_b, eps) {
                        let mut loop_nodes = vec![pt];
                        loop_nodes.extend_from_slice(&nodes[i + 1..=j]);
                        loop_nodes.push(pt);
                        out.push(Contour {
                            nodes: loop_nodes,
                            hole: self.hole,
                            priority: self.priority,
                        });

                        let mut rest = Vec::with_capacity(n - (j - i) + 1);
                        rest.extend_from_slice(&nodes[..=i]);
                        rest.push(pt);
                        rest.extend_from_slice(&nodes[j + 1..]);
                        nodes = rest;
                        continue 'outer;
                    }
                }
            }
            break;
        }
        out.push(Contour {
            nodes,
            hole: self.hole,
            priority: self.priority,
        });
        out
    }

    /// Point-in-polygon crossing-number test: true iff every vertex of
    /// `self` lies within or on the boundary of `other`. This is the
    /// semantics this crate adopts for `IsInside`, in place of the original
    /// clipper-difference approximation it was distilled from — see
    /// `DESIGN.md`.
    pub fn is_inside(&self, other: &Contour, eps: f64) -> bool {
        self.nodes.iter().all(|p| other.contains_point(p, eps))
    }

    /// Even-odd crossing-number point-in-polygon test, including boundary
    /// membership within `eps`.
    pub fn contains_point(&self, p: &Geod, eps: f64) -> bool {
        let n = self.nodes.len();
        if n < 3 {
            return false;
        }
        for seg in self.segments() {
            if point_on_segment(&seg, p, eps) {
                return true;
            }
        }
        let mut inside = false;
        for i in 0..n {
            let a = &self.nodes[i];
            let b = &self.nodes[(i + 1) % n];
            let crosses = (a.lat > p.lat) != (b.lat > p.lat);
            if crosses {
                let x_at_p_lat = (b.lon - a.lon) * (p.lat - a.lat) / (b.lat - a.lat) + a.lon;
                if p.lon < x_at_p_lat {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Inserts nodes from `candidates` onto any edge of this ring they fall
    /// colinear with, within the supplied bbox/slope tolerances. Used to
    /// stitch T-junctions between adjoining tiles/contours before a Boolean
    /// merge, per §4.B.
    pub fn add_colinear_nodes(&mut self, candidates: &[Geod], bbox_eps: f64, slope_eps: f64) {
        if self.nodes.len() < 2 {
            return;
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        let n = self.nodes.len();
        for i in 0..n {
            let a = self.nodes[i];
            let b = self.nodes[(i + 1) % n];
            out.push(a);
            let seg = Segment::new(a, b);
            let rect = seg.bounding_rect();
            let mut inserted: Vec<(f64, Geod)> = Vec::new();
            for cand in candidates {
                if a.eq_2d(cand, bbox_eps) || b.eq_2d(cand, bbox_eps) {
                    continue;
                }
                if !rect.contains_point(cand, bbox_eps) {
                    continue;
                }
                if seg.distance_to_line(cand) <= slope_eps {
                    let t = seg.project_param(cand);
                    if t > 0.0 && t < 1.0 {
                        inserted.push((t, *cand));
                    }
                }
            }
            inserted.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap());
            for (_, p) in inserted {
                out.push(p);
            }
        }
        self.nodes = out;
    }

    /// Elevation-preserving variant of [`Contour::add_colinear_nodes`]: each
    /// inserted node is moved exactly onto this ring's edge (rather than
    /// left at the candidate's own position) and its elevation is linearly
    /// interpolated between the edge's two endpoints, per §4.B. Returns the
    /// inserted nodes in stitch order, so a caller that owns a node set can
    /// flag them `fixed_elevation` before the elevation pass runs.
    pub fn add_colinear_nodes_3d(&mut self, candidates: &[Geod], bbox_eps: f64, slope_eps: f64) -> Vec<Geod> {
        if self.nodes.len() < 2 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stitched = Vec::new();
        let n = self.nodes.len();
        for i in 0..n {
            let a = self.nodes[i];
            let b = self.nodes[(i + 1) % n];
            out.push(a);
            let seg = Segment::new(a, b);
            let rect = seg.bounding_rect();
            let mut inserted: Vec<(f64, Geod)> = Vec::new();
            for cand in candidates {
                if a.eq_2d(cand, bbox_eps) || b.eq_2d(cand, bbox_eps) {
                    continue;
                }
                if !rect.contains_point(cand, bbox_eps) {
                    continue;
                }
                if seg.distance_to_line(cand) <= slope_eps {
                    let t = seg.project_param(cand);
                    if t > 0.0 && t < 1.0 {
                        let onto_edge = Geod::new(
                            a.lon + (b.lon - a.lon) * t,
                            a.lat + (b.lat - a.lat) * t,
                            a.elev + (b.elev - a.elev) * t,
                        );
                        inserted.push((t, onto_edge));
                    }
                }
            }
            inserted.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap());
            for (_, p) in inserted {
                out.push(p);
                stitched.push(p);
            }
        }
        self.nodes = out;
        stitched
    }
}

fn point_on_segment(seg: &Segment, p: &Geod, eps: f64) -> bool {
    let rect = seg.bounding_rect();
    rect.contains_point(p, eps) && seg.distance_to_line(p) <= eps
}

fn interior_angle_deg(prev: &Geod, cur: &Geod, next: &Geod) -> f64 {
    let v1 = (prev.lon - cur.lon, prev.lat - cur.lat);
    let v2 = (next.lon - cur.lon, next.lat - cur.lat);
    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag = ((v1.0 * v1.0 + v1.1 * v1.1).sqrt()) * ((v2.0 * v2.0 + v2.1 * v2.1).sqrt());
    if mag <= f64::EPSILON {
        return 0.0;
    }
    (dot / mag).clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Contour {
        Contour::new(
            vec![
                Geod::new_2d(0.0, 0.0),
                Geod::new_2d(1.0, 0.0),
                Geod::new_2d(1.0, 1.0),
                Geod::new_2d(0.0, 1.0),
            ],
            false,
        )
    }

    #[test]
    fn square_area_and_winding() {
        let sq = square();
        approx::assert_abs_diff_eq!(sq.signed_area().abs(), 1.0, epsilon = 1e-12);
        assert!(sq.is_ccw());
    }

    #[test]
    fn canonicalize_flips_cw_outer() {
        let mut sq = square();
        sq.reverse();
        assert!(sq.is_cw());
        sq.canonicalize_winding();
        assert!(sq.is_ccw());
    }

    #[test]
    fn contains_point_inside_and_outside() {
        let sq = square();
        assert!(sq.contains_point(&Geod::new_2d(0.5, 0.5), 1e-9));
        assert!(!sq.contains_point(&Geod::new_2d(2.0, 2.0), 1e-9));
        assert!(sq.contains_point(&Geod::new_2d(0.0, 0.5), 1e-9));
    }

    #[test]
    fn remove_dups_collapses_repeats() {
        let mut c = Contour::new(
            vec![
                Geod::new_2d(0.0, 0.0),
                Geod::new_2d(0.0, 0.0),
                Geod::new_2d(1.0, 0.0),
                Geod::new_2d(1.0, 1.0),
            ],
            false,
        );
        c.remove_dups(1e-9);
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn remove_dups_keeps_higher_elevation() {
        let mut c = Contour::new(
            vec![
                Geod::new(0.0, 0.0, 5.0),
                Geod::new(0.0, 0.0, 50.0),
                Geod::new(1.0, 0.0, 0.0),
                Geod::new(1.0, 1.0, 0.0),
            ],
            false,
        );
        c.remove_dups(1e-9);
        assert_eq!(c.len(), 3);
        assert_eq!(c.nodes[0].elev, 50.0);
    }

    #[test]
    fn remove_dups_checks_wraparound_elevation() {
        let mut c = Contour::new(
            vec![
                Geod::new(0.0, 0.0, 5.0),
                Geod::new(1.0, 0.0, 0.0),
                Geod::new(1.0, 1.0, 0.0),
                Geod::new(0.0, 0.0, 50.0),
            ],
            false,
        );
        c.remove_dups(1e-9);
        assert_eq!(c.len(), 3);
        assert_eq!(c.nodes[0].elev, 50.0);
    }

    #[test]
    fn split_long_edges_skips_edges_touching_a_pole() {
        let mut c = Contour::new(
            vec![Geod::new_2d(0.0, 89.999_999_9), Geod::new_2d(90.0, 89.999_999_9), Geod::new_2d(90.0, 0.0)],
            false,
        );
        c.split_long_edges(1000.0);
        // The pole-adjacent edge (0->1) must stay unsplit: no node should
        // land strictly between its two endpoints' longitudes.
        let between_pole_edge = c
            .nodes
            .iter()
            .filter(|p| p.lat > 89.999_999_8 && p.lon > 0.0 && p.lon < 90.0)
            .count();
        assert_eq!(between_pole_edge, 0);
        // The far-from-pole edge (1->2) is free to split.
        assert!(c.nodes.iter().any(|p| p.lon == 90.0 && p.lat > 0.0 && p.lat < 89.999_999_9));
    }

    #[test]
    fn add_colinear_nodes_3d_interpolates_elevation_and_reports_inserted() {
        let mut c = Contour::new(
            vec![
                Geod::new(0.0, 0.0, 0.0),
                Geod::new(2.0, 0.0, 20.0),
                Geod::new(2.0, 2.0, 0.0),
                Geod::new(0.0, 2.0, 0.0),
            ],
            false,
        );
        let candidates = vec![Geod::new_2d(1.0, 0.0)];
        let inserted = c.add_colinear_nodes_3d(&candidates, 1e-6, 1e-6);
        assert_eq!(inserted.len(), 1);
        approx::assert_abs_diff_eq!(inserted[0].elev, 10.0, epsilon = 1e-9);
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn is_inside_nested_square() {
        let outer = square();
        let inner = Contour::new(
            vec![
                Geod::new_2d(0.25, 0.25),
                Geod::new_2d(0.75, 0.25),
                Geod::new_2d(0.75, 0.75),
                Geod::new_2d(0.25, 0.75),
            ],
            true,
        );
        assert!(inner.is_inside(&outer, 1e-9));
        assert!(!outer.is_inside(&inner, 1e-9));
    }
}
