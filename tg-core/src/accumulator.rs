//! Running union of everything claimed so far in a tile, per §4.D.

use log::warn;
use tg_geom::{epsilon, Geod, Polygon};

use crate::bool_ops;

/// A multipolygon-like running union, built incrementally via
/// [`Accumulator::diff_and_add`] (painter's-algorithm priority: later
/// claims lose to earlier ones).
#[derive(Debug, Default)]
pub struct Accumulator {
    pieces: Vec<Polygon>,
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator { pieces: Vec::new() }
    }

    pub fn current(&self) -> &[Polygon] {
        &self.pieces
    }

    fn overlaps_any_piece(&self, p: &Polygon) -> bool {
        let Some(rect) = p.bounding_rect() else {
            return false;
        };
        self.pieces
            .iter()
            .filter_map(|q| q.bounding_rect())
            .any(|qr| qr.intersects(&rect, epsilon::EPS_2D))
    }

    /// `p' = p \ union`, then `union' = union ∪ p`. If the clipper returns
    /// an empty residual, `p` is entirely subsumed and is dropped — the
    /// caller receives an empty `Vec`.
    pub fn diff_and_add(&mut self, p: &Polygon, next_id: &mut dyn FnMut() -> u64) -> Vec<Polygon> {
        let mut residual = vec![p.clone()];
        for existing in &self.pieces {
            if residual.is_empty() {
                break;
            }
            residual = residual
                .iter()
                .flat_map(|r| bool_ops::difference(r, existing, next_id))
                .collect();
        }

        if residual.is_empty() {
            warn!(
                "diff_and_add: polygon {} entirely subsumed by accumulator, dropping",
                p.id
            );
        } else {
            let mut all_nodes: Vec<Geod> = Vec::new();
            for piece in &self.pieces {
                for c in &piece.contours {
                    all_nodes.extend_from_slice(&c.nodes);
                }
            }
            for c in &p.contours {
                all_nodes.extend_from_slice(&c.nodes);
            }
            for r in &mut residual {
                for c in &mut r.contours {
                    c.add_colinear_nodes(
                        &all_nodes,
                        epsilon::COLINEAR_2D_BBOX_EPS,
                        epsilon::COLINEAR_2D_SLOPE_EPS,
                    );
                }
            }
        }

        self.add(p, next_id);
        residual
    }

    /// Unions `p` into the running total, consolidating with any existing
    /// piece whose bounding rect overlaps it.
    fn add(&mut self, p: &Polygon, next_id: &mut dyn FnMut() -> u64) {
        if !self.overlaps_any_piece(p) {
            self.pieces.push(p.clone());
            return;
        }
        let mut untouched = Vec::with_capacity(self.pieces.len());
        let mut merged = p.clone();
        for existing in self.pieces.drain(..) {
            let Some(er) = existing.bounding_rect() else {
                untouched.push(existing);
                continue;
            };
            let Some(mr) = merged.bounding_rect() else {
                untouched.push(existing);
                continue;
            };
            if er.intersects(&mr, epsilon::EPS_2D) {
                let mut unioned = bool_ops::union(&merged, &existing, next_id);
                if unioned.len() == 1 {
                    merged = unioned.pop().unwrap();
                } else {
                    untouched.push(existing);
                    untouched.extend(unioned);
                }
            } else {
                untouched.push(existing);
            }
        }
        untouched.push(merged);
        self.pieces = untouched;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_geom::Contour;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64, id: u64) -> Polygon {
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
            id,
        )
    }

    #[test]
    fn second_claim_yields_l_shape_residual() {
        let mut acc = Accumulator::new();
        let mut id = 0u64;
        let mut next = move || {
            id += 1;
            id
        };
        let a = square(0.0, 0.0, 2.0, 2.0, next());
        let b = square(1.0, 1.0, 3.0, 3.0, next());

        let ra = acc.diff_and_add(&a, &mut next);
        assert_eq!(ra.len(), 1);
        approx::assert_abs_diff_eq!(ra[0].net_area(), 4.0, epsilon = 1e-9);

        let rb = acc.diff_and_add(&b, &mut next);
        assert_eq!(rb.len(), 1);
        approx::assert_abs_diff_eq!(rb[0].net_area(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn identical_claim_is_dropped() {
        crate::init_logging();
        let mut acc = Accumulator::new();
        let mut id = 0u64;
        let mut next = move || {
            id += 1;
            id
        };
        let a = square(0.0, 0.0, 1.0, 1.0, next());
        acc.diff_and_add(&a, &mut next);
        let again = acc.diff_and_add(&a, &mut next);
        assert!(again.is_empty());
    }
}
