//! Elevation lookup seam, per §6: a pure callable, never invoked for nodes
//! the pipeline has already fixed (see [`crate::node_set::NodeFlags`]).

use tg_geom::Geod;

pub trait ElevationCallback {
    fn elevation_m(&self, g: &Geod) -> f64;
}

impl<F> ElevationCallback for F
where
    F: Fn(&Geod) -> f64,
{
    fn elevation_m(&self, g: &Geod) -> f64 {
        self(g)
    }
}

/// Assigns elevation to every node in `node_set` by calling `callback`,
/// except nodes flagged `fixed_elevation` (set by `AddColinearNodes`'s
/// 3-D-preserving variant), whose elevation is left untouched.
pub fn assign_elevations(node_set: &mut crate::node_set::UniqueNodeSet, callback: &dyn ElevationCallback) {
    let ids: Vec<u64> = node_set.iter().map(|(id, _)| id).collect();
    for id in ids {
        let flags = node_set.flags(id).unwrap_or_default();
        if flags.fixed_elevation {
            continue;
        }
        if let Some(g) = node_set.get(id).copied() {
            let elev = callback.elevation_m(&g);
            node_set.set_elevation(id, elev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_set::UniqueNodeSet;

    #[test]
    fn assigns_elevation_via_callback() {
        let mut set = UniqueNodeSet::new(1e-9);
        let id = set.insert(Geod::new_2d(1.0, 1.0));
        assign_elevations(&mut set, &|_g: &Geod| 42.0);
        assert_eq!(set.get(id).unwrap().elev, 42.0);
    }

    #[test]
    fn skips_fixed_elevation_nodes() {
        let mut set = UniqueNodeSet::new(1e-9);
        let id = set.insert(Geod::new(1.0, 1.0, 7.0));
        set.flags_mut(id).unwrap().fixed_elevation = true;
        assign_elevations(&mut set, &|_g: &Geod| 42.0);
        assert_eq!(set.get(id).unwrap().elev, 7.0);
    }
}
