use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tg_geom::Geod;

/// Per-node bookkeeping the elevation pass and T-junction eliminator
/// consult: whether a node's elevation has already been fixed (by
/// `AddColinearNodes`'s 3-D-preserving variant), whether it sits on a
/// polygon boundary, and whether it sits strictly in a contour's interior.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeFlags {
    pub fixed_elevation: bool,
    pub on_boundary: bool,
    pub on_interior_of_contour: bool,
}

#[derive(Debug, Clone, Copy)]
struct NodeEntry {
    id: u64,
    lon: f64,
    lat: f64,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lon, self.lat])
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.lon - point[0];
        let dy = self.lat - point[1];
        dx * dx + dy * dy
    }
}

/// Content-addressed store assigning stable integer ids to `Geod`s within
/// an ε-tolerance, per §3/§4.G. The first insertion of a given location
/// wins as the canonical stored position; later insertions within ε return
/// the existing id.
#[derive(Debug)]
pub struct UniqueNodeSet {
    eps: f64,
    tree: RTree<NodeEntry>,
    geods: Vec<Geod>,
    flags: Vec<NodeFlags>,
}

impl UniqueNodeSet {
    pub fn new(eps: f64) -> Self {
        UniqueNodeSet {
            eps,
            tree: RTree::new(),
            geods: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.geods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geods.is_empty()
    }

    /// Inserts `g`, returning the id of an existing entry within ε if one
    /// exists, else assigning and returning the next id.
    pub fn insert(&mut self, g: Geod) -> u64 {
        let query = [g.lon, g.lat];
        if let Some(existing) = self
            .tree
            .locate_within_distance(query, self.eps * self.eps)
            .next()
        {
            return existing.id;
        }
        let id = self.geods.len() as u64;
        self.tree.insert(NodeEntry {
            id,
            lon: g.lon,
            lat: g.lat,
        });
        self.geods.push(g);
        self.flags.push(NodeFlags::default());
        id
    }

    pub fn get(&self, id: u64) -> Option<&Geod> {
        self.geods.get(id as usize)
    }

    /// Overwrites the elevation of an existing node in place. The node's
    /// 2-D position and the `rstar` index it lives in are untouched.
    pub fn set_elevation(&mut self, id: u64, elev: f64) {
        if let Some(g) = self.geods.get_mut(id as usize) {
            g.elev = elev;
        }
    }

    pub fn flags(&self, id: u64) -> Option<NodeFlags> {
        self.flags.get(id as usize).copied()
    }

    pub fn flags_mut(&mut self, id: u64) -> Option<&mut NodeFlags> {
        self.flags.get_mut(id as usize)
    }

    /// Looks up the id of an existing entry within ε without inserting.
    pub fn find(&self, g: &Geod) -> Option<u64> {
        let query = [g.lon, g.lat];
        self.tree
            .locate_within_distance(query, self.eps * self.eps)
            .next()
            .map(|e| e.id)
    }

    /// All geodetic positions falling within `rect`, expanded by ε, paired
    /// with their ids. Used by the triangulator to gather Steiner points.
    pub fn within_rect(&self, rect: &tg_geom::Rect) -> Vec<(u64, Geod)> {
        let envelope = AABB::from_corners(
            [rect.min_lon - self.eps, rect.min_lat - self.eps],
            [rect.max_lon + self.eps, rect.max_lat + self.eps],
        );
        self.tree
            .locate_in_envelope(&envelope)
            .map(|e| (e.id, self.geods[e.id as usize]))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Geod)> {
        self.geods.iter().enumerate().map(|(i, g)| (i as u64, g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_dedupes_within_epsilon() {
        let mut set = UniqueNodeSet::new(1e-6);
        let a = set.insert(Geod::new_2d(1.0, 2.0));
        let b = set.insert(Geod::new_2d(1.0 + 1e-8, 2.0));
        assert_eq!(a, b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn insert_separates_beyond_epsilon() {
        let mut set = UniqueNodeSet::new(1e-9);
        let a = set.insert(Geod::new_2d(1.0, 2.0));
        let b = set.insert(Geod::new_2d(1.0 + 1e-5, 2.0));
        assert_ne!(a, b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn find_does_not_mutate() {
        let mut set = UniqueNodeSet::new(1e-6);
        let id = set.insert(Geod::new_2d(3.0, 4.0));
        assert_eq!(set.find(&Geod::new_2d(3.0, 4.0)), Some(id));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn within_rect_finds_contained_points() {
        let mut set = UniqueNodeSet::new(1e-9);
        set.insert(Geod::new_2d(0.5, 0.5));
        set.insert(Geod::new_2d(5.0, 5.0));
        let rect = tg_geom::Rect::new(0.0, 0.0, 1.0, 1.0);
        let found = set.within_rect(&rect);
        assert_eq!(found.len(), 1);
    }
}
