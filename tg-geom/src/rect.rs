use crate::Geod;

/// An axis-aligned lon/lat bounding rectangle, `min` ≤ `max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Rect {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        debug_assert!(min_lon <= max_lon && min_lat <= max_lat);
        Rect {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Geod>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Rect::new(first.lon, first.lat, first.lon, first.lat);
        for p in iter {
            rect.expand_to_include(p);
        }
        Some(rect)
    }

    pub fn expand_to_include(&mut self, p: &Geod) {
        self.min_lon = self.min_lon.min(p.lon);
        self.min_lat = self.min_lat.min(p.lat);
        self.max_lon = self.max_lon.max(p.lon);
        self.max_lat = self.max_lat.max(p.lat);
    }

    pub fn merge(&self, other: &Rect) -> Rect {
        Rect::new(
            self.min_lon.min(other.min_lon),
            self.min_lat.min(other.min_lat),
            self.max_lon.max(other.max_lon),
            self.max_lat.max(other.max_lat),
        )
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// True if `p` falls within the rectangle, inclusive of the boundary
    /// within `eps`.
    pub fn contains_point(&self, p: &Geod, eps: f64) -> bool {
        p.lon >= self.min_lon - eps
            && p.lon <= self.max_lon + eps
            && p.lat >= self.min_lat - eps
            && p.lat <= self.max_lat + eps
    }

    /// True if the two rectangles overlap (touching at the boundary counts)
    /// within `eps`.
    pub fn intersects(&self, other: &Rect, eps: f64) -> bool {
        self.min_lon <= other.max_lon + eps
            && self.max_lon >= other.min_lon - eps
            && self.min_lat <= other.max_lat + eps
            && self.max_lat >= other.min_lat - eps
    }

    /// The overlapping sub-rectangle, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min_lon = self.min_lon.max(other.min_lon);
        let min_lat = self.min_lat.max(other.min_lat);
        let max_lon = self.max_lon.min(other.max_lon);
        let max_lat = self.max_lat.min(other.max_lat);
        if min_lon <= max_lon && min_lat <= max_lat {
            Some(Rect::new(min_lon, min_lat, max_lon, max_lat))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersects_touching_rects() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(1.0, 0.0, 2.0, 1.0);
        assert!(a.intersects(&b, 1e-9));
        assert_eq!(a.intersection(&b), Some(Rect::new(1.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn disjoint_rects_have_no_intersection() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(2.0, 2.0, 3.0, 3.0);
        assert!(!a.intersects(&b, 1e-9));
        assert_eq!(a.intersection(&b), None);
    }
}
