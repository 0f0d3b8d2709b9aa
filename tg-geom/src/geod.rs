use std::fmt;

/// A geodetic position: longitude/latitude in decimal degrees plus elevation in meters.
///
/// `Geod` is the atom every other type in this crate is built from. Equality
/// via `PartialEq` is exact float equality; for the tolerant "same point"
/// comparison the pipeline actually uses, see [`Geod::eq_2d`]. Elevation is
/// carried through transformations but never consulted by 2-D identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geod {
    pub lon: f64,
    pub lat: f64,
    pub elev: f64,
}

impl Geod {
    pub fn new(lon: f64, lat: f64, elev: f64) -> Self {
        Geod { lon, lat, elev }
    }

    /// A surface point with no known elevation.
    pub fn new_2d(lon: f64, lat: f64) -> Self {
        Geod::new(lon, lat, 0.0)
    }

    /// True iff both coordinates are within `eps` degrees of `other`.
    ///
    /// This is the identity relation the unique-node set, dedup, and
    /// T-junction elimination all use; it intentionally ignores `elev`.
    pub fn eq_2d(&self, other: &Geod, eps: f64) -> bool {
        (self.lon - other.lon).abs() <= eps && (self.lat - other.lat).abs() <= eps
    }

    /// True if this point sits close enough to a pole that longitude becomes
    /// degenerate and edge-splitting in planar lon/lat should be skipped.
    pub fn near_pole(&self, eps: f64) -> bool {
        self.lat.abs() > 90.0 - eps
    }

    pub fn snapped(&self, step: f64) -> Geod {
        Geod::new(
            (self.lon / step).round() * step,
            (self.lat / step).round() * step,
            self.elev,
        )
    }
}

impl fmt::Display for Geod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.9}, {:.9}, {:.3}m)", self.lon, self.lat, self.elev)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Geod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.lon)?;
        tup.serialize_element(&self.lat)?;
        tup.serialize_element(&self.elev)?;
        tup.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_2d_ignores_elevation() {
        let a = Geod::new(1.0, 2.0, 0.0);
        let b = Geod::new(1.0, 2.0, 500.0);
        assert!(a.eq_2d(&b, crate::EPS_2D));
    }

    #[test]
    fn eq_2d_respects_tolerance() {
        let a = Geod::new(1.0, 2.0, 0.0);
        let b = Geod::new(1.0 + 1e-6, 2.0, 0.0);
        assert!(!a.eq_2d(&b, crate::EPS_2D));
        assert!(a.eq_2d(&b, 1e-5));
    }

    #[test]
    fn near_pole() {
        let p = Geod::new(0.0, 89.999_999_999_5, 0.0);
        assert!(p.near_pole(1e-9));
        assert!(!Geod::new(0.0, 45.0, 0.0).near_pole(1e-9));
    }
}
