use std::fmt;

/// Errors raised by geometric operations in this crate. Mirrors
/// `geo_types::Error`'s manual `Display`/`Error` impl rather than a derive
/// macro, since these variants are few and the messages are hand-tuned.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// A contour was given fewer than 3 nodes where a closed ring is required.
    TooFewNodes { have: usize },
    /// An operation needs a non-empty node list, or rect, and got none.
    EmptyGeometry,
    /// A coordinate fell outside the valid WGS-84 range (±180 lon, ±90 lat).
    CoordinateOutOfRange { lon: f64, lat: f64 },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::TooFewNodes { have } => {
                write!(f, "contour needs at least 3 nodes, has {have}")
            }
            ShapeError::EmptyGeometry => write!(f, "operation requires non-empty geometry"),
            ShapeError::CoordinateOutOfRange { lon, lat } => {
                write!(f, "coordinate ({lon}, {lat}) is outside the WGS-84 range")
            }
        }
    }
}

impl std::error::Error for ShapeError {}
