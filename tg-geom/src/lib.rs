//! Geodetic primitives and the contour/polygon data model for terrain
//! scenery tiles.
//!
//! This crate carries no stateful engine dependencies (no Boolean clipper,
//! no triangulator) — it is the plain-data layer that `tg-core`'s
//! algorithms operate on, the way `geo-types` underlies `geo`.

mod contour;
mod epsilon;
mod error;
mod geod;
mod polygon;
mod rect;
mod segment;

pub use contour::Contour;
pub use epsilon::*;
pub use error::ShapeError;
pub use geod::Geod;
pub use polygon::{Polygon, TexMethod, TexParams, Tri};
pub use rect::Rect;
pub use segment::{Segment, SegmentRelation};
