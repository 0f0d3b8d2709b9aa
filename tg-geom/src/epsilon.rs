//! Tolerances used throughout the contour/polygon pipeline.
//!
//! These mirror the calibration the source system shipped with; §9 of the
//! specification flags the split between the 2-D- and 3-D-preserving
//! colinear-node epsilons as a deliberate, possibly-arbitrary choice that
//! later tuning should not silently "fix" away.

/// Two `Geod`s are 2-D-equal when both coordinates are within this many degrees.
pub const EPS_2D: f64 = 1e-9;

/// Default grid step for [`crate::Contour::snap`], in degrees.
pub const SNAP_STEP_DEG: f64 = 1e-7;

/// Interior angles below this (degrees) are spikes, per `RemoveSpikes`.
pub const SPIKE_ANGLE_DEG: f64 = 0.1;

/// `RemoveSlivers` min-angle threshold, in degrees.
pub const SLIVER_MIN_ANGLE_DEG: f64 = 10.0;

/// `RemoveSlivers` first area threshold (deg²), paired with the min-angle test.
pub const SLIVER_AREA_ANGLE_DEG2: f64 = 1e-9;

/// `RemoveSlivers` unconditional area threshold (deg²).
pub const SLIVER_AREA_DEG2: f64 = 1e-10;

/// `AddColinearNodes` bounding-box tolerance for the 2-D-preserving variant.
pub const COLINEAR_2D_BBOX_EPS: f64 = EPS_2D * 10.0;

/// `AddColinearNodes` slope-error tolerance for the 2-D-preserving variant.
pub const COLINEAR_2D_SLOPE_EPS: f64 = EPS_2D * 4.0;

/// `AddColinearNodes` bounding-box tolerance for the elevation-preserving variant.
pub const COLINEAR_3D_BBOX_EPS: f64 = EPS_2D * 20.0;

/// `AddColinearNodes` slope-error tolerance for the elevation-preserving variant.
pub const COLINEAR_3D_SLOPE_EPS: f64 = EPS_2D * 15.0;

/// Default tolerance for the `UniqueNodeSet` used by the intersection generator,
/// larger than [`EPS_2D`] because road endpoints are rarely bit-identical.
pub const ROAD_NODE_EPS_2D: f64 = 1e-6;

/// `SplitLongEdges` pole-proximity guard, in degrees of latitude from a
/// pole; see [`crate::Geod::near_pole`].
pub const POLE_EPS_DEG: f64 = 1e-6;
