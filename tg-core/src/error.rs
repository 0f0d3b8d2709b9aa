use thiserror::Error;

/// Errors from the planar clipper bridge (Boolean ops, offset/expand).
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("boolean op produced {found} non-hole contours, expected at most 1")]
    UnexpectedContourCount { found: usize },
    #[error("Expand produced {found} contours, expected exactly 1")]
    ExpandNotSinglePolygon { found: usize },
    #[error("operand has no usable rings")]
    EmptyOperand,
}

/// Errors from the constrained-Delaunay triangulator.
#[derive(Debug, Error)]
pub enum TriangulationError {
    #[error("underlying triangulation engine rejected the input: {0}")]
    EngineError(String),
    #[error("a constraint edge could not be inserted without crossing another constraint")]
    ConstraintFailure,
    #[error("triangulator emitted a vertex not present in the tile's unique-node set")]
    VertexNotInNodeSet,
}

/// Errors from the road-graph intersection generator.
#[derive(Debug, Error)]
pub enum RoadGraphError {
    #[error("edge {edge_id} exhausted multi-segment resolution after {iterations} iterations")]
    ResolutionExhausted { edge_id: u64, iterations: u32 },
    #[error("node {node_id} has degree 0 after phase {phase}")]
    OrphanedNode { node_id: u64, phase: &'static str },
}

/// Errors from tile I/O.
#[derive(Debug, Error)]
pub enum TileIoError {
    #[error("I/O error reading/writing tile: {0}")]
    Io(#[from] std::io::Error),
    #[error("tile data truncated: expected at least {expected} bytes, had {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("tile format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Invariant violations that abort the process per §7 rather than being
/// recovered at tile scope: these indicate the node-set/triangulator
/// contract itself was broken, not a bad input polygon.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("unique-node-set id {id} is out of range (set has {len} entries)")]
    NodeIdOutOfRange { id: u64, len: usize },
    #[error("triangulator emitted vertex id {id} absent from the tile's unique-node set")]
    UnknownTriangleVertex { id: u64 },
}
