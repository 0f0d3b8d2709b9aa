//! Process-wide tunables gathered into one struct, mirroring the teacher's
//! builder-style config structs (`SpadeTriangulationConfig`, `BufferStyle`).
//! The per-phase constants spec.md leaves as bare numbers live here with a
//! `Default` carrying its values, so a caller has one place to retune a run
//! rather than hunting through module constants.

use crate::triangulator::TriangulationConfig;

/// Tunables for a single intersection-generator run plus the tile
/// triangulator it feeds into.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fallback `v_repeat` used by Phase 6 when a `TextureInfoCallback`
    /// reports one `<= 0.0`.
    pub v_repeat_default: f64,
    /// Endpoint cap length as a multiple of the parent edge's width,
    /// per the Open Question decision in `DESIGN.md` (§4.F Phase 2).
    pub cap_length_factor: f64,
    /// Upper bound on Phase 5's split-and-retry loop.
    pub max_multi_segment_iterations: u32,
    /// Handed to `triangulator::triangulate` for every polygon this
    /// pipeline's output eventually feeds.
    pub triangulation: TriangulationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            v_repeat_default: 1.0,
            cap_length_factor: 0.5,
            max_multi_segment_iterations: 8,
            triangulation: TriangulationConfig::default(),
        }
    }
}
