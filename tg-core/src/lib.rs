//! Stateful terrain-tile algorithms built on `tg-geom`'s plain data model:
//! Boolean polygon algebra, the claim accumulator, the grid chopper, the
//! constrained-Delaunay triangulator, the road-graph intersection
//! generator, and per-tile landclass/serialization glue.

pub mod accumulator;
pub mod bool_ops;
pub mod chopper;
pub mod config;
mod ecef;
pub mod elevation;
pub mod error;
pub mod ids;
pub mod landclass;
pub mod node_set;
pub mod road_graph;
pub mod serialize;
pub mod texture;
pub mod triangulator;

pub use accumulator::Accumulator;
pub use config::PipelineConfig;
pub use error::{ClipError, InvariantViolation, RoadGraphError, TileIoError, TriangulationError};
pub use ids::PolygonIdSource;
pub use landclass::{AreaType, FinishedPolygon, LandclassBucket, TileState};
pub use node_set::{NodeFlags, UniqueNodeSet};
pub use road_graph::{run_pipeline, InputSegment, IntersectionNetwork, PipelineOutput};
pub use triangulator::TriangulationConfig;

/// Runs `process_one` over every tile id in parallel, each with its own
/// exclusively-owned [`TileState`] per §5's ownership rule — the outer,
/// one-task-per-tile parallelism is opt-in via this feature, mirroring the
/// teacher's own `multithreading` flag (`geo`'s
/// `multithreading = ["i_overlay/allow_multithreading", "dep:rayon"]`).
/// The single-tile pipeline itself stays synchronous regardless of this
/// feature.
#[cfg(feature = "multithreading")]
pub fn process_tiles_parallel<T, F>(tile_ids: &[T], process_one: F)
where
    T: Sync,
    F: Fn(&T) + Sync + Send,
{
    use rayon::prelude::*;
    tile_ids.par_iter().for_each(process_one);
}

/// Initializes `env_logger` for a test binary so `log::debug!`/`log::warn!`
/// call sites exercised by tests are visible when run with `--nocapture`.
/// `try_init` tolerates the many `#[test]` functions in this crate each
/// calling it.
#[cfg(test)]
pub(crate) fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "multithreading")]
    #[test]
    fn process_tiles_parallel_visits_every_tile() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let counter = AtomicUsize::new(0);
        let ids = [1, 2, 3, 4];
        super::process_tiles_parallel(&ids, |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(counter.load(Ordering::Relaxed), 4);
    }
}
