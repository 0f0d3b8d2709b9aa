use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide monotonic polygon id source, per §5/§9: a legitimate
/// process-wide resource, implemented as a single atomically-incremented
/// counter. The chopper-counter-file persistence this would normally be
/// seeded from is an external collaborator; callers that need persisted
/// ids across runs should call [`PolygonIdSource::seeded`].
#[derive(Debug)]
pub struct PolygonIdSource {
    next: AtomicU64,
}

impl PolygonIdSource {
    pub fn new() -> Self {
        PolygonIdSource {
            next: AtomicU64::new(1),
        }
    }

    pub fn seeded(start: u64) -> Self {
        PolygonIdSource {
            next: AtomicU64::new(start),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for PolygonIdSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let src = PolygonIdSource::new();
        let a = src.next_id();
        let b = src.next_id();
        assert!(b > a);
    }

    #[test]
    fn seeded_starts_at_given_value() {
        let src = PolygonIdSource::seeded(100);
        assert_eq!(src.next_id(), 100);
        assert_eq!(src.next_id(), 101);
    }
}
