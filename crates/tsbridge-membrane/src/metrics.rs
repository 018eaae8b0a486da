//! Atomic counters for boundary observability.
//!
//! All counters use relaxed ordering. They are diagnostic, and the leak and
//! double-release checks in the test suites read them at quiescent points.

use std::sync::atomic::{AtomicU64, Ordering};

fn inc(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn get(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

/// Counters owned by one [`crate::ResultArena`].
#[derive(Debug)]
pub struct ArenaMetrics {
    /// Result buffers handed to the host.
    pub allocations: AtomicU64,
    /// Allocation attempts that failed (layout overflow or allocator refusal).
    pub allocation_failures: AtomicU64,
    /// Releases accepted.
    pub releases: AtomicU64,
    /// Releases of a buffer that had already been released.
    pub double_releases: AtomicU64,
    /// Releases of pointers this arena never issued.
    pub foreign_releases: AtomicU64,
    /// Releases of a null handle.
    pub null_releases: AtomicU64,
    /// Accepted releases whose trailing canary had been overwritten.
    pub canary_failures: AtomicU64,
    /// Quarantined buffers whose memory went back to the allocator.
    pub drained: AtomicU64,
}

impl ArenaMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            allocation_failures: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            double_releases: AtomicU64::new(0),
            foreign_releases: AtomicU64::new(0),
            null_releases: AtomicU64::new(0),
            canary_failures: AtomicU64::new(0),
            drained: AtomicU64::new(0),
        }
    }

    pub fn inc(counter: &AtomicU64) {
        inc(counter);
    }

    #[must_use]
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            allocations: get(&self.allocations),
            allocation_failures: get(&self.allocation_failures),
            releases: get(&self.releases),
            double_releases: get(&self.double_releases),
            foreign_releases: get(&self.foreign_releases),
            null_releases: get(&self.null_releases),
            canary_failures: get(&self.canary_failures),
            drained: get(&self.drained),
        }
    }
}

impl Default for ArenaMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ArenaMetrics`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArenaSnapshot {
    pub allocations: u64,
    pub allocation_failures: u64,
    pub releases: u64,
    pub double_releases: u64,
    pub foreign_releases: u64,
    pub null_releases: u64,
    pub canary_failures: u64,
    pub drained: u64,
}

impl ArenaSnapshot {
    /// Buffers issued and not yet released.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.allocations.saturating_sub(self.releases)
    }

    /// Counter movement since an earlier snapshot.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            allocations: self.allocations - earlier.allocations,
            allocation_failures: self.allocation_failures - earlier.allocation_failures,
            releases: self.releases - earlier.releases,
            double_releases: self.double_releases - earlier.double_releases,
            foreign_releases: self.foreign_releases - earlier.foreign_releases,
            null_releases: self.null_releases - earlier.null_releases,
            canary_failures: self.canary_failures - earlier.canary_failures,
            drained: self.drained - earlier.drained,
        }
    }
}

/// Per-call outcome counters for the transpile pipeline.
#[derive(Debug)]
pub struct CallMetrics {
    pub calls: AtomicU64,
    pub successes: AtomicU64,
    pub encoding_failures: AtomicU64,
    pub transpile_failures: AtomicU64,
    /// Engine panics converted into failures.
    pub engine_faults: AtomicU64,
    /// Calls that went through the serialization lock.
    pub serialized_calls: AtomicU64,
}

impl CallMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            encoding_failures: AtomicU64::new(0),
            transpile_failures: AtomicU64::new(0),
            engine_faults: AtomicU64::new(0),
            serialized_calls: AtomicU64::new(0),
        }
    }

    pub fn inc(counter: &AtomicU64) {
        inc(counter);
    }

    #[must_use]
    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            calls: get(&self.calls),
            successes: get(&self.successes),
            encoding_failures: get(&self.encoding_failures),
            transpile_failures: get(&self.transpile_failures),
            engine_faults: get(&self.engine_faults),
            serialized_calls: get(&self.serialized_calls),
        }
    }
}

impl Default for CallMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`CallMetrics`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallSnapshot {
    pub calls: u64,
    pub successes: u64,
    pub encoding_failures: u64,
    pub transpile_failures: u64,
    pub engine_faults: u64,
    pub serialized_calls: u64,
}

static CALL_METRICS: CallMetrics = CallMetrics::new();

/// Process-wide call counters shared by every transpiler context.
#[must_use]
pub fn call_metrics() -> &'static CallMetrics {
    &CALL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_snapshot_tracks_outstanding() {
        let m = ArenaMetrics::new();
        ArenaMetrics::inc(&m.allocations);
        ArenaMetrics::inc(&m.allocations);
        ArenaMetrics::inc(&m.releases);
        let snap = m.snapshot();
        assert_eq!(snap.allocations, 2);
        assert_eq!(snap.outstanding(), 1);
    }

    #[test]
    fn since_reports_deltas() {
        let m = ArenaMetrics::new();
        ArenaMetrics::inc(&m.double_releases);
        let before = m.snapshot();
        ArenaMetrics::inc(&m.double_releases);
        ArenaMetrics::inc(&m.foreign_releases);
        let delta = m.snapshot().since(&before);
        assert_eq!(delta.double_releases, 1);
        assert_eq!(delta.foreign_releases, 1);
        assert_eq!(delta.allocations, 0);
    }

    #[test]
    fn call_metrics_snapshot() {
        let m = CallMetrics::new();
        CallMetrics::inc(&m.calls);
        CallMetrics::inc(&m.engine_faults);
        let snap = m.snapshot();
        assert_eq!(snap.calls, 1);
        assert_eq!(snap.engine_faults, 1);
        assert_eq!(snap.successes, 0);
    }
}
