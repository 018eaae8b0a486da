//! Counter snapshots for hosts and test suites.
//!
//! Leak and double-release checks compare two snapshots taken at quiescent
//! points: `live` must return to its starting value and `double_releases`
//! must not move.

use std::ffi::c_int;

use tsbridge_membrane::metrics::call_metrics;

use crate::membrane_state::arena;

/// Version of the exported protocol; bumped on any layout or code change.
pub const TSBRIDGE_ABI_VERSION: u32 = 1;

/// Process-wide boundary counters.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TsbridgeStats {
    /// Result buffers issued.
    pub allocations: u64,
    /// Result buffers released.
    pub releases: u64,
    /// Result buffers currently owned by the host.
    pub live: u64,
    pub double_releases: u64,
    pub foreign_releases: u64,
    /// Releases that found the trailing canary overwritten.
    pub canary_failures: u64,
    /// Result buffers that could not be allocated (null returns).
    pub allocation_failures: u64,
    /// Transpile calls, including ones rejected during decoding.
    pub calls: u64,
    /// Engine panics and contract violations converted into failures.
    pub engine_faults: u64,
}

impl TsbridgeStats {
    /// Current counter values.
    #[must_use]
    pub fn capture() -> Self {
        let arena_snap = arena().metrics();
        let calls = call_metrics().snapshot();
        Self {
            allocations: arena_snap.allocations,
            releases: arena_snap.releases,
            live: arena().live_count() as u64,
            double_releases: arena_snap.double_releases,
            foreign_releases: arena_snap.foreign_releases,
            canary_failures: arena_snap.canary_failures,
            allocation_failures: arena_snap.allocation_failures,
            calls: calls.calls,
            engine_faults: calls.engine_faults,
        }
    }
}

abi_fn! {
    /// Fill `out` with the current counters. Returns 0, or -1 if `out` is null.
    fn tsbridge_stats(out: *mut TsbridgeStats) -> c_int, on_unwind: -1;
    {
        match out.as_mut() {
            Some(out) => {
                *out = TsbridgeStats::capture();
                0
            }
            None => -1,
        }
    }
}

abi_fn! {
    /// Protocol version implemented by this library.
    fn tsbridge_abi_version() -> u32, on_unwind: TSBRIDGE_ABI_VERSION;
    {
        TSBRIDGE_ABI_VERSION
    }
}
