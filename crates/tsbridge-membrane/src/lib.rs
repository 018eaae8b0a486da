//! Result-buffer ownership protocol for the tsbridge foreign boundary.
//!
//! Two allocators meet at the boundary: the host's and ours. Every buffer we
//! hand across is allocated here and must come back here to be released.
//! This crate owns that contract:
//!
//! - **Result arena** (`arena`): sharded registry of issued buffers with
//!   generation counters, a bounded quarantine and release classification
//! - **Fingerprints** (`fingerprint`): SipHash header + trailing canary per buffer
//! - **Buffer state** (`state`): `Live -> Quarantined -> Released`
//! - **Configuration** (`config`): runtime mode from `TSBRIDGE_MODE`
//! - **Metrics** (`metrics`): relaxed atomic counters for leak/double-release detection

#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod fingerprint;
pub mod metrics;
pub mod state;

pub use arena::{ArenaSlot, ReleaseResult, ResultArena};
pub use config::SafetyLevel;
pub use metrics::{ArenaMetrics, ArenaSnapshot, CallMetrics, CallSnapshot};
pub use state::BufferState;
