//! Verification harness for the tsbridge boundary.
//!
//! Everything here drives the exported entry points through
//! [`tsbridge::ResultHandle`], so each check crosses the same boundary a C
//! host would:
//! - Fixture verify: run JSON fixture cases and compare framed results
//! - Determinism: repeat every case and compare SHA-256 digests of the frames
//! - Stress: concurrent calls with per-call result checks and leak accounting
//! - Structured logs: canonical JSONL records for every run

#![forbid(unsafe_code)]

pub mod determinism;
pub mod diff;
pub mod error;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod stress;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet};
pub use report::VerifyReport;
pub use runner::TestRunner;
pub use verify::VerificationResult;
