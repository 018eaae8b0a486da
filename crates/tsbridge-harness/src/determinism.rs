//! Repeat-run determinism check.
//!
//! Each case is run `runs` times; the SHA-256 digest of every result frame
//! must be identical across runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::fixtures::FixtureSet;
use crate::runner::Boundary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDigest {
    pub family: String,
    pub case_name: String,
    /// Digest of the first run's frame.
    pub sha256: String,
    /// Number of distinct digests seen; 1 when deterministic.
    pub distinct: usize,
    /// Set when the boundary call itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseDigest {
    #[must_use]
    pub fn stable(&self) -> bool {
        self.error.is_none() && self.distinct == 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismReport {
    pub runs: usize,
    pub cases: Vec<CaseDigest>,
}

impl DeterminismReport {
    #[must_use]
    pub fn unstable(&self) -> Vec<&CaseDigest> {
        self.cases.iter().filter(|c| !c.stable()).collect()
    }

    #[must_use]
    pub fn all_stable(&self) -> bool {
        self.cases.iter().all(CaseDigest::stable)
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Run every case of every set `runs` times.
#[must_use]
pub fn check_determinism(sets: &[FixtureSet], runs: usize) -> DeterminismReport {
    let boundary = Boundary::default();
    let runs = runs.max(1);
    let mut cases = Vec::new();
    for set in sets {
        for case in &set.cases {
            let mut digests: Vec<String> = Vec::with_capacity(runs);
            let mut error = None;
            for _ in 0..runs {
                match boundary.frame(case.engine, case.source_bytes()) {
                    Ok(frame) => digests.push(sha256_hex(&frame)),
                    Err(err) => {
                        error = Some(err);
                        break;
                    }
                }
            }
            let sha256 = digests.first().cloned().unwrap_or_default();
            digests.sort();
            digests.dedup();
            cases.push(CaseDigest {
                family: set.family.clone(),
                case_name: case.name.clone(),
                sha256,
                distinct: digests.len(),
                error,
            });
        }
    }
    DeterminismReport { runs, cases }
}
