//! Concurrent boundary stress.
//!
//! Worker threads issue calls with distinct inputs and check every result
//! against the output computed for that input alone. Boundary counters are
//! sampled before and after so leaks and double releases show up as deltas.

use std::thread;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tsbridge::TsbridgeStats;

use crate::error::HarnessError;
use crate::fixtures::EngineChoice;
use crate::runner::Boundary;

/// Inputs that do not depend on the worker, each with its expected frame.
const SHARED_CORPUS: &[(&str, &str)] = &[
    ("const x: number = 1;", "const x = 1;"),
    ("let y: string = 5;", "let y = 5;"),
    ("", ""),
    ("type ID = string | number;\nlet id: ID = 1;\n", "let id = 1;\n"),
    ("let ok = n as number < 10;", "let ok = n < 10;"),
    ("x!.foo();\n", "x.foo();\n"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub threads: usize,
    pub iterations: usize,
    pub calls: u64,
    pub mismatches: u64,
    /// First few mismatch descriptions.
    pub samples: Vec<String>,
    pub allocations: u64,
    pub releases: u64,
    pub double_releases: u64,
    /// Buffers still live after the run that were not live before.
    pub leaked: u64,
    pub duration_ms: u64,
}

impl StressReport {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.mismatches == 0 && self.double_releases == 0 && self.leaked == 0
    }
}

fn unique_case(thread_id: usize, i: usize) -> (String, String) {
    (
        format!("const v{thread_id}_{i}: number = {i};"),
        format!("const v{thread_id}_{i} = {i};"),
    )
}

fn worker(thread_id: usize, iterations: usize) -> (u64, u64, Vec<String>) {
    let boundary = Boundary::default();
    let mut calls = 0;
    let mut mismatches = 0;
    let mut samples = Vec::new();
    for i in 0..iterations {
        let (source, want) = if i % 2 == 0 {
            unique_case(thread_id, i)
        } else {
            let (s, w) = SHARED_CORPUS[(thread_id + i) % SHARED_CORPUS.len()];
            (s.to_owned(), w.to_owned())
        };
        calls += 1;
        let mut expected = vec![0u8];
        expected.extend_from_slice(want.as_bytes());
        expected.push(0);
        match boundary.frame(EngineChoice::Strip, source.as_bytes()) {
            Ok(frame) if frame == expected => {}
            Ok(frame) => {
                mismatches += 1;
                if samples.len() < 4 {
                    samples.push(format!(
                        "thread {thread_id} call {i}: {source:?} -> {:?}",
                        String::from_utf8_lossy(&frame)
                    ));
                }
            }
            Err(err) => {
                mismatches += 1;
                if samples.len() < 4 {
                    samples.push(format!("thread {thread_id} call {i}: {err}"));
                }
            }
        }
    }
    (calls, mismatches, samples)
}

/// Run `threads` workers for `iterations` calls each.
pub fn run_stress(threads: usize, iterations: usize) -> Result<StressReport, HarnessError> {
    let before = TsbridgeStats::capture();
    let started = Instant::now();

    let handles: Vec<_> = (0..threads.max(1))
        .map(|t| thread::spawn(move || worker(t, iterations)))
        .collect();
    let mut calls = 0;
    let mut mismatches = 0;
    let mut samples = Vec::new();
    for handle in handles {
        let (c, m, s) = handle
            .join()
            .map_err(|_| HarnessError::Stress("worker thread panicked".into()))?;
        calls += c;
        mismatches += m;
        samples.extend(s);
    }
    samples.truncate(8);

    let after = TsbridgeStats::capture();
    Ok(StressReport {
        threads: threads.max(1),
        iterations,
        calls,
        mismatches,
        samples,
        allocations: after.allocations - before.allocations,
        releases: after.releases - before.releases,
        double_releases: after.double_releases - before.double_releases,
        leaked: after.live.saturating_sub(before.live),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}
