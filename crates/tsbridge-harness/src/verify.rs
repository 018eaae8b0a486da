//! Result checking against fixture expectations.

use serde::{Deserialize, Serialize};

use crate::diff::render_diff;
use crate::fixtures::{Expectation, ExpectedStatus};

/// Result of verifying a single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub case_name: String,
    pub family: String,
    pub engine: String,
    pub passed: bool,
    /// Rendered expectation.
    pub expected: String,
    /// Rendered result frame.
    pub actual: String,
    /// Mismatch detail if the case failed.
    pub diff: Option<String>,
    /// Wall time of the boundary call.
    pub latency_ns: u64,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

const fn status_label(status: u8) -> &'static str {
    match status {
        0 => "success",
        1 => "failure",
        _ => "invalid",
    }
}

/// Render a result frame as `<status>: <payload>`.
#[must_use]
pub fn render_actual(status: u8, payload: &str) -> String {
    format!("{}: {payload}", status_label(status))
}

/// Render an expectation in the same shape as [`render_actual`].
#[must_use]
pub fn render_expected(expect: &Expectation) -> String {
    let status = match expect.status {
        ExpectedStatus::Success => "success",
        ExpectedStatus::Failure => "failure",
    };
    let mut out = format!("{status}: ");
    match (&expect.output, &expect.kind, &expect.contains) {
        (Some(output), _, _) => out.push_str(output),
        (None, kind, contains) => {
            if let Some(kind) = kind {
                out.push_str(&format!("{kind}: "));
            }
            out.push_str("...");
            if let Some(contains) = contains {
                out.push_str(&format!("{contains}..."));
            }
        }
    }
    out
}

fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Compare a result frame with an expectation. `None` means it matches.
#[must_use]
pub fn check(expect: &Expectation, status: u8, payload: &str) -> Option<String> {
    let mut problems = Vec::new();
    let want_status = match expect.status {
        ExpectedStatus::Success => 0,
        ExpectedStatus::Failure => 1,
    };
    if status != want_status {
        problems.push(format!(
            "status: expected {}, got {}",
            status_label(want_status),
            status_label(status)
        ));
    }
    if let Some(kind) = &expect.kind
        && !payload.starts_with(&format!("{kind}: "))
    {
        problems.push(format!("diagnostic does not start with '{kind}: '"));
    }
    if let Some(needle) = &expect.contains
        && !payload.contains(needle.as_str())
    {
        problems.push(format!("payload does not contain '{needle}'"));
    }
    if let Some(output) = &expect.output {
        let matches = if expect.ignore_whitespace {
            squash(output) == squash(payload)
        } else {
            output == payload
        };
        if !matches {
            problems.push(render_diff(output, payload));
        }
    }
    (!problems.is_empty()).then(|| problems.join("\n"))
}
