//! Test execution engine.
//!
//! Every case is sent through the exported entry points and the result frame
//! is copied out before the handle is released.

use std::ffi::CString;
use std::time::Instant;

use tsbridge::{ResultHandle, TsbridgeContext};
use tsbridge_core::{EchoEngine, TranspilerContext};

use crate::fixtures::{EngineChoice, FixtureCase, FixtureSet};
use crate::verify::{VerificationResult, check, render_actual, render_expected};

/// Calls the boundary on behalf of fixture cases.
#[derive(Debug)]
pub struct Boundary {
    echo: TsbridgeContext,
}

impl Default for Boundary {
    fn default() -> Self {
        Self {
            echo: TsbridgeContext::from(TranspilerContext::new(EchoEngine)),
        }
    }
}

impl Boundary {
    /// Run one call and return a copy of its whole result frame.
    pub fn frame(&self, engine: EngineChoice, source: &[u8]) -> Result<Vec<u8>, String> {
        let source = CString::new(source)
            .map_err(|e| format!("source has a NUL byte at offset {}", e.nul_position()))?;
        let handle = match engine {
            EngineChoice::Strip => ResultHandle::transpile(&source),
            EngineChoice::Echo => ResultHandle::transpile_with(&self.echo, &source),
        }
        .ok_or_else(|| String::from("result buffer allocation failed"))?;
        Ok(handle.bytes().to_vec())
    }
}

/// Status byte and payload text of a result frame.
#[must_use]
pub fn split_frame(frame: &[u8]) -> (u8, String) {
    match frame {
        [status, payload @ .., 0] => (*status, String::from_utf8_lossy(payload).into_owned()),
        _ => (u8::MAX, format!("malformed frame of {} byte(s)", frame.len())),
    }
}

/// Runs fixture sets and collects verification results.
#[derive(Debug, Default)]
pub struct TestRunner {
    pub campaign: String,
    boundary: Boundary,
}

impl TestRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            boundary: Boundary::default(),
        }
    }

    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set
            .cases
            .iter()
            .map(|case| self.run_case(&fixture_set.family, case))
            .collect()
    }

    pub fn run_case(&self, family: &str, case: &FixtureCase) -> VerificationResult {
        let started = Instant::now();
        let frame = self.boundary.frame(case.engine, case.source_bytes());
        let latency_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);

        let expected = render_expected(&case.expect);
        let (actual, diff) = match frame {
            Ok(frame) => {
                let (status, payload) = split_frame(&frame);
                (render_actual(status, &payload), check(&case.expect, status, &payload))
            }
            Err(err) => (format!("error: {err}"), Some(err)),
        };
        VerificationResult {
            case_name: case.name.clone(),
            family: family.to_owned(),
            engine: case.engine.as_str().to_owned(),
            passed: diff.is_none(),
            expected,
            actual,
            diff,
            latency_ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(json: &str) -> FixtureSet {
        FixtureSet::from_json(json).expect("valid fixture json")
    }

    #[test]
    fn strip_and_echo_cases_run_through_the_boundary() {
        let set = fixture(
            r#"{"version":"v1","family":"smoke","cases":[
                {"name":"strip","source":"let y: string = 5;","expect":{"status":"success","output":"let y = 5;"}},
                {"name":"echo","engine":"echo","source":"let y: string = 5;","expect":{"status":"success","output":"let y: string = 5;"}}
            ]}"#,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "{results:#?}");
        assert_eq!(results[1].engine, "echo");
    }

    #[test]
    fn failing_case_carries_a_diff() {
        let set = fixture(
            r#"{"version":"v1","family":"smoke","cases":[
                {"name":"wrong","source":"let a: number = 1;","expect":{"status":"success","output":"let a = 2;"}}
            ]}"#,
        );
        let result = &TestRunner::new("smoke").run(&set)[0];
        assert!(!result.passed);
        assert_eq!(result.actual, "success: let a = 1;");
        assert!(result.diff.as_deref().is_some_and(|d| d.contains("-let a = 2;")));
    }

    #[test]
    fn interior_nul_is_reported_not_sent() {
        let result = TestRunner::new("nul").run_case(
            "f",
            &FixtureCase {
                name: "nul".into(),
                engine: EngineChoice::Strip,
                source: "a\0b".into(),
                source_bytes: None,
                expect: crate::fixtures::Expectation {
                    status: crate::fixtures::ExpectedStatus::Success,
                    output: None,
                    kind: None,
                    contains: None,
                    ignore_whitespace: false,
                },
            },
        );
        assert!(!result.passed);
        assert_eq!(result.actual, "error: source has a NUL byte at offset 1");
    }

    #[test]
    fn split_frame_rejects_unterminated_bytes() {
        assert_eq!(split_frame(b"\x00ok\x00"), (0, "ok".into()));
        assert_eq!(split_frame(b"\x01").0, u8::MAX);
    }
}
