//! Report generation for verification runs.

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// A fixture verification report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub title: String,
    /// Arena mode the run executed under (`strict` or `hardened`).
    pub mode: String,
    pub timestamp: String,
    pub summary: VerificationSummary,
}

impl VerifyReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Mode: {}\n", self.mode));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        out.push_str("| Family | Case | Engine | Status |\n");
        out.push_str("|--------|------|--------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                r.family, r.case_name, r.engine, status
            ));
        }

        let failures: Vec<_> = self.summary.results.iter().filter(|r| !r.passed).collect();
        if !failures.is_empty() {
            out.push_str("\n## Failures\n");
            for r in failures {
                out.push_str(&format!("\n### {}/{}\n\n", r.family, r.case_name));
                out.push_str(&format!("- expected: `{}`\n", r.expected));
                out.push_str(&format!("- actual: `{}`\n", r.actual));
                if let Some(diff) = &r.diff {
                    out.push_str(&format!("\n```\n{diff}\n```\n"));
                }
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::VerificationResult;

    #[test]
    fn markdown_lists_failures_with_diffs() {
        let result = |name: &str, passed| VerificationResult {
            case_name: name.into(),
            family: "annotations".into(),
            engine: "strip".into(),
            passed,
            expected: "success: a".into(),
            actual: "success: b".into(),
            diff: (!passed).then(|| "-a\n+b".to_owned()),
            latency_ns: 10,
        };
        let report = VerifyReport {
            title: "tsbridge fixture report".into(),
            mode: "strict".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            summary: VerificationSummary::from_results(vec![result("ok", true), result("bad", false)]),
        };
        let md = report.to_markdown();
        assert!(md.contains("| annotations | ok | strip | PASS |"));
        assert!(md.contains("### annotations/bad"));
        assert!(md.contains("-a\n+b"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json()).expect("json");
        assert_eq!(json["summary"]["failed"], 1);
    }
}
