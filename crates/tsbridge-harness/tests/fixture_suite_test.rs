use std::path::PathBuf;

use tsbridge_harness::determinism::check_determinism;
use tsbridge_harness::structured_log::{
    LogEmitter, LogEntry, LogLevel, Outcome, StreamKind, validate_log_file,
};
use tsbridge_harness::verify::VerificationSummary;
use tsbridge_harness::{FixtureSet, HarnessError, TestRunner};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

#[test]
fn bundled_fixtures_all_pass() {
    let sets = FixtureSet::load_dir(&fixture_dir()).expect("fixtures load");
    let families: Vec<&str> = sets.iter().map(|s| s.family.as_str()).collect();
    assert_eq!(
        families,
        ["annotations", "declarations", "echo", "encoding", "failures"]
    );

    let runner = TestRunner::new("suite");
    let results: Vec<_> = sets.iter().flat_map(|set| runner.run(set)).collect();
    let summary = VerificationSummary::from_results(results);
    let failures: Vec<_> = summary
        .results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| format!("{}/{}: {}", r.family, r.case_name, r.diff.as_deref().unwrap_or("")))
        .collect();
    assert!(summary.all_passed(), "{failures:#?}");
    assert!(summary.total >= 30);
}

#[test]
fn bundled_fixtures_are_deterministic() {
    let sets = FixtureSet::load_dir(&fixture_dir()).expect("fixtures load");
    let report = check_determinism(&sets, 4);
    assert!(report.all_stable(), "{:#?}", report.unstable());
}

#[test]
fn empty_directory_is_an_error() {
    let dir = std::env::temp_dir().join(format!("tsbridge-empty-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let err = FixtureSet::load_dir(&dir).unwrap_err();
    assert!(matches!(err, HarnessError::NoFixtures(_)));
    std::fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn run_log_validates_against_the_schema() {
    let path = std::env::temp_dir().join(format!("tsbridge-log-{}.jsonl", std::process::id()));
    let sets = FixtureSet::load_dir(&fixture_dir()).expect("fixtures load");
    let runner = TestRunner::new("log");

    let mut emitter = LogEmitter::to_file(&path, "log-test").expect("log file");
    emitter.emit(LogLevel::Info, "verify_start").expect("write");
    let mut written = 1;
    for result in runner.run(&sets[0]) {
        let outcome = if result.passed { Outcome::Pass } else { Outcome::Fail };
        emitter
            .emit_entry(
                LogEntry::new("", LogLevel::Info, "case_result")
                    .with_stream(StreamKind::Fixture)
                    .with_mode("strict")
                    .with_case(&result.family, &result.case_name)
                    .with_engine(&result.engine)
                    .with_outcome(outcome)
                    .with_latency_ns(result.latency_ns),
            )
            .expect("write");
        written += 1;
    }
    emitter.flush().expect("flush");

    let (lines, errors) = validate_log_file(&path).expect("readable");
    assert_eq!(lines, written);
    assert!(errors.is_empty(), "{errors:?}");
    std::fs::remove_file(&path).expect("cleanup");
}
