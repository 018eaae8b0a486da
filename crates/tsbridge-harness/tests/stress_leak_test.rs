//! Single test per binary: boundary counters are process-wide.

use tsbridge_harness::stress::run_stress;

#[test]
fn stress_run_is_clean_and_leak_free() {
    let report = run_stress(8, 250).expect("workers join");
    assert_eq!(report.calls, 2000);
    assert_eq!(report.mismatches, 0, "{:?}", report.samples);
    assert_eq!(report.allocations, 2000);
    assert_eq!(report.releases, 2000);
    assert_eq!(report.double_releases, 0);
    assert_eq!(report.leaked, 0);
    assert!(report.ok());
}
