//! CLI entrypoint for the tsbridge harness.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tsbridge_harness::determinism::check_determinism;
use tsbridge_harness::stress::run_stress;
use tsbridge_harness::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, StreamKind, now_utc};
use tsbridge_harness::verify::VerificationSummary;
use tsbridge_harness::{FixtureSet, HarnessError, TestRunner, VerifyReport};
use tsbridge_membrane::config::safety_level;

/// Verification tooling for the tsbridge boundary.
#[derive(Debug, Parser)]
#[command(name = "tsbridge-harness")]
#[command(about = "Fixture, determinism and stress harness for the tsbridge boundary")]
struct Cli {
    /// Write JSONL structured logs to this path.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run fixture cases through the exported entry points.
    Verify {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown; a .json twin is written beside it).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Fixed timestamp for reproducible reports.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Repeat every fixture case and compare result digests.
    Determinism {
        #[arg(long)]
        fixture: PathBuf,
        /// Runs per case.
        #[arg(long, default_value_t = 10)]
        runs: usize,
        /// Write the digest report as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Concurrent calls with per-call checks and leak accounting.
    Stress {
        #[arg(long, default_value_t = 8)]
        threads: usize,
        /// Calls per thread.
        #[arg(long, default_value_t = 1000)]
        iterations: usize,
    },
}

type Emitter = LogEmitter<BufWriter<File>>;

fn open_log(path: Option<&Path>) -> Result<Option<Emitter>, HarnessError> {
    let run_id = format!("run-{}", std::process::id());
    path.map(|p| LogEmitter::to_file(p, &run_id).map_err(|e| HarnessError::io(p, e)))
        .transpose()
}

fn log(emitter: &mut Option<Emitter>, entry: LogEntry) -> std::io::Result<()> {
    match emitter {
        Some(emitter) => emitter.emit_entry(entry.with_mode(safety_level().as_str())),
        None => Ok(()),
    }
}

fn outcome(passed: bool) -> Outcome {
    if passed { Outcome::Pass } else { Outcome::Fail }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut emitter = open_log(cli.log.as_deref())?;

    match cli.command {
        Command::Verify {
            fixture,
            report,
            timestamp,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let sets = FixtureSet::load_dir(&fixture)?;
            let runner = TestRunner::new("fixture-verify");
            log(
                &mut emitter,
                LogEntry::new("", LogLevel::Info, "verify_start").with_stream(StreamKind::Fixture),
            )?;

            let mut results = Vec::new();
            for set in &sets {
                for result in runner.run(set) {
                    let level = if result.passed { LogLevel::Info } else { LogLevel::Error };
                    let mut entry = LogEntry::new("", level, "case_result")
                        .with_stream(StreamKind::Fixture)
                        .with_case(&result.family, &result.case_name)
                        .with_engine(&result.engine)
                        .with_outcome(outcome(result.passed))
                        .with_latency_ns(result.latency_ns);
                    if let Some(diff) = &result.diff {
                        entry = entry.with_details(serde_json::json!({
                            "expected": result.expected,
                            "actual": result.actual,
                            "diff": diff,
                        }));
                    }
                    log(&mut emitter, entry)?;
                    results.push(result);
                }
            }
            results.sort_by(|a, b| {
                a.family
                    .cmp(&b.family)
                    .then_with(|| a.case_name.cmp(&b.case_name))
            });

            let report_doc = VerifyReport {
                title: String::from("tsbridge Fixture Report"),
                mode: safety_level().as_str().to_owned(),
                timestamp: timestamp.unwrap_or_else(now_utc),
                summary: VerificationSummary::from_results(results),
            };
            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                report_doc.summary.total, report_doc.summary.passed, report_doc.summary.failed
            );
            if let Some(report_path) = report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
                std::fs::write(report_path.with_extension("json"), report_doc.to_json())?;
            }
            log(
                &mut emitter,
                LogEntry::new("", LogLevel::Info, "verify_end")
                    .with_stream(StreamKind::Fixture)
                    .with_outcome(outcome(report_doc.summary.all_passed()))
                    .with_details(serde_json::json!({
                        "total": report_doc.summary.total,
                        "failed": report_doc.summary.failed,
                    })),
            )?;
            flush(&mut emitter)?;
            if !report_doc.summary.all_passed() {
                return Err("fixture verification failed".into());
            }
        }
        Command::Determinism {
            fixture,
            runs,
            output,
        } => {
            let sets = FixtureSet::load_dir(&fixture)?;
            let report = check_determinism(&sets, runs);
            for case in &report.cases {
                let mut entry = LogEntry::new("", LogLevel::Info, "case_digest")
                    .with_stream(StreamKind::Determinism)
                    .with_case(&case.family, &case.case_name)
                    .with_outcome(outcome(case.stable()))
                    .with_sha256(&case.sha256);
                if let Some(err) = &case.error {
                    entry = entry.with_details(serde_json::json!({ "error": err }));
                }
                log(&mut emitter, entry)?;
            }
            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => std::fs::write(&path, json)?,
                None => println!("{json}"),
            }
            flush(&mut emitter)?;

            let unstable = report.unstable();
            eprintln!(
                "Determinism: {} case(s) x {} run(s), {} unstable",
                report.cases.len(),
                report.runs,
                unstable.len()
            );
            if !unstable.is_empty() {
                return Err("non-deterministic results".into());
            }
        }
        Command::Stress {
            threads,
            iterations,
        } => {
            let report = run_stress(threads, iterations)?;
            log(
                &mut emitter,
                LogEntry::new("", LogLevel::Info, "stress_result")
                    .with_stream(StreamKind::Stress)
                    .with_outcome(outcome(report.ok()))
                    .with_duration_ms(report.duration_ms)
                    .with_details(serde_json::to_value(&report)?),
            )?;
            flush(&mut emitter)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.ok() {
                return Err("stress run found mismatches or leaks".into());
            }
        }
    }
    Ok(())
}

fn flush(emitter: &mut Option<Emitter>) -> std::io::Result<()> {
    emitter.as_mut().map_or(Ok(()), LogEmitter::flush)
}
