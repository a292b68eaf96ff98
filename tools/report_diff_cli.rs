//! Batch Report Diff CLI
//!
//! Compares two saved audit reports and prints how the average score,
//! success rate, quality bands, component averages and issue counts moved.
//!
//! Usage:
//!   cargo run --bin report_diff_cli -- before.json after.json
//!   cargo run --bin report_diff_cli -- --dir ~/.mcq-case-audit/reports
//!   cargo run --bin report_diff_cli -- --dir reports --mode strict

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mcq_case_audit_lib::config::Config;
use mcq_case_audit_lib::report::{compare_reports, load_report, load_reports, render_comparison, BatchReport};
use mcq_case_audit_lib::scoring::AnalysisMode;

fn print_usage(program: &str) {
    eprintln!("Batch Report Diff CLI");
    eprintln!();
    eprintln!("Usage: {} [options] [BEFORE.json AFTER.json]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --dir DIR      Compare the two most recent reports in DIR");
    eprintln!("                 (default when no files are given: config report dir)");
    eprintln!("  --mode MODE    Only consider reports of this mode with --dir");
    eprintln!("  --json         Print the comparison as JSON");
    eprintln!("  --help         Show this help");
}

fn latest_pair(
    dir: &Path,
    mode: Option<AnalysisMode>,
) -> Result<(BatchReport, BatchReport), Box<dyn std::error::Error>> {
    let mut reports: Vec<BatchReport> = load_reports(dir)?
        .into_iter()
        .filter(|r| mode.map_or(true, |m| r.mode == m))
        .collect();

    if reports.len() < 2 {
        return Err(format!(
            "need at least two reports in {:?}, found {}",
            dir,
            reports.len()
        )
        .into());
    }

    let after = reports.remove(reports.len() - 1);
    let before = reports.remove(reports.len() - 1);
    Ok((before, after))
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut dir: Option<PathBuf> = None;
    let mut mode: Option<AnalysisMode> = None;
    let mut json = false;
    let mut files: Vec<PathBuf> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage(&args[0]);
                return Ok(ExitCode::SUCCESS);
            }
            "--dir" => {
                i += 1;
                if i < args.len() {
                    dir = Some(PathBuf::from(&args[i]));
                }
            }
            "--mode" => {
                i += 1;
                if i < args.len() {
                    mode = Some(args[i].parse()?);
                }
            }
            "--json" => json = true,
            s if s.starts_with("--") => {
                eprintln!("Unknown option: {}", s);
                print_usage(&args[0]);
                return Ok(ExitCode::FAILURE);
            }
            s => files.push(PathBuf::from(s)),
        }
        i += 1;
    }

    let (before, after) = match files.as_slice() {
        [before, after] => (load_report(before)?, load_report(after)?),
        [] => {
            let dir = dir.unwrap_or_else(|| Config::load_or_default().report_dir());
            latest_pair(&dir, mode)?
        }
        _ => {
            print_usage(&args[0]);
            return Ok(ExitCode::FAILURE);
        }
    };

    let comparison = compare_reports(&before, &after);

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "=".repeat(80));
    println!(
        "REPORT DIFF: {} ({}) -> {} ({})",
        before.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        before.mode,
        after.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        after.mode
    );
    println!("{}", "=".repeat(80));
    println!(
        "Before: {} MCQs, {:.1} avg | After: {} MCQs, {:.1} avg",
        before.overall.tally.total_tested,
        before.overall.tally.average_score,
        after.overall.tally.total_tested,
        after.overall.tally.average_score
    );
    println!();
    print!("{}", render_comparison(&comparison));

    Ok(ExitCode::SUCCESS)
}
