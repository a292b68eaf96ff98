//! Activity logging for audit runs.
//!
//! Console output is human-readable on stderr so reports on stdout stay
//! clean. When a log directory is configured, a JSON copy of every event is
//! written to a daily rolling `activity.log` there.
//!
//! Events carry ids, counts, scores and issue codes. Question stems and
//! generated case text are never logged.

use std::path::Path;
use tracing::{debug, info, warn, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// JSON layer writing to a daily rolling `activity.log` in `dir`.
///
/// Buffered events reach the file when the returned guard is dropped.
fn json_file_layer<S>(dir: &Path) -> std::io::Result<(impl Layer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(dir)?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "activity.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let layer = fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    Ok((layer, guard))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `verbose`; without either the console shows `info`.
/// Hold the returned guard until exit; dropping it flushes the log file.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> std::io::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (layer, guard) = json_file_layer::<Registry>(dir)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let default_level = if verbose { "debug" } else { "info" };
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    info!(
        event = "logging_initialized",
        log_dir = ?log_dir,
        verbose = verbose,
        "Activity logging initialized"
    );
    Ok(guard)
}

// ============================================================================
// Batch events
// ============================================================================

pub fn log_batch_start(run_id: &str, mode: &str, converter: &str, sample_size: usize) {
    info!(
        event = "batch_start",
        run_id = %run_id,
        mode = %mode,
        converter = %converter,
        sample_size = sample_size,
        "Batch analysis started"
    );
}

/// Per-MCQ result (no case content).
pub fn log_mcq_scored(mcq_id: i64, specialty: &str, score: f64, issue_count: usize, fallback: bool) {
    debug!(
        event = "mcq_scored",
        mcq_id = mcq_id,
        specialty = %specialty,
        score = score,
        issue_count = issue_count,
        fallback = fallback,
        "MCQ scored"
    );
}

pub fn log_conversion_failed(mcq_id: i64, error: &str) {
    warn!(
        event = "conversion_failed",
        mcq_id = mcq_id,
        error = %error,
        "Case conversion failed"
    );
}

pub fn log_batch_complete(
    run_id: &str,
    total: usize,
    average_score: f64,
    success_rate: f64,
    duration_ms: u64,
) {
    info!(
        event = "batch_complete",
        run_id = %run_id,
        total = total,
        average_score = average_score,
        success_rate = success_rate,
        duration_ms = duration_ms,
        "Batch analysis complete"
    );
}

pub fn log_report_saved(run_id: &str, path: &Path) {
    info!(
        event = "report_saved",
        run_id = %run_id,
        path = %path.display(),
        "Batch report saved"
    );
}

pub fn log_lint_summary(total: usize, flagged: usize, issue_count: usize) {
    info!(
        event = "lint_summary",
        total = total,
        flagged = flagged,
        issue_count = issue_count,
        "Data-model lint complete"
    );
}
