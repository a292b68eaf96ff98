//! Batch summaries, recommendations and report persistence.
//!
//! Everything here is a fold over finished [`AnalysisResult`]s: no counters
//! live across MCQs, and the same results always produce the same summary.
//! Reports are written as pretty JSON named
//! `mcq-report-{mode}-cycle{n}-{YYYYmmdd-HHMMSS}-{run id prefix}.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DataFileError;
use crate::scoring::{AnalysisMode, AnalysisResult, Component, QualityBand};

const REPORT_PREFIX: &str = "mcq-report-";
const TOP_ISSUES_KEPT: usize = 10;
const COMPONENT_TARGET: f64 = 85.0;

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

// ============================================================================
// Summaries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCount {
    pub issue: String,
    pub count: usize,
    pub percentage: f64,
}

/// Counts shared by the overall and per-specialty summaries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub total_tested: usize,
    pub average_score: f64,
    pub band_counts: BTreeMap<QualityBand, usize>,
    pub critical_failures: usize,
    pub conversion_errors: usize,
    pub fallbacks: usize,
    /// Percentage of results counted as a success by the mode.
    pub success_rate: f64,
    /// Mean of each component over the results that report it.
    pub component_averages: BTreeMap<Component, f64>,
    /// Occurrences of each full issue string.
    pub issue_counts: BTreeMap<String, usize>,
}

impl Tally {
    fn fold<'a, I>(mode: AnalysisMode, results: I) -> Self
    where
        I: IntoIterator<Item = &'a AnalysisResult>,
    {
        let mut tally = Tally::default();
        let mut score_sum = 0.0;
        let mut successes = 0;
        let mut component_sums: BTreeMap<Component, (f64, usize)> = BTreeMap::new();

        for result in results {
            tally.total_tested += 1;
            score_sum += result.quality_score;
            *tally.band_counts.entry(mode.band(result.quality_score)).or_default() += 1;
            if result.critical_failure {
                tally.critical_failures += 1;
            }
            if result.is_conversion_error() {
                tally.conversion_errors += 1;
            }
            if result.fallback_used {
                tally.fallbacks += 1;
            }
            if mode.is_success(result) {
                successes += 1;
            }
            for (component, value) in &result.components {
                let entry = component_sums.entry(*component).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
            for issue in &result.issues {
                *tally.issue_counts.entry(issue.to_string()).or_default() += 1;
            }
        }

        if tally.total_tested > 0 {
            tally.average_score = score_sum / tally.total_tested as f64;
        }
        tally.success_rate = percent(successes, tally.total_tested);
        tally.component_averages = component_sums
            .into_iter()
            .map(|(component, (sum, n))| (component, sum / n as f64))
            .collect();
        tally
    }

    pub fn band_count(&self, band: QualityBand) -> usize {
        self.band_counts.get(&band).copied().unwrap_or(0)
    }

    pub fn band_rate(&self, band: QualityBand) -> f64 {
        percent(self.band_count(band), self.total_tested)
    }

    /// Issue strings by descending count, ties alphabetical.
    pub fn ranked_issues(&self) -> Vec<IssueCount> {
        let mut ranked: Vec<IssueCount> = self
            .issue_counts
            .iter()
            .map(|(issue, count)| IssueCount {
                issue: issue.clone(),
                count: *count,
                percentage: percent(*count, self.total_tested),
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.issue.cmp(&b.issue)));
        ranked
    }

    /// Occurrences per issue code, summed over issue strings sharing the code.
    pub fn code_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (issue, count) in &self.issue_counts {
            let code = issue.split_once(": ").map_or(issue.as_str(), |(code, _)| code);
            *counts.entry(code.to_string()).or_default() += count;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub mode: AnalysisMode,
    pub tally: Tally,
    pub top_issues: Vec<IssueCount>,
}

impl BatchSummary {
    pub fn fold(mode: AnalysisMode, results: &[AnalysisResult]) -> Self {
        let tally = Tally::fold(mode, results);
        let mut top_issues = tally.ranked_issues();
        top_issues.truncate(TOP_ISSUES_KEPT);
        Self {
            mode,
            tally,
            top_issues,
        }
    }

    /// One-line verdict on the whole batch.
    pub fn assessment(&self) -> String {
        match self.mode {
            AnalysisMode::Strict => {
                let rate = self.tally.band_rate(QualityBand::Excellent);
                if rate >= 70.0 {
                    format!("EXCELLENT: {:.1}% excellent cases - System performing very well!", rate)
                } else if rate >= 50.0 {
                    format!(
                        "GOOD: {:.1}% excellent cases - System working well with room for improvement",
                        rate
                    )
                } else if rate >= 30.0 {
                    format!("FAIR: {:.1}% excellent cases - Significant improvements needed", rate)
                } else {
                    format!("POOR: {:.1}% excellent cases - Major improvements required", rate)
                }
            }
            AnalysisMode::Comprehensive | AnalysisMode::Preservation => {
                let rate = self.tally.success_rate;
                if rate >= 80.0 {
                    "EXCELLENT: System is performing very well!".to_string()
                } else if rate >= 60.0 {
                    "GOOD: System is working well with some improvement opportunities".to_string()
                } else if rate >= 40.0 {
                    "NEEDS IMPROVEMENT: Several issues need to be addressed".to_string()
                } else {
                    "POOR: Major improvements needed".to_string()
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialtySummary {
    pub specialty: String,
    pub tally: Tally,
}

/// Per-specialty folds, ranked best first: by success rate in preservation
/// mode, by average score otherwise.
pub fn summarize_specialties(mode: AnalysisMode, results: &[AnalysisResult]) -> Vec<SpecialtySummary> {
    let mut groups: BTreeMap<&str, Vec<&AnalysisResult>> = BTreeMap::new();
    for result in results {
        groups.entry(result.subspecialty.as_str()).or_default().push(result);
    }

    let mut summaries: Vec<SpecialtySummary> = groups
        .into_iter()
        .map(|(specialty, group)| SpecialtySummary {
            specialty: specialty.to_string(),
            tally: Tally::fold(mode, group),
        })
        .collect();

    let key = |s: &SpecialtySummary| match mode {
        AnalysisMode::Preservation => s.tally.success_rate,
        AnalysisMode::Comprehensive | AnalysisMode::Strict => s.tally.average_score,
    };
    summaries.sort_by(|a, b| key(b).total_cmp(&key(a)));
    summaries
}

// ============================================================================
// Recommendations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Urgent,
    Critical,
    High,
    Medium,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "URGENT",
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecommendation {
    pub priority: Priority,
    pub issue: String,
    pub count: usize,
    pub fix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_location: Option<String>,
}

impl FixRecommendation {
    fn new(priority: Priority, issue: &str, count: usize, fix: &str, location: &str) -> Self {
        Self {
            priority,
            issue: issue.to_string(),
            count,
            fix: fix.to_string(),
            code_location: Some(location.to_string()),
        }
    }
}

impl fmt::Display for FixRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.priority, self.fix)
    }
}

/// (code, priority, fix, code location) per mode, in reporting order.
type FixRule = (&'static str, Priority, &'static str, &'static str);

const COMPREHENSIVE_FIXES: &[FixRule] = &[
    (
        "MISSING_CONDITION",
        Priority::Urgent,
        "Fix critical condition preservation in validation",
        "converter::validation::validate_draft",
    ),
    (
        "TOPIC_DRIFT",
        Priority::Urgent,
        "Fix topic consistency in AI prompts",
        "converter::llm::build_prompt",
    ),
    (
        "PURPOSE_MISMATCH",
        Priority::Urgent,
        "Fix educational purpose alignment",
        "purpose::detect_question_type",
    ),
    (
        "FALLBACK_USED",
        Priority::High,
        "Reduce fallback usage by improving AI generation",
        "converter::LlmConverter::convert",
    ),
];

const PRESERVATION_FIXES: &[FixRule] = &[
    (
        "TOPIC_MISMATCH",
        Priority::Critical,
        "Strengthen validation to reject cases that change medical topics. Add more specific critical term checking.",
        "topic::TopicTable::compare",
    ),
    (
        "CRITICAL_TERM_MISSING",
        Priority::Critical,
        "Enhance critical term detection and make validation fail immediately for missing critical terms.",
        "content::extract_key_terms_with",
    ),
    (
        "INSUFFICIENT_DETAIL_FOR_ADVANCED",
        Priority::High,
        "Improve prompts for advanced management cases to require specific medication details and treatment failures.",
        "converter::llm::build_prompt",
    ),
    (
        "FALLBACK_USED",
        Priority::Medium,
        "Investigate why AI generation is failing and improve prompts or reduce validation strictness.",
        "converter::LlmConverter::convert",
    ),
];

const STRICT_FIXES: &[FixRule] = &[
    (
        "FALLBACK_USED",
        Priority::High,
        "Fix AI generation failures causing fallbacks",
        "converter::LlmConverter::convert",
    ),
    (
        "MISSING_CRITICAL_TERMS",
        Priority::High,
        "Strengthen validation for critical medical terms",
        "converter::validation::validate_draft",
    ),
    (
        "MAJOR_TOPIC_DRIFT",
        Priority::High,
        "Improve topic consistency in AI prompts",
        "converter::llm::build_prompt",
    ),
];

/// Per code, the summed count of issue strings that individually reach `share` percent.
fn prevalent_codes(tally: &Tally, share: f64) -> BTreeMap<String, usize> {
    let threshold = tally.total_tested as f64 * share / 100.0;
    let mut codes = BTreeMap::new();
    for (issue, count) in &tally.issue_counts {
        if *count as f64 >= threshold {
            let code = issue.split_once(": ").map_or(issue.as_str(), |(code, _)| code);
            *codes.entry(code.to_string()).or_default() += count;
        }
    }
    codes
}

fn apply_rules(rules: &[FixRule], counts: &BTreeMap<String, usize>) -> Vec<FixRecommendation> {
    rules
        .iter()
        .filter_map(|(code, priority, fix, location)| {
            counts
                .get(*code)
                .map(|count| FixRecommendation::new(*priority, code, *count, fix, location))
        })
        .collect()
}

pub fn generate_recommendations(summary: &BatchSummary) -> Vec<FixRecommendation> {
    let tally = &summary.tally;
    if tally.total_tested == 0 {
        return Vec::new();
    }

    match summary.mode {
        AnalysisMode::Comprehensive => apply_rules(COMPREHENSIVE_FIXES, &prevalent_codes(tally, 10.0)),
        AnalysisMode::Preservation => {
            let all_codes = tally.code_counts();
            let top_codes: BTreeMap<String, usize> = summary
                .top_issues
                .iter()
                .filter_map(|top| {
                    let code = top.issue.split_once(": ").map_or(top.issue.as_str(), |(c, _)| c);
                    all_codes.get(code).map(|count| (code.to_string(), *count))
                })
                .collect();
            let mut recommendations = apply_rules(PRESERVATION_FIXES, &top_codes);
            recommendations.sort_by(|a, b| b.count.cmp(&a.count));
            recommendations
        }
        AnalysisMode::Strict => {
            let mut recommendations = Vec::new();
            let failure_rate = percent(tally.critical_failures, tally.total_tested);
            if failure_rate > 10.0 {
                recommendations.push(FixRecommendation {
                    priority: Priority::Urgent,
                    issue: "CRITICAL_FAILURE".to_string(),
                    count: tally.critical_failures,
                    fix: format!("Reduce critical failure rate ({:.1}%)", failure_rate),
                    code_location: None,
                });
                recommendations.extend(apply_rules(STRICT_FIXES, &prevalent_codes(tally, 5.0)));
            }
            for (component, average) in &tally.component_averages {
                if *average < COMPONENT_TARGET {
                    recommendations.push(FixRecommendation {
                        priority: Priority::Medium,
                        issue: component.as_str().to_string(),
                        count: 0,
                        fix: format!(
                            "Improve {}: {:.1}% (target: ≥{:.0}%)",
                            component.label().to_lowercase(),
                            average,
                            COMPONENT_TARGET
                        ),
                        code_location: None,
                    });
                }
            }
            recommendations
        }
    }
}

// ============================================================================
// Batch report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub mode: AnalysisMode,
    pub cycle: u32,
    pub generated_at: DateTime<Utc>,
    pub converter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub overall: BatchSummary,
    pub specialties: Vec<SpecialtySummary>,
    pub recommendations: Vec<FixRecommendation>,
    pub results: Vec<AnalysisResult>,
}

impl BatchReport {
    pub fn build(
        mode: AnalysisMode,
        cycle: u32,
        converter: &str,
        seed: Option<u64>,
        results: Vec<AnalysisResult>,
    ) -> Self {
        let overall = BatchSummary::fold(mode, &results);
        let specialties = summarize_specialties(mode, &results);
        let recommendations = generate_recommendations(&overall);
        Self {
            run_id: Uuid::new_v4(),
            mode,
            cycle,
            generated_at: Utc::now(),
            converter: converter.to_string(),
            seed,
            overall,
            specialties,
            recommendations,
            results,
        }
    }

    /// Unique per run: the first eight hex digits of the run id follow the timestamp.
    pub fn file_name(&self) -> String {
        let run = self.run_id.simple().to_string();
        format!(
            "{}{}-cycle{}-{}-{}.json",
            REPORT_PREFIX,
            self.mode.id(),
            self.cycle,
            self.generated_at.format("%Y%m%d-%H%M%S"),
            &run[..8]
        )
    }
}

/// Plain-text rendering for the terminal.
pub fn render_text_report(report: &BatchReport) -> String {
    let summary = &report.overall;
    let tally = &summary.tally;
    let total = tally.total_tested;
    let bands = report.mode.bands();
    let mut out = String::new();

    out.push_str(&format!("{}\n", "=".repeat(80)));
    out.push_str(&format!(
        "{} - CYCLE {}\n",
        report.mode.name().to_uppercase(),
        report.cycle
    ));
    out.push_str(&format!("{}\n", "=".repeat(80)));
    out.push_str(&format!(
        "Run {} | converter: {} | generated {}\n",
        report.run_id,
        report.converter,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out.push_str("\nOVERALL PERFORMANCE:\n");
    out.push_str(&format!("  Total MCQs Tested: {}\n", total));
    out.push_str(&format!("  Average Quality Score: {:.1}/100\n", tally.average_score));
    out.push_str(&format!("  Success Rate: {:.1}%\n", tally.success_rate));
    if report.mode == AnalysisMode::Strict {
        out.push_str(&format!(
            "  Critical Failures: {}/{} ({:.1}%)\n",
            tally.critical_failures,
            total,
            percent(tally.critical_failures, total)
        ));
    }
    out.push_str(&format!(
        "  Fallbacks: {} | Conversion errors: {}\n",
        tally.fallbacks, tally.conversion_errors
    ));

    out.push_str("\nQUALITY DISTRIBUTION:\n");
    let ranges = [
        (QualityBand::Excellent, format!("≥{:.0}", bands.excellent)),
        (
            QualityBand::Good,
            format!("{:.0}-{:.0}", bands.good, bands.excellent - 1.0),
        ),
        (
            QualityBand::Fair,
            format!("{:.0}-{:.0}", bands.fair, bands.good - 1.0),
        ),
        (QualityBand::Poor, format!("<{:.0}", bands.fair)),
    ];
    for (band, range) in ranges {
        out.push_str(&format!(
            "  {} ({}): {}/{} ({:.1}%)\n",
            band,
            range,
            tally.band_count(band),
            total,
            tally.band_rate(band)
        ));
    }

    if !tally.component_averages.is_empty() {
        out.push_str("\nCOMPONENT AVERAGES:\n");
        for (component, average) in &tally.component_averages {
            out.push_str(&format!("  {}: {:.1}%\n", component.label(), average));
        }
    }

    if !summary.top_issues.is_empty() {
        out.push_str("\nTOP ISSUES:\n");
        for top in summary.top_issues.iter().take(5) {
            out.push_str(&format!(
                "  {}: {} cases ({:.1}%)\n",
                top.issue, top.count, top.percentage
            ));
        }
    }

    render_specialties(&mut out, report);

    if !report.recommendations.is_empty() {
        out.push_str("\nRECOMMENDATIONS:\n");
        for (i, rec) in report.recommendations.iter().enumerate() {
            out.push_str(&format!("  {}. {}", i + 1, rec));
            if let Some(location) = &rec.code_location {
                out.push_str(&format!(" [{}]", location));
            }
            out.push('\n');
        }
    }

    out.push_str(&format!("\nASSESSMENT: {}\n", summary.assessment()));
    out
}

fn render_specialties(out: &mut String, report: &BatchReport) {
    if report.specialties.is_empty() {
        return;
    }

    let line = |s: &SpecialtySummary| {
        format!(
            "  {}: {:.1}% avg | {:.1}% success | {}/{} excellent\n",
            s.specialty,
            s.tally.average_score,
            s.tally.success_rate,
            s.tally.band_count(QualityBand::Excellent),
            s.tally.total_tested
        )
    };

    match report.mode {
        AnalysisMode::Preservation => {
            out.push_str("\nSPECIALTY PERFORMANCE:\n");
            for summary in report.specialties.iter().take(10) {
                out.push_str(&line(summary));
            }
        }
        AnalysisMode::Comprehensive | AnalysisMode::Strict => {
            let attention_below = if report.mode == AnalysisMode::Strict {
                80.0
            } else {
                70.0
            };
            out.push_str("\nTOP PERFORMING SPECIALTIES:\n");
            for summary in report.specialties.iter().take(5) {
                out.push_str(&line(summary));
            }
            let worst: Vec<&SpecialtySummary> = report
                .specialties
                .iter()
                .rev()
                .take(5)
                .filter(|s| s.tally.average_score < attention_below)
                .collect();
            if !worst.is_empty() {
                out.push_str("\nSPECIALTIES NEEDING IMPROVEMENT:\n");
                for summary in worst.into_iter().rev() {
                    out.push_str(&line(summary));
                }
            }
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Write `report` into `dir`, creating it if needed.
pub fn save_report(report: &BatchReport, dir: &Path) -> Result<PathBuf, DataFileError> {
    fs::create_dir_all(dir).map_err(|source| DataFileError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(report.file_name());
    let json = serde_json::to_string_pretty(report).map_err(|source| {
        DataFileError::Serialize {
            what: "batch report",
            source,
        }
    })?;
    fs::write(&path, json).map_err(|source| DataFileError::Write {
        path: path.clone(),
        source,
    })?;

    info!("Batch report saved to: {:?}", path);
    Ok(path)
}

pub fn load_report(path: &Path) -> Result<BatchReport, DataFileError> {
    let content = fs::read_to_string(path).map_err(|source| DataFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DataFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// All reports in `dir`, oldest first. Unreadable files are skipped with a warning.
pub fn load_reports(dir: &Path) -> Result<Vec<BatchReport>, DataFileError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let read_error = |source: std::io::Error| DataFileError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut reports = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !(name.starts_with(REPORT_PREFIX) && name.ends_with(".json")) {
            continue;
        }
        match load_report(&path) {
            Ok(report) => reports.push(report),
            Err(e) => warn!("Skipping report {:?}: {}", path, e),
        }
    }

    reports.sort_by_key(|r| r.generated_at);
    Ok(reports)
}

// ============================================================================
// Comparison
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueChange {
    pub code: String,
    pub before: usize,
    pub after: usize,
}

impl IssueChange {
    pub fn delta(&self) -> i64 {
        self.after as i64 - self.before as i64
    }
}

/// Differences between two reports, `after` minus `before`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportComparison {
    pub before_run: Uuid,
    pub after_run: Uuid,
    pub before_cycle: u32,
    pub after_cycle: u32,
    pub mode_changed: bool,
    pub average_delta: f64,
    pub success_delta: f64,
    pub band_deltas: BTreeMap<QualityBand, i64>,
    pub component_deltas: BTreeMap<Component, f64>,
    /// Per issue code, largest absolute change first.
    pub issue_changes: Vec<IssueChange>,
}

pub fn compare_reports(before: &BatchReport, after: &BatchReport) -> ReportComparison {
    let old = &before.overall.tally;
    let new = &after.overall.tally;

    let band_deltas = QualityBand::all()
        .into_iter()
        .map(|band| (band, new.band_count(band) as i64 - old.band_count(band) as i64))
        .collect();

    let component_deltas = new
        .component_averages
        .iter()
        .filter_map(|(component, value)| {
            old.component_averages
                .get(component)
                .map(|previous| (*component, value - previous))
        })
        .collect();

    let old_codes = old.code_counts();
    let new_codes = new.code_counts();
    let mut codes: Vec<&String> = old_codes.keys().chain(new_codes.keys()).collect();
    codes.sort();
    codes.dedup();

    let mut issue_changes: Vec<IssueChange> = codes
        .into_iter()
        .map(|code| IssueChange {
            code: code.clone(),
            before: old_codes.get(code).copied().unwrap_or(0),
            after: new_codes.get(code).copied().unwrap_or(0),
        })
        .filter(|change| change.delta() != 0)
        .collect();
    issue_changes.sort_by(|a, b| {
        b.delta()
            .abs()
            .cmp(&a.delta().abs())
            .then_with(|| a.code.cmp(&b.code))
    });

    ReportComparison {
        before_run: before.run_id,
        after_run: after.run_id,
        before_cycle: before.cycle,
        after_cycle: after.cycle,
        mode_changed: before.mode != after.mode,
        average_delta: new.average_score - old.average_score,
        success_delta: new.success_rate - old.success_rate,
        band_deltas,
        component_deltas,
        issue_changes,
    }
}

pub fn render_comparison(comparison: &ReportComparison) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Cycle {} -> Cycle {}\n",
        comparison.before_cycle, comparison.after_cycle
    ));
    if comparison.mode_changed {
        out.push_str("WARNING: reports were produced by different analysis modes\n");
    }
    out.push_str(&format!("  Average score: {:+.1}\n", comparison.average_delta));
    out.push_str(&format!("  Success rate: {:+.1} pts\n", comparison.success_delta));

    out.push_str("\nBands:\n");
    for (band, delta) in &comparison.band_deltas {
        out.push_str(&format!("  {}: {:+}\n", band, delta));
    }

    if !comparison.component_deltas.is_empty() {
        out.push_str("\nComponents:\n");
        for (component, delta) in &comparison.component_deltas {
            out.push_str(&format!("  {}: {:+.1}\n", component.label(), delta));
        }
    }

    out.push_str("\nIssues:\n");
    if comparison.issue_changes.is_empty() {
        out.push_str("  (no change)\n");
    }
    for change in &comparison.issue_changes {
        out.push_str(&format!(
            "  {}: {} -> {} ({:+})\n",
            change.code,
            change.before,
            change.after,
            change.delta()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcq::Mcq;
    use crate::scoring::Issue;

    fn result(
        mode: AnalysisMode,
        specialty: &str,
        score: f64,
        issues: Vec<Issue>,
    ) -> AnalysisResult {
        let mut r = AnalysisResult::new(&Mcq::new(1, "q", specialty), mode);
        r.quality_score = score;
        r.issues = issues;
        for component in mode.components() {
            r.components.insert(*component, score);
        }
        r
    }

    fn comprehensive_batch() -> Vec<AnalysisResult> {
        let mode = AnalysisMode::Comprehensive;
        vec![
            result(mode, "Epilepsy", 90.0, vec![]),
            result(mode, "Epilepsy", 70.0, vec![Issue::MissingCondition("seizure".into())]),
            result(mode, "Vascular", 30.0, vec![Issue::FallbackUsed]),
            result(
                mode,
                "Vascular",
                50.0,
                vec![Issue::MissingCondition("stroke".into()), Issue::PoorDemographics],
            ),
        ]
    }

    #[test]
    fn test_fold_counts_bands_and_success() {
        let summary = BatchSummary::fold(AnalysisMode::Comprehensive, &comprehensive_batch());
        let tally = &summary.tally;
        assert_eq!(tally.total_tested, 4);
        assert_eq!(tally.average_score, 60.0);
        assert_eq!(tally.band_count(QualityBand::Excellent), 1);
        assert_eq!(tally.band_count(QualityBand::Good), 1);
        assert_eq!(tally.band_count(QualityBand::Fair), 1);
        assert_eq!(tally.band_count(QualityBand::Poor), 1);
        assert_eq!(tally.success_rate, 50.0);
        assert_eq!(
            tally.component_averages.get(&Component::ClinicalRealism),
            Some(&60.0)
        );
        assert_eq!(summary.top_issues.len(), 4);
        assert!(summary.top_issues.iter().all(|i| i.count == 1));
    }

    #[test]
    fn test_fold_empty() {
        let summary = BatchSummary::fold(AnalysisMode::Strict, &[]);
        assert_eq!(summary.tally.total_tested, 0);
        assert_eq!(summary.tally.success_rate, 0.0);
        assert!(generate_recommendations(&summary).is_empty());
    }

    #[test]
    fn test_code_counts_merge_details() {
        let summary = BatchSummary::fold(AnalysisMode::Comprehensive, &comprehensive_batch());
        let codes = summary.tally.code_counts();
        assert_eq!(codes.get("MISSING_CONDITION"), Some(&2));
        assert_eq!(codes.get("FALLBACK_USED"), Some(&1));
    }

    #[test]
    fn test_comprehensive_recommendations() {
        let summary = BatchSummary::fold(AnalysisMode::Comprehensive, &comprehensive_batch());
        let recs = generate_recommendations(&summary);
        let texts: Vec<String> = recs.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            texts,
            vec![
                "URGENT: Fix critical condition preservation in validation",
                "HIGH: Reduce fallback usage by improving AI generation",
            ]
        );
        assert_eq!(recs[0].count, 2);
    }

    #[test]
    fn test_preservation_recommendations_match_codes() {
        let mode = AnalysisMode::Preservation;
        let results = vec![
            result(mode, "A", 0.0, vec![Issue::CriticalTermMissing("stroke".into())]),
            result(mode, "A", 0.0, vec![Issue::CriticalTermMissing("horner".into())]),
            result(mode, "B", 70.0, vec![Issue::FallbackUsed]),
            result(mode, "B", 100.0, vec![]),
        ];
        let summary = BatchSummary::fold(mode, &results);
        let recs = generate_recommendations(&summary);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].issue, "CRITICAL_TERM_MISSING");
        assert_eq!(recs[0].count, 2);
        assert_eq!(recs[0].priority, Priority::Critical);
        assert_eq!(recs[1].issue, "FALLBACK_USED");
        assert_eq!(recs[1].priority, Priority::Medium);
    }

    #[test]
    fn test_strict_recommendations() {
        let mode = AnalysisMode::Strict;
        let mut failed = result(mode, "A", 20.0, vec![Issue::MajorTopicDrift]);
        failed.critical_failure = true;
        let results = vec![failed, result(mode, "A", 95.0, vec![])];
        let summary = BatchSummary::fold(mode, &results);
        assert_eq!(summary.tally.success_rate, 50.0);

        let recs = generate_recommendations(&summary);
        assert_eq!(recs[0].fix, "Reduce critical failure rate (50.0%)");
        assert_eq!(recs[1].issue, "MAJOR_TOPIC_DRIFT");
        // every component averages 57.5
        assert_eq!(recs.len(), 6);
        assert!(recs[2].fix.starts_with("Improve content preservation: 57.5%"));
    }

    #[test]
    fn test_specialty_ranking() {
        let specialties =
            summarize_specialties(AnalysisMode::Comprehensive, &comprehensive_batch());
        assert_eq!(specialties.len(), 2);
        assert_eq!(specialties[0].specialty, "Epilepsy");
        assert_eq!(specialties[0].tally.average_score, 80.0);
        assert_eq!(specialties[1].tally.average_score, 40.0);
    }

    #[test]
    fn test_render_text_report() {
        let report = BatchReport::build(
            AnalysisMode::Comprehensive,
            2,
            "template",
            Some(7),
            comprehensive_batch(),
        );
        let text = render_text_report(&report);
        assert!(text.contains("COMPREHENSIVE CASE ANALYSIS - CYCLE 2"));
        assert!(text.contains("EXCELLENT (≥80): 1/4 (25.0%)"));
        assert!(text.contains("MISSING_CONDITION: seizure: 1 cases (25.0%)"));
        assert!(text.contains("SPECIALTIES NEEDING IMPROVEMENT:\n  Vascular"));
        assert!(text.contains("ASSESSMENT: NEEDS IMPROVEMENT"));
    }

    #[test]
    fn test_save_and_load_reports() {
        let dir = tempfile::tempdir().unwrap();
        let report = BatchReport::build(
            AnalysisMode::Comprehensive,
            1,
            "replay",
            None,
            comprehensive_batch(),
        );
        let path = save_report(&report, dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("mcq-report-comprehensive-cycle1-"));

        std::fs::write(dir.path().join("mcq-report-broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_reports(dir.path()).unwrap();
        assert_eq!(loaded, vec![report]);
    }

    #[test]
    fn test_reports_saved_in_same_second_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let first = BatchReport::build(
            AnalysisMode::Strict,
            3,
            "template",
            None,
            comprehensive_batch(),
        );
        let mut second = first.clone();
        second.run_id = Uuid::new_v4();

        let first_path = save_report(&first, dir.path()).unwrap();
        let second_path = save_report(&second, dir.path()).unwrap();
        assert_ne!(first_path, second_path);
        assert!(first_path
            .to_str()
            .unwrap()
            .ends_with(&format!("-{}.json", &first.run_id.simple().to_string()[..8])));

        assert_eq!(load_reports(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_load_reports_missing_dir() {
        let loaded = load_reports(Path::new("/nonexistent/reports")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_compare_reports() {
        let mode = AnalysisMode::Comprehensive;
        let before = BatchReport::build(mode, 1, "llm", None, comprehensive_batch());
        let after = BatchReport::build(
            mode,
            2,
            "llm",
            None,
            vec![
                result(mode, "Epilepsy", 90.0, vec![]),
                result(mode, "Vascular", 85.0, vec![Issue::PoorDemographics]),
            ],
        );

        let comparison = compare_reports(&before, &after);
        assert_eq!(comparison.average_delta, 27.5);
        assert_eq!(comparison.success_delta, 50.0);
        assert_eq!(comparison.band_deltas[&QualityBand::Excellent], 1);
        assert_eq!(comparison.band_deltas[&QualityBand::Poor], -1);
        assert_eq!(comparison.issue_changes[0].code, "MISSING_CONDITION");
        assert_eq!(comparison.issue_changes[0].delta(), -2);
        assert!(!comparison.mode_changed);

        let text = render_comparison(&comparison);
        assert!(text.contains("Average score: +27.5"));
        assert!(text.contains("MISSING_CONDITION: 2 -> 0 (-2)"));
    }
}
