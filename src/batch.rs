//! Batch runner: sample MCQs per specialty, convert, score, report.
//!
//! MCQs are processed one at a time. Converter failures become
//! `CONVERSION_ERROR` results and never abort the batch.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use uuid::Uuid;

use crate::activity_log;
use crate::converter::CaseConverter;
use crate::dataset::group_by_specialty;
use crate::mcq::Mcq;
use crate::report::BatchReport;
use crate::scoring::{AnalysisResult, CaseScorer};

/// Which MCQs a batch covers.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    /// MCQs sampled per specialty; 0 takes every MCQ.
    pub per_specialty: usize,
    /// Specialties with fewer MCQs are skipped.
    pub min_specialty_size: usize,
    /// Case-insensitive allow-list; empty means all specialties.
    pub specialties: Vec<String>,
    pub seed: Option<u64>,
}

impl BatchConfig {
    pub fn new(per_specialty: usize) -> Self {
        Self {
            per_specialty,
            ..Default::default()
        }
    }

    fn wants(&self, specialty: &str) -> bool {
        self.specialties.is_empty()
            || self
                .specialties
                .iter()
                .any(|s| s.trim().eq_ignore_ascii_case(specialty))
    }
}

/// Progress notifications for the caller.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started {
        total: usize,
        specialties: usize,
    },
    Scored {
        index: usize,
        total: usize,
        result: &'a AnalysisResult,
    },
}

/// Sampled MCQs in specialty order. Seeded runs are reproducible.
pub fn select_sample<'a>(mcqs: &'a [Mcq], config: &BatchConfig) -> Vec<&'a Mcq> {
    match config.seed {
        Some(seed) => sample_with(mcqs, config, &mut StdRng::seed_from_u64(seed)),
        None => sample_with(mcqs, config, &mut rand::thread_rng()),
    }
}

fn sample_with<'a, R: Rng + ?Sized>(
    mcqs: &'a [Mcq],
    config: &BatchConfig,
    rng: &mut R,
) -> Vec<&'a Mcq> {
    let mut sample = Vec::new();
    for (specialty, group) in group_by_specialty(mcqs) {
        if !config.wants(&specialty) || group.len() < config.min_specialty_size {
            continue;
        }
        if config.per_specialty == 0 || group.len() <= config.per_specialty {
            sample.extend(group);
        } else {
            sample.extend(group.choose_multiple(rng, config.per_specialty).copied());
        }
    }
    sample
}

/// Convert and score each MCQ in order.
pub async fn run_batch<F>(
    mcqs: &[&Mcq],
    converter: &dyn CaseConverter,
    scorer: &dyn CaseScorer,
    mut on_event: F,
) -> Vec<AnalysisResult>
where
    F: FnMut(BatchEvent<'_>),
{
    let total = mcqs.len();
    let specialties = {
        let mut names: Vec<&str> = mcqs.iter().map(|m| m.subspecialty.trim()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    };
    on_event(BatchEvent::Started { total, specialties });

    let mut results = Vec::with_capacity(total);
    for (index, mcq) in mcqs.iter().enumerate() {
        let result = match converter.convert(mcq).await {
            Ok(outcome) => scorer.score(mcq, &outcome),
            Err(e) => {
                activity_log::log_conversion_failed(mcq.id, &e.to_string());
                AnalysisResult::conversion_error(mcq, scorer.mode(), &e)
            }
        };
        activity_log::log_mcq_scored(
            result.mcq_id,
            &result.subspecialty,
            result.quality_score,
            result.issues.len(),
            result.fallback_used,
        );
        on_event(BatchEvent::Scored {
            index,
            total,
            result: &result,
        });
        results.push(result);
    }
    results
}

/// Sample, run and fold one audit cycle into a report.
pub async fn run_audit<F>(
    mcqs: &[Mcq],
    config: &BatchConfig,
    converter: &dyn CaseConverter,
    scorer: &dyn CaseScorer,
    cycle: u32,
    on_event: F,
) -> BatchReport
where
    F: FnMut(BatchEvent<'_>),
{
    let run_id = Uuid::new_v4();
    let sample = select_sample(mcqs, config);
    activity_log::log_batch_start(
        &run_id.to_string(),
        scorer.mode().id(),
        converter.name(),
        sample.len(),
    );

    let started = Instant::now();
    let results = run_batch(&sample, converter, scorer, on_event).await;

    let mut report = BatchReport::build(scorer.mode(), cycle, converter.name(), config.seed, results);
    report.run_id = run_id;

    activity_log::log_batch_complete(
        &run_id.to_string(),
        report.overall.tally.total_tested,
        report.overall.tally.average_score,
        report.overall.tally.success_rate,
        started.elapsed().as_millis() as u64,
    );
    report
}
