//! Key-term preservation scorer.
//!
//! The overall score is an issue walk rather than a component mean: starting
//! from 100, a critical term or topic mismatch zeroes it, a fallback costs 30,
//! insufficient-content style issues 20 and anything else 10. Component scores
//! (term preservation rate, realism, advanced detail) are reported alongside.

use std::sync::Arc;

use super::{has_digit, AnalysisMode, AnalysisResult, CaseScorer, Component, Issue, PassScore, TermPreservation};
use crate::case::{CaseData, CaseOutcome};
use crate::content::extract_key_terms_with;
use crate::matcher::{SubstringMatcher, TermMatcher};
use crate::mcq::Mcq;
use crate::purpose::detect_advanced_management_with;
use crate::vocabulary::Vocabulary;

/// Trimmed presentation length below which scoring stops with `INSUFFICIENT_CONTENT`.
pub const MIN_CONTENT_CHARS: usize = 20;

/// Advanced-detail score below which `INSUFFICIENT_DETAIL_FOR_ADVANCED` is raised.
pub const MIN_ADVANCED_DETAIL: f64 = 60.0;

#[derive(Debug)]
pub struct PreservationScorer {
    vocabulary: Arc<Vocabulary>,
    matcher: Box<dyn TermMatcher>,
}

impl Default for PreservationScorer {
    fn default() -> Self {
        Self::new(Arc::new(Vocabulary::default()))
    }
}

impl PreservationScorer {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            matcher: Box::new(SubstringMatcher),
        }
    }

    pub fn with_matcher(mut self, matcher: Box<dyn TermMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Key terms of the question checked against the lower-cased presentation.
    pub fn term_preservation(&self, question_text: &str, presentation: &str) -> TermPreservation {
        let expected =
            extract_key_terms_with(question_text, &self.vocabulary, self.matcher.as_ref());
        let (preserved, missing): (Vec<String>, Vec<String>) = expected
            .iter()
            .cloned()
            .partition(|term| self.matcher.contains(presentation, term));
        let rate = if expected.is_empty() {
            0.0
        } else {
            preserved.len() as f64 / expected.len() as f64 * 100.0
        };

        TermPreservation {
            expected,
            preserved,
            missing,
            rate,
        }
    }

    pub fn assess_clinical_realism(&self, case: &CaseData) -> f64 {
        let mut pass = PassScore::default();
        let presentation = &case.clinical_presentation;

        if case.patient_demographics.trim().chars().count() < 10 {
            pass.deduct(20.0);
        }
        if !self
            .matcher
            .any(&presentation.to_lowercase(), &self.vocabulary.clinical_language)
        {
            pass.deduct(15.0);
        }
        if !has_digit(presentation) {
            pass.deduct(10.0);
        }
        if presentation.chars().count() < 50 {
            pass.deduct(20.0);
        }

        pass.value()
    }

    /// Detail expected of an advanced-management case, from the lower-cased presentation.
    pub fn assess_detail_level(&self, presentation: &str) -> f64 {
        let vocab = &self.vocabulary;
        let checks = [
            (&vocab.detail_medication_indicators, 30.0),
            (&vocab.detail_failure_indicators, 25.0),
            (&vocab.detail_impact_indicators, 20.0),
            (&vocab.detail_common_medications, 15.0),
        ];

        let mut pass = PassScore::default();
        for (indicators, points) in checks {
            if !self.matcher.any(presentation, indicators) {
                pass.deduct(points);
            }
        }
        pass.value()
    }
}

/// Walk issues in order from 100; critical terms and topic mismatch end the walk at 0.
pub fn score_issue_walk(issues: &[Issue]) -> f64 {
    let mut score = 100.0;
    for issue in issues {
        match issue {
            Issue::CriticalTermMissing(_) | Issue::TopicMismatch => return 0.0,
            Issue::FallbackUsed => score -= 30.0,
            Issue::InsufficientContent | Issue::InsufficientDetailForAdvanced => score -= 20.0,
            _ => score -= 10.0,
        }
    }
    f64::max(score, 0.0)
}

impl CaseScorer for PreservationScorer {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Preservation
    }

    fn score(&self, mcq: &Mcq, outcome: &CaseOutcome) -> AnalysisResult {
        let case = outcome.case();
        let mut result = AnalysisResult::new(mcq, self.mode());
        result.generated_case = Some(case.clone());
        result.fallback_used = outcome.is_fallback();
        result.components.insert(Component::TermPreservation, 0.0);
        result.components.insert(Component::ClinicalRealism, 0.0);

        if outcome.is_fallback() {
            result.issues.push(Issue::FallbackUsed);
        }

        if case.clinical_presentation.trim().chars().count() < MIN_CONTENT_CHARS {
            result.issues.push(Issue::InsufficientContent);
            result.critical_failure = true;
            return result;
        }

        let presentation = case.clinical_presentation.to_lowercase();
        let question = mcq.question_text.to_lowercase();

        let terms = self.term_preservation(&mcq.question_text, &presentation);
        if !terms.expected.is_empty() {
            result
                .components
                .insert(Component::TermPreservation, terms.rate);
            for term in &self.vocabulary.critical_terms {
                if self.matcher.contains(&question, term)
                    && !self.matcher.contains(&presentation, term)
                {
                    result.issues.push(Issue::CriticalTermMissing(term.clone()));
                }
            }
            result.term_preservation = Some(terms);
        }

        let topics = self.vocabulary.clinical_topics.compare(
            &mcq.question_text,
            &case.clinical_presentation,
            self.matcher.as_ref(),
        );
        if topics.is_mismatch() {
            result.issues.push(Issue::TopicMismatch);
        }

        result
            .components
            .insert(Component::ClinicalRealism, self.assess_clinical_realism(case));

        if detect_advanced_management_with(&mcq.question_text, &self.vocabulary, self.matcher.as_ref())
        {
            let detail = self.assess_detail_level(&presentation);
            result.components.insert(Component::AdvancedDetail, detail);
            if detail < MIN_ADVANCED_DETAIL {
                result.issues.push(Issue::InsufficientDetailForAdvanced);
            }
        }

        result.quality_score = score_issue_walk(&result.issues);
        result.critical_failure = result
            .issues
            .iter()
            .any(|issue| matches!(issue, Issue::CriticalTermMissing(_) | Issue::TopicMismatch));
        result
    }
}
