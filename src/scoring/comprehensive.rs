//! Four-pass comprehensive scorer.

use std::sync::Arc;

use super::{has_digit, AnalysisMode, AnalysisResult, CaseScorer, Component, Issue, PassScore};
use crate::case::{CaseData, CaseOutcome};
use crate::content::{extract_critical_content_with, CriticalContent};
use crate::matcher::{SubstringMatcher, TermMatcher};
use crate::mcq::Mcq;
use crate::purpose::{detect_question_purpose_with, QuestionPurpose};
use crate::vocabulary::Vocabulary;

/// Score a fallback case gets regardless of its component passes.
pub const FALLBACK_SCORE: f64 = 30.0;

/// Minimum presentation length, in characters, before `INSUFFICIENT_LENGTH`.
pub const MIN_PRESENTATION_CHARS: usize = 50;

/// Per-result recommendation for each issue code, in reporting order.
const RECOMMENDATIONS: &[(&str, &str)] = &[
    (
        "MISSING_CONDITION",
        "CRITICAL: Strengthen critical condition preservation in validation",
    ),
    (
        "MISSING_LOCATION",
        "HIGH: Improve anatomical location preservation",
    ),
    (
        "PURPOSE_MISMATCH",
        "CRITICAL: Fix question type detection and prompting",
    ),
    (
        "MISSING_TREATMENT_FAILURE_CONTEXT",
        "HIGH: Enhance advanced management case prompts",
    ),
    (
        "NON_CLINICAL_LANGUAGE",
        "MEDIUM: Improve clinical language in prompts",
    ),
    ("TOPIC_DRIFT", "CRITICAL: Fix topic preservation in AI prompts"),
];

#[derive(Debug)]
pub struct ComprehensiveScorer {
    vocabulary: Arc<Vocabulary>,
    matcher: Box<dyn TermMatcher>,
}

impl Default for ComprehensiveScorer {
    fn default() -> Self {
        Self::new(Arc::new(Vocabulary::default()))
    }
}

impl ComprehensiveScorer {
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

    /// Penalize every critical keyword of the question absent from the
    /// lower-cased presentation. Medications are not penalized.
    pub fn analyze_content_preservation(
        &self,
        content: &CriticalContent,
        presentation: &str,
    ) -> PassScore {
        let mut pass = PassScore::default();
        let missing = |terms: &[String]| -> Vec<String> {
            terms
                .iter()
                .filter(|term| !self.matcher.contains(presentation, term))
                .cloned()
                .collect()
        };

        for term in missing(&content.conditions) {
            pass.penalize(25.0, Issue::MissingCondition(term));
        }
        for term in missing(&content.locations) {
            pass.penalize(15.0, Issue::MissingLocation(term));
        }
        for term in missing(&content.signs) {
            pass.penalize(10.0, Issue::MissingSign(term));
        }
        for term in missing(&content.procedures) {
            pass.penalize(20.0, Issue::MissingProcedure(term));
        }

        pass
    }

    pub fn analyze_purpose_alignment(
        &self,
        purpose: QuestionPurpose,
        case: &CaseData,
        presentation: &str,
    ) -> PassScore {
        let mut pass = PassScore::default();
        let case_type = case.question_type.trim();

        if !purpose.accepts(case_type) {
            let case_type = if case_type.is_empty() {
                "unknown"
            } else {
                case_type
            };
            pass.penalize(
                30.0,
                Issue::PurposeMismatch {
                    purpose: purpose.to_string(),
                    case_type: case_type.to_string(),
                },
            );
        }

        if purpose == QuestionPurpose::AdvancedManagement {
            if !self
                .matcher
                .any(presentation, &self.vocabulary.treatment_failure_context)
            {
                pass.penalize(20.0, Issue::MissingTreatmentFailureContext);
            }
            if !self
                .matcher
                .any(presentation, &self.vocabulary.medication_details)
            {
                pass.penalize(15.0, Issue::MissingMedicationDetails);
            }
        }

        pass
    }

    pub fn analyze_clinical_realism(&self, case: &CaseData) -> PassScore {
        clinical_realism_pass(case, &self.vocabulary, self.matcher.as_ref())
    }

    pub fn analyze_educational_value(
        &self,
        question_text: &str,
        purpose: QuestionPurpose,
        presentation: &str,
    ) -> PassScore {
        let mut pass = PassScore::default();

        let topics = self.vocabulary.educational_topics.compare(
            question_text,
            presentation,
            self.matcher.as_ref(),
        );
        if topics.is_mismatch() {
            pass.penalize(
                40.0,
                Issue::TopicDrift {
                    original: topics.original.into_iter().collect(),
                    generated: topics.generated.into_iter().collect(),
                },
            );
        }

        if purpose == QuestionPurpose::AdvancedManagement
            && !self
                .matcher
                .any(&presentation.to_lowercase(), &self.vocabulary.complexity_markers)
        {
            pass.penalize(15.0, Issue::InsufficientComplexityForAdvanced);
        }

        pass
    }
}

/// Length, clinical language, concrete detail and demographics checks.
pub(crate) fn clinical_realism_pass(
    case: &CaseData,
    vocabulary: &Vocabulary,
    matcher: &dyn TermMatcher,
) -> PassScore {
    let mut pass = PassScore::default();
    let presentation = &case.clinical_presentation;

    if presentation.chars().count() < MIN_PRESENTATION_CHARS {
        pass.penalize(20.0, Issue::InsufficientLength);
    }
    if !matcher.any(&presentation.to_lowercase(), &vocabulary.clinical_language) {
        pass.penalize(15.0, Issue::NonClinicalLanguage);
    }
    if !has_digit(presentation) {
        pass.penalize(10.0, Issue::LacksSpecificDetails);
    }
    if !case.patient_demographics.contains("year-old") {
        pass.penalize(15.0, Issue::PoorDemographics);
    }

    pass
}

/// Recommendations triggered by a result's issues, each at most once.
pub fn recommendations_for(issues: &[Issue]) -> Vec<String> {
    RECOMMENDATIONS
        .iter()
        .filter(|(code, _)| issues.iter().any(|issue| issue.code() == *code))
        .map(|(_, text)| text.to_string())
        .collect()
}

impl CaseScorer for ComprehensiveScorer {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Comprehensive
    }

    fn score(&self, mcq: &Mcq, outcome: &CaseOutcome) -> AnalysisResult {
        let case = outcome.case();
        let matcher = self.matcher.as_ref();
        let purpose = detect_question_purpose_with(&mcq.question_text, &self.vocabulary, matcher);
        let content = extract_critical_content_with(&mcq.question_text, &self.vocabulary, matcher);
        let presentation = case.clinical_presentation.to_lowercase();

        let passes = [
            (
                Component::ContentPreservation,
                self.analyze_content_preservation(&content, &presentation),
            ),
            (
                Component::PurposeAlignment,
                self.analyze_purpose_alignment(purpose, case, &presentation),
            ),
            (
                Component::ClinicalRealism,
                self.analyze_clinical_realism(case),
            ),
            (
                Component::EducationalValue,
                self.analyze_educational_value(
                    &mcq.question_text,
                    purpose,
                    &case.clinical_presentation,
                ),
            ),
        ];

        let mut result = AnalysisResult::new(mcq, self.mode());
        result.educational_purpose = Some(purpose);
        result.critical_content = Some(content);
        result.generated_case = Some(case.clone());
        result.fallback_used = outcome.is_fallback();

        for (component, pass) in passes {
            result.components.insert(component, pass.value());
            result.issues.extend(pass.issues);
        }

        if outcome.is_fallback() {
            result.quality_score = FALLBACK_SCORE;
            result.issues.push(Issue::FallbackUsed);
        } else {
            let total: f64 = result.components.values().sum();
            result.quality_score = total / result.components.len() as f64;
        }

        result.recommendations = recommendations_for(&result.issues);
        result
    }
}
