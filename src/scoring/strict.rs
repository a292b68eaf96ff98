//! Strict scorer with a critical-failure gate.
//!
//! A case fails critically when it is a fallback, has almost no content,
//! lost two or more strict critical terms, or drifted to another medical
//! domain. Failed cases score 20 with every component at 0; the rest get the
//! mean of four component scores.

use std::sync::Arc;

use super::comprehensive::clinical_realism_pass;
use super::{AnalysisMode, AnalysisResult, CaseScorer, Component, Issue, PassScore};
use crate::case::{CaseData, CaseOutcome};
use crate::content::{extract_age, extract_critical_medical_terms_with};
use crate::matcher::{SubstringMatcher, TermMatcher};
use crate::mcq::Mcq;
use crate::purpose::{detect_question_type, QuestionType};
use crate::vocabulary::Vocabulary;

/// Overall score of a critically failed case.
pub const CRITICAL_FAILURE_SCORE: f64 = 20.0;

/// Missing strict critical terms listed in the issue.
const MISSING_TERMS_LISTED: usize = 3;

#[derive(Debug)]
pub struct StrictScorer {
    vocabulary: Arc<Vocabulary>,
    matcher: Box<dyn TermMatcher>,
}

impl Default for StrictScorer {
    fn default() -> Self {
        Self::new(Arc::new(Vocabulary::default()))
    }
}

impl StrictScorer {
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

    pub fn score_content_preservation(
        &self,
        question_text: &str,
        presentation: &str,
        missing_terms: usize,
    ) -> f64 {
        let mut pass = PassScore::default();
        pass.deduct(20.0 * missing_terms as f64);

        let original = question_text.to_lowercase();
        let generated = presentation.to_lowercase();

        if let (Some(a), Some(b)) = (extract_age(&original), extract_age(&generated)) {
            if a.abs_diff(b) > 15 {
                pass.deduct(10.0);
            }
        }

        // substring match: "male" is found inside "female"
        let m = self.matcher.as_ref();
        let swapped = (m.contains(&original, "female") && m.contains(&generated, "male"))
            || (m.contains(&original, "male") && m.contains(&generated, "female"));
        if swapped {
            pass.deduct(15.0);
        }

        pass.value()
    }

    pub fn score_purpose_alignment(&self, expected: QuestionType, generated: &str) -> f64 {
        let generated = generated.trim();
        if expected.as_str() == generated {
            100.0
        } else if expected.acceptable_alternatives().contains(&generated) {
            90.0
        } else {
            70.0
        }
    }

    pub fn score_clinical_realism(&self, case: &CaseData) -> f64 {
        clinical_realism_pass(case, &self.vocabulary, self.matcher.as_ref()).value()
    }

    pub fn score_educational_value(&self, question_text: &str, presentation: &str) -> f64 {
        let mut pass = PassScore::default();

        if presentation.chars().count() < 100 {
            pass.deduct(15.0);
        }

        let question = question_text.to_lowercase();
        let case = presentation.to_lowercase();
        if self
            .matcher
            .any(&question, &self.vocabulary.strict_advanced_markers)
            && !self
                .matcher
                .any(&case, &self.vocabulary.strict_detail_indicators)
        {
            pass.deduct(20.0);
        }

        pass.value()
    }
}

impl CaseScorer for StrictScorer {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Strict
    }

    fn score(&self, mcq: &Mcq, outcome: &CaseOutcome) -> AnalysisResult {
        let case = outcome.case();
        let presentation = &case.clinical_presentation;
        let expected_type = detect_question_type(&mcq.question_text);

        let mut result = AnalysisResult::new(mcq, self.mode());
        result.expected_question_type = Some(expected_type);
        result.generated_case = Some(case.clone());
        result.fallback_used = outcome.is_fallback();

        let mut critical = false;

        if outcome.is_fallback() {
            result.issues.push(Issue::FallbackUsed);
            critical = true;
        }

        if presentation.trim().chars().count() < 20 {
            result.issues.push(Issue::InsufficientContent);
            critical = true;
        }

        let lowered = presentation.to_lowercase();
        let missing: Vec<String> = extract_critical_medical_terms_with(
            &mcq.question_text,
            &self.vocabulary,
            self.matcher.as_ref(),
        )
        .into_iter()
        .filter(|term| !self.matcher.contains(&lowered, term))
        .collect();
        if !missing.is_empty() {
            let listed = missing.iter().take(MISSING_TERMS_LISTED).cloned().collect();
            result.issues.push(Issue::MissingCriticalTerms(listed));
            if missing.len() >= 2 {
                critical = true;
            }
        }

        let domains = self.vocabulary.domain_topics.compare(
            &mcq.question_text,
            presentation,
            self.matcher.as_ref(),
        );
        if domains.is_mismatch() {
            result.issues.push(Issue::MajorTopicDrift);
            critical = true;
        }

        result.critical_failure = critical;
        if critical {
            for component in self.mode().components() {
                result.components.insert(*component, 0.0);
            }
            result.quality_score = CRITICAL_FAILURE_SCORE;
            return result;
        }

        let scores = [
            (
                Component::ContentPreservation,
                self.score_content_preservation(&mcq.question_text, presentation, missing.len()),
            ),
            (
                Component::PurposeAlignment,
                self.score_purpose_alignment(expected_type, &case.question_type),
            ),
            (Component::ClinicalRealism, self.score_clinical_realism(case)),
            (
                Component::EducationalValue,
                self.score_educational_value(&mcq.question_text, presentation),
            ),
        ];
        result.components.extend(scores);
        result.quality_score =
            result.components.values().sum::<f64>() / result.components.len() as f64;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::WholeWordMatcher;

    fn generated(presentation: &str, question_type: &str) -> CaseOutcome {
        CaseOutcome::Generated(CaseData {
            clinical_presentation: presentation.to_string(),
            patient_demographics: "58-year-old male".to_string(),
            question_type: question_type.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_fallback_is_critical() {
        let scorer = StrictScorer::default();
        let mcq = Mcq::new(1, "What is the most likely diagnosis?", "General");
        let outcome = CaseOutcome::Fallback(CaseData {
            clinical_presentation:
                "A 45-year-old male presents to the neurology clinic with symptoms requiring evaluation."
                    .to_string(),
            ..Default::default()
        });
        let result = scorer.score(&mcq, &outcome);
        assert!(result.critical_failure);
        assert_eq!(result.quality_score, 20.0);
        assert_eq!(result.issues, vec![Issue::FallbackUsed]);
        assert!(result.components.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_single_missing_term_is_not_critical() {
        let scorer = StrictScorer::default();
        let mcq = Mcq::new(
            2,
            "A 58-year-old man has new ptosis. What is the most likely diagnosis?",
            "Neuro-ophthalmology",
        );
        let result = scorer.score(
            &mcq,
            &generated(
                "A 58-year-old man reports 3 days of a drooping right eyelid noticed by his wife.",
                "diagnosis",
            ),
        );
        assert!(!result.critical_failure);
        assert_eq!(
            result.issues,
            vec![Issue::MissingCriticalTerms(vec!["ptosis".into()])]
        );
        assert_eq!(result.component(Component::ContentPreservation), Some(80.0));
        assert_eq!(result.component(Component::PurposeAlignment), Some(100.0));
        assert_eq!(result.component(Component::ClinicalRealism), Some(100.0));
        assert_eq!(result.component(Component::EducationalValue), Some(85.0));
        assert_eq!(result.quality_score, 91.25);
    }

    #[test]
    fn test_two_missing_terms_are_critical() {
        let scorer = StrictScorer::default();
        let mcq = Mcq::new(3, "Ptosis and miosis after neck trauma", "Neuro-ophthalmology");
        let result = scorer.score(
            &mcq,
            &generated("The patient reports 2 days of neck pain after a fall.", "diagnosis"),
        );
        assert!(result.critical_failure);
        assert_eq!(
            result.issues,
            vec![Issue::MissingCriticalTerms(vec![
                "ptosis".into(),
                "miosis".into()
            ])]
        );
        assert_eq!(result.quality_score, CRITICAL_FAILURE_SCORE);
    }

    #[test]
    fn test_major_topic_drift() {
        let scorer = StrictScorer::default();
        let mcq = Mcq::new(4, "Sudden infarct with hemiparesis", "Vascular");
        let result = scorer.score(
            &mcq,
            &generated(
                "The patient reports a resting tremor for 2 years with bradykinesia.",
                "diagnosis",
            ),
        );
        assert!(result.critical_failure);
        assert!(result.has_issue("MAJOR_TOPIC_DRIFT"));
    }

    #[test]
    fn test_content_preservation_demographics() {
        let scorer = StrictScorer::default();
        assert_eq!(
            scorer.score_content_preservation(
                "a 30-year-old female",
                "a 60-year-old male",
                0
            ),
            75.0
        );
        // "female" in both texts still reads as a swap
        assert_eq!(
            scorer.score_content_preservation("a 30-year-old female", "a 32-year-old female", 0),
            85.0
        );
        assert_eq!(
            scorer.score_content_preservation("a 30-year-old man", "a 32-year-old man", 0),
            100.0
        );
        assert_eq!(scorer.score_content_preservation("", "", 6), 0.0);
    }

    #[test]
    fn test_content_preservation_whole_word_matcher() {
        let scorer = StrictScorer::default().with_matcher(Box::new(WholeWordMatcher));
        assert_eq!(
            scorer.score_content_preservation("a 30-year-old female", "a 32-year-old female", 0),
            100.0
        );
        assert_eq!(
            scorer.score_content_preservation("a 30-year-old female", "a 32-year-old male", 0),
            85.0
        );
    }

    #[test]
    fn test_purpose_alignment() {
        let scorer = StrictScorer::default();
        assert_eq!(
            scorer.score_purpose_alignment(QuestionType::Management, "management"),
            100.0
        );
        assert_eq!(
            scorer.score_purpose_alignment(QuestionType::Management, "advanced_management"),
            90.0
        );
        assert_eq!(
            scorer.score_purpose_alignment(QuestionType::Localization, "diagnosis"),
            70.0
        );
    }

    #[test]
    fn test_educational_value_advanced() {
        let scorer = StrictScorer::default();
        let long = "x".repeat(120);
        assert_eq!(scorer.score_educational_value("refractory epilepsy", &long), 80.0);
        let detailed = format!("{} failed two drugs", long);
        assert_eq!(scorer.score_educational_value("refractory epilepsy", &detailed), 100.0);
    }
}
