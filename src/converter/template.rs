//! Offline case generation from the MCQ stem itself.
//!
//! The vignette is the stem with its interrogative sentences removed; the
//! closing question comes from the detected question type. Drafts that fail
//! validation are replaced by a generic case and reported as fallbacks.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::validation::{validate_draft, CaseDraft, PresentationDraft};
use super::{CaseConverter, QuestionAnalysis};
use crate::case::{CaseData, CaseOutcome};
use crate::error::ConversionError;
use crate::mcq::Mcq;

const INTERROGATIVE_OPENERS: &[&str] = &["which ", "what ", "where ", "how ", "why "];

#[derive(Debug, Clone)]
pub struct TemplateConverter {
    validation_threshold: f64,
}

impl TemplateConverter {
    pub fn new(validation_threshold: f64) -> Self {
        Self {
            validation_threshold,
        }
    }

    pub fn draft(&self, mcq: &Mcq, analysis: &QuestionAnalysis) -> CaseDraft {
        let vignette = strip_interrogatives(&mcq.question_text);
        let chief_complaint = split_sentences(&vignette)
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut learning_objectives = analysis.answer.learning_objectives.clone();
        if let Some(focus) = &analysis.answer.anatomical_focus {
            learning_objectives.push(format!("Localize the lesion to the {}", focus));
        }

        CaseDraft {
            source_mcq_id: Some(mcq.id.into()),
            clinical_presentation: PresentationDraft {
                chief_complaint,
                history_present_illness: vignette,
                ..Default::default()
            },
            question_prompt: analysis.question_type.case_prompt().to_string(),
            core_concept_type: analysis.question_type.as_str().to_string(),
            learning_objectives,
        }
    }
}

#[async_trait]
impl CaseConverter for TemplateConverter {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn convert(&self, mcq: &Mcq) -> Result<CaseOutcome, ConversionError> {
        if mcq.question_text.trim().is_empty() {
            return Err(ConversionError::EmptyQuestion(mcq.id));
        }

        let analysis = QuestionAnalysis::of(mcq);
        let draft = self.draft(mcq, &analysis);
        let report = validate_draft(mcq, &draft, self.validation_threshold);

        if report.passed() {
            debug!(mcq_id = mcq.id, score = report.score, "Template draft accepted");
            Ok(CaseOutcome::Generated(case_from_draft(&draft, &analysis)))
        } else {
            let issues: Vec<&String> = report.issues().collect();
            warn!(
                mcq_id = mcq.id,
                score = report.score,
                issues = ?issues,
                "Template draft rejected, using fallback case"
            );
            Ok(CaseOutcome::Fallback(fallback_case(mcq, &analysis)))
        }
    }
}

/// Case record for an accepted draft.
pub fn case_from_draft(draft: &CaseDraft, analysis: &QuestionAnalysis) -> CaseData {
    CaseData {
        clinical_presentation: draft.presentation_text(),
        patient_demographics: analysis.profile.demographics(),
        question_type: analysis.question_type.as_str().to_string(),
        question_prompt: Some(draft.question_prompt.clone()).filter(|p| !p.trim().is_empty()),
        learning_objectives: draft.learning_objectives.clone(),
    }
}

/// Generic case used when no acceptable draft could be produced.
pub fn fallback_case(mcq: &Mcq, analysis: &QuestionAnalysis) -> CaseData {
    let specialty = mcq.subspecialty.trim();
    let area = if specialty.is_empty() {
        "neurology".to_string()
    } else {
        specialty.to_lowercase()
    };

    CaseData {
        clinical_presentation: format!(
            "A {} presents to the {} clinic with symptoms requiring evaluation.",
            analysis.profile.description(),
            area
        ),
        patient_demographics: analysis.profile.demographics(),
        question_type: analysis.question_type.as_str().to_string(),
        question_prompt: Some(analysis.question_type.case_prompt().to_string()),
        learning_objectives: analysis.answer.learning_objectives.clone(),
    }
}

/// Sentences ending in '.', '!' or '?', trimmed; a trailing fragment counts as one.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

fn is_interrogative(sentence: &str) -> bool {
    let lowered = sentence.to_lowercase();
    sentence.ends_with('?') || INTERROGATIVE_OPENERS.iter().any(|o| lowered.starts_with(o))
}

/// The stem without its question sentences.
pub fn strip_interrogatives(question_text: &str) -> String {
    split_sentences(question_text)
        .into_iter()
        .filter(|s| !is_interrogative(s))
        .collect::<Vec<_>>()
        .join(" ")
}
