//! MCQ to clinical case conversion.
//!
//! Three interchangeable converters produce [`CaseOutcome`]s for the scorers:
//! an offline template converter, an LLM-backed converter and a replay
//! converter serving cases recorded by an earlier run.

pub mod llm;
pub mod profile;
pub mod replay;
pub mod template;
pub mod validation;

pub use llm::LlmConverter;
pub use profile::{Gender, PatientProfile};
pub use replay::ReplayConverter;
pub use template::TemplateConverter;
pub use validation::{validate_draft, CaseDraft, ValidationReport, DEFAULT_VALIDATION_THRESHOLD};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::answer_context::AnswerContext;
use crate::case::CaseOutcome;
use crate::error::ConversionError;
use crate::mcq::Mcq;
use crate::purpose::{assess_complexity, detect_question_type, CaseComplexity, QuestionType};

#[async_trait]
pub trait CaseConverter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn convert(&self, mcq: &Mcq) -> Result<CaseOutcome, ConversionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    Template,
    Llm,
    Replay,
}

impl ConverterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConverterKind::Template => "template",
            ConverterKind::Llm => "llm",
            ConverterKind::Replay => "replay",
        }
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "template" => Ok(ConverterKind::Template),
            "llm" => Ok(ConverterKind::Llm),
            "replay" => Ok(ConverterKind::Replay),
            other => Err(format!("Unknown converter: {}", other)),
        }
    }
}

/// Keywords expected in stems of well-classified questions, per subspecialty.
const SPECIALTY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Movement Disorders",
        &["parkinson", "dystonia", "chorea", "tremor", "bradykinesia", "rigidity"],
    ),
    ("Epilepsy", &["seizure", "epilep", "convuls", "ictal", "postictal"]),
    (
        "Stroke/Vascular",
        &["stroke", "hemorrhage", "infarct", "tpa", "thrombo", "ischemic"],
    ),
    (
        "Dementia",
        &["alzheimer", "dementia", "memory", "cognitive", "confusion"],
    ),
    ("Headache", &["headache", "migraine", "cluster", "tension"]),
    (
        "Neuromuscular",
        &["myasthenia", "neuropathy", "myopathy", "weakness", "muscle"],
    ),
];

/// Everything the converters derive from an MCQ before generating a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub question_type: QuestionType,
    pub complexity: CaseComplexity,
    pub profile: PatientProfile,
    /// Share of the subspecialty's keywords present in the stem; 0.5 when unassigned.
    pub specialty_confidence: f64,
    pub answer: AnswerContext,
}

impl QuestionAnalysis {
    pub fn of(mcq: &Mcq) -> Self {
        Self {
            question_type: detect_question_type(&mcq.question_text),
            complexity: assess_complexity(&mcq.question_text),
            profile: PatientProfile::extract(&mcq.question_text),
            specialty_confidence: specialty_confidence(mcq),
            answer: AnswerContext::build(mcq),
        }
    }
}

fn specialty_confidence(mcq: &Mcq) -> f64 {
    let specialty = mcq.subspecialty.trim();
    if specialty.is_empty() {
        return 0.5;
    }

    let text = mcq.question_text.to_lowercase();
    let keywords = SPECIALTY_KEYWORDS
        .iter()
        .find(|(name, _)| *name == specialty)
        .map(|(_, keywords)| *keywords)
        .unwrap_or(&[]);
    let matches = keywords.iter().filter(|k| text.contains(*k)).count();
    (matches as f64 / keywords.len().max(1) as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter_kind_parse() {
        assert_eq!("LLM".parse::<ConverterKind>().unwrap(), ConverterKind::Llm);
        assert_eq!(ConverterKind::Replay.to_string(), "replay");
        assert!("gpt".parse::<ConverterKind>().is_err());
    }

    #[test]
    fn test_specialty_confidence() {
        let mcq = Mcq::new(1, "Focal seizure with postictal confusion", "Epilepsy");
        // seizure, ictal, postictal out of five
        assert!((specialty_confidence(&mcq) - 0.6).abs() < 1e-9);

        assert_eq!(specialty_confidence(&Mcq::new(2, "x", "")), 0.5);
        assert_eq!(specialty_confidence(&Mcq::new(3, "x", "Neuro-oncology")), 0.0);
    }

    #[test]
    fn test_analysis_of_mcq() {
        let mcq = Mcq::new(
            4,
            "A 67-year-old woman with refractory tremor failed two drugs. What is the next step in management?",
            "Movement Disorders",
        );
        let analysis = QuestionAnalysis::of(&mcq);
        assert_eq!(analysis.question_type, QuestionType::Management);
        assert_eq!(analysis.profile.demographics(), "67-year-old female");
        assert!(analysis.specialty_confidence > 0.0);
    }
}
