//! Case quality scoring.
//!
//! Three scorers judge a generated case against the MCQ it came from:
//!
//! - **comprehensive** - four component passes (content preservation, purpose
//!   alignment, clinical realism, educational value) averaged into one score
//! - **preservation** - key-term preservation with an issue walk that zeroes
//!   the score on critical terms or topic mismatch
//! - **strict** - critical-failure gate first, component scores only for
//!   cases that pass it
//!
//! Scorers never fail. Every defect is a penalty plus an [`Issue`]; converter
//! errors become [`AnalysisResult::conversion_error`] records.

pub mod comprehensive;
pub mod preservation;
pub mod strict;

pub use comprehensive::ComprehensiveScorer;
pub use preservation::PreservationScorer;
pub use strict::StrictScorer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use crate::case::{CaseData, CaseOutcome};
use crate::content::CriticalContent;
use crate::mcq::Mcq;
use crate::purpose::{QuestionPurpose, QuestionType};
use crate::vocabulary::Vocabulary;

/// Characters of the question stem kept in a result.
const QUESTION_PREVIEW_CHARS: usize = 200;

// ============================================================================
// Issues
// ============================================================================

/// A defect found in a generated case.
///
/// Serialized as the display string, e.g. `"MISSING_CONDITION: horner syndrome"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Issue {
    ConversionError,
    FallbackUsed,
    MissingCondition(String),
    MissingLocation(String),
    MissingSign(String),
    MissingProcedure(String),
    PurposeMismatch { purpose: String, case_type: String },
    MissingTreatmentFailureContext,
    MissingMedicationDetails,
    InsufficientLength,
    NonClinicalLanguage,
    LacksSpecificDetails,
    PoorDemographics,
    TopicDrift {
        original: Vec<String>,
        generated: Vec<String>,
    },
    InsufficientComplexityForAdvanced,
    InsufficientContent,
    CriticalTermMissing(String),
    TopicMismatch,
    InsufficientDetailForAdvanced,
    MissingCriticalTerms(Vec<String>),
    MajorTopicDrift,
}

impl Issue {
    pub fn code(&self) -> &'static str {
        match self {
            Issue::ConversionError => "CONVERSION_ERROR",
            Issue::FallbackUsed => "FALLBACK_USED",
            Issue::MissingCondition(_) => "MISSING_CONDITION",
            Issue::MissingLocation(_) => "MISSING_LOCATION",
            Issue::MissingSign(_) => "MISSING_SIGN",
            Issue::MissingProcedure(_) => "MISSING_PROCEDURE",
            Issue::PurposeMismatch { .. } => "PURPOSE_MISMATCH",
            Issue::MissingTreatmentFailureContext => "MISSING_TREATMENT_FAILURE_CONTEXT",
            Issue::MissingMedicationDetails => "MISSING_MEDICATION_DETAILS",
            Issue::InsufficientLength => "INSUFFICIENT_LENGTH",
            Issue::NonClinicalLanguage => "NON_CLINICAL_LANGUAGE",
            Issue::LacksSpecificDetails => "LACKS_SPECIFIC_DETAILS",
            Issue::PoorDemographics => "POOR_DEMOGRAPHICS",
            Issue::TopicDrift { .. } => "TOPIC_DRIFT",
            Issue::InsufficientComplexityForAdvanced => "INSUFFICIENT_COMPLEXITY_FOR_ADVANCED",
            Issue::InsufficientContent => "INSUFFICIENT_CONTENT",
            Issue::CriticalTermMissing(_) => "CRITICAL_TERM_MISSING",
            Issue::TopicMismatch => "TOPIC_MISMATCH",
            Issue::InsufficientDetailForAdvanced => "INSUFFICIENT_DETAIL_FOR_ADVANCED",
            Issue::MissingCriticalTerms(_) => "MISSING_CRITICAL_TERMS",
            Issue::MajorTopicDrift => "MAJOR_TOPIC_DRIFT",
        }
    }

    fn unit(code: &str) -> Option<Issue> {
        let issue = match code {
            "CONVERSION_ERROR" => Issue::ConversionError,
            "FALLBACK_USED" => Issue::FallbackUsed,
            "MISSING_TREATMENT_FAILURE_CONTEXT" => Issue::MissingTreatmentFailureContext,
            "MISSING_MEDICATION_DETAILS" => Issue::MissingMedicationDetails,
            "INSUFFICIENT_LENGTH" => Issue::InsufficientLength,
            "NON_CLINICAL_LANGUAGE" => Issue::NonClinicalLanguage,
            "LACKS_SPECIFIC_DETAILS" => Issue::LacksSpecificDetails,
            "POOR_DEMOGRAPHICS" => Issue::PoorDemographics,
            "INSUFFICIENT_COMPLEXITY_FOR_ADVANCED" => Issue::InsufficientComplexityForAdvanced,
            "INSUFFICIENT_CONTENT" => Issue::InsufficientContent,
            "TOPIC_MISMATCH" => Issue::TopicMismatch,
            "INSUFFICIENT_DETAIL_FOR_ADVANCED" => Issue::InsufficientDetailForAdvanced,
            "MAJOR_TOPIC_DRIFT" => Issue::MajorTopicDrift,
            _ => return None,
        };
        Some(issue)
    }
}

fn join_list(items: &[String]) -> String {
    items.join(", ")
}

fn split_list(text: &str) -> Vec<String> {
    text.split(", ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingCondition(term)
            | Issue::MissingLocation(term)
            | Issue::MissingSign(term)
            | Issue::MissingProcedure(term)
            | Issue::CriticalTermMissing(term) => write!(f, "{}: {}", self.code(), term),
            Issue::PurposeMismatch { purpose, case_type } => {
                write!(f, "{}: {} → {}", self.code(), purpose, case_type)
            }
            Issue::TopicDrift {
                original,
                generated,
            } => write!(
                f,
                "{}: {} → {}",
                self.code(),
                join_list(original),
                join_list(generated)
            ),
            Issue::MissingCriticalTerms(terms) => {
                write!(f, "{}: {}", self.code(), join_list(terms))
            }
            _ => f.write_str(self.code()),
        }
    }
}

impl FromStr for Issue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((code, detail)) = s.split_once(": ") else {
            return Issue::unit(s).ok_or_else(|| format!("Unknown issue: {}", s));
        };

        let detail = detail.trim().to_string();
        let arrow = |detail: &str| {
            detail
                .split_once(" → ")
                .map(|(a, b)| (a.trim().to_string(), b.trim().to_string()))
                .ok_or_else(|| format!("Malformed issue: {}", s))
        };

        match code {
            "MISSING_CONDITION" => Ok(Issue::MissingCondition(detail)),
            "MISSING_LOCATION" => Ok(Issue::MissingLocation(detail)),
            "MISSING_SIGN" => Ok(Issue::MissingSign(detail)),
            "MISSING_PROCEDURE" => Ok(Issue::MissingProcedure(detail)),
            "CRITICAL_TERM_MISSING" => Ok(Issue::CriticalTermMissing(detail)),
            "MISSING_CRITICAL_TERMS" => Ok(Issue::MissingCriticalTerms(split_list(&detail))),
            "PURPOSE_MISMATCH" => {
                let (purpose, case_type) = arrow(&detail)?;
                Ok(Issue::PurposeMismatch { purpose, case_type })
            }
            "TOPIC_DRIFT" => {
                let (original, generated) = arrow(&detail)?;
                Ok(Issue::TopicDrift {
                    original: split_list(&original),
                    generated: split_list(&generated),
                })
            }
            _ => Err(format!("Unknown issue: {}", s)),
        }
    }
}

impl From<Issue> for String {
    fn from(issue: Issue) -> Self {
        issue.to_string()
    }
}

impl TryFrom<String> for Issue {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Components and modes
// ============================================================================

/// Sub-scores a mode can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    ContentPreservation,
    PurposeAlignment,
    ClinicalRealism,
    EducationalValue,
    TermPreservation,
    AdvancedDetail,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::ContentPreservation => "content_preservation",
            Component::PurposeAlignment => "purpose_alignment",
            Component::ClinicalRealism => "clinical_realism",
            Component::EducationalValue => "educational_value",
            Component::TermPreservation => "term_preservation",
            Component::AdvancedDetail => "advanced_detail",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Component::ContentPreservation => "Content Preservation",
            Component::PurposeAlignment => "Purpose Alignment",
            Component::ClinicalRealism => "Clinical Realism",
            Component::EducationalValue => "Educational Value",
            Component::TermPreservation => "Term Preservation",
            Component::AdvancedDetail => "Advanced Detail",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityBand {
    pub fn all() -> [QualityBand; 4] {
        [
            QualityBand::Excellent,
            QualityBand::Good,
            QualityBand::Fair,
            QualityBand::Poor,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityBand::Excellent => "EXCELLENT",
            QualityBand::Good => "GOOD",
            QualityBand::Fair => "FAIR",
            QualityBand::Poor => "POOR",
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds of the excellent, good and fair bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandThresholds {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Comprehensive,
    Preservation,
    Strict,
}

impl AnalysisMode {
    pub fn all() -> Vec<AnalysisMode> {
        vec![
            AnalysisMode::Comprehensive,
            AnalysisMode::Preservation,
            AnalysisMode::Strict,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            AnalysisMode::Comprehensive => "comprehensive",
            AnalysisMode::Preservation => "preservation",
            AnalysisMode::Strict => "strict",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisMode::Comprehensive => "Comprehensive case analysis",
            AnalysisMode::Preservation => "Key-term preservation testing",
            AnalysisMode::Strict => "Strict critical-failure testing",
        }
    }

    pub fn bands(&self) -> BandThresholds {
        match self {
            AnalysisMode::Comprehensive => BandThresholds {
                excellent: 80.0,
                good: 60.0,
                fair: 40.0,
            },
            AnalysisMode::Preservation => BandThresholds {
                excellent: 90.0,
                good: 70.0,
                fair: 50.0,
            },
            AnalysisMode::Strict => BandThresholds {
                excellent: 90.0,
                good: 75.0,
                fair: 60.0,
            },
        }
    }

    pub fn band(&self, score: f64) -> QualityBand {
        let bands = self.bands();
        if score >= bands.excellent {
            QualityBand::Excellent
        } else if score >= bands.good {
            QualityBand::Good
        } else if score >= bands.fair {
            QualityBand::Fair
        } else {
            QualityBand::Poor
        }
    }

    /// Whether a result counts towards the mode's success rate.
    pub fn is_success(&self, result: &AnalysisResult) -> bool {
        match self {
            AnalysisMode::Strict => !result.critical_failure,
            AnalysisMode::Comprehensive | AnalysisMode::Preservation => matches!(
                self.band(result.quality_score),
                QualityBand::Excellent | QualityBand::Good
            ),
        }
    }

    /// Components every result of this mode carries.
    pub fn components(&self) -> &'static [Component] {
        match self {
            AnalysisMode::Comprehensive | AnalysisMode::Strict => &[
                Component::ContentPreservation,
                Component::PurposeAlignment,
                Component::ClinicalRealism,
                Component::EducationalValue,
            ],
            AnalysisMode::Preservation => {
                &[Component::TermPreservation, Component::ClinicalRealism]
            }
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comprehensive" => Ok(AnalysisMode::Comprehensive),
            "preservation" => Ok(AnalysisMode::Preservation),
            "strict" => Ok(AnalysisMode::Strict),
            other => Err(format!("Unknown analysis mode: {}", other)),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Key terms expected in the case and which of them survived.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermPreservation {
    pub expected: Vec<String>,
    pub preserved: Vec<String>,
    pub missing: Vec<String>,
    /// Preserved share, 0-100.
    pub rate: f64,
}

/// Scored record for one MCQ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub mcq_id: i64,
    pub subspecialty: String,
    pub mode: AnalysisMode,
    pub original_question: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub educational_purpose: Option<QuestionPurpose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_question_type: Option<QuestionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_content: Option<CriticalContent>,
    #[serde(default)]
    pub components: BTreeMap<Component, f64>,
    pub quality_score: f64,
    #[serde(default)]
    pub critical_failure: bool,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_case: Option<CaseData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_preservation: Option<TermPreservation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Empty record for `mcq`; scorers fill in the rest.
    pub fn new(mcq: &Mcq, mode: AnalysisMode) -> Self {
        Self {
            mcq_id: mcq.id,
            subspecialty: mcq.subspecialty.trim().to_string(),
            mode,
            original_question: preview(&mcq.question_text),
            correct_answer: mcq.correct_answer.clone(),
            educational_purpose: None,
            expected_question_type: None,
            critical_content: None,
            components: BTreeMap::new(),
            quality_score: 0.0,
            critical_failure: false,
            fallback_used: false,
            issues: Vec::new(),
            recommendations: Vec::new(),
            generated_case: None,
            term_preservation: None,
            error: None,
        }
    }

    /// Record for an MCQ whose conversion failed: score 0, every mode
    /// component 0, counted as a critical failure.
    pub fn conversion_error(mcq: &Mcq, mode: AnalysisMode, error: &dyn fmt::Display) -> Self {
        let mut result = Self::new(mcq, mode);
        for component in mode.components() {
            result.components.insert(*component, 0.0);
        }
        result.critical_failure = true;
        result.issues.push(Issue::ConversionError);
        result.error = Some(error.to_string());
        result
    }

    pub fn component(&self, component: Component) -> Option<f64> {
        self.components.get(&component).copied()
    }

    pub fn band(&self) -> QualityBand {
        self.mode.band(self.quality_score)
    }

    pub fn has_issue(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code() == code)
    }

    pub fn is_conversion_error(&self) -> bool {
        self.error.is_some() || self.has_issue("CONVERSION_ERROR")
    }
}

fn preview(question_text: &str) -> String {
    let text = question_text.trim();
    if text.chars().count() > QUESTION_PREVIEW_CHARS {
        let head: String = text.chars().take(QUESTION_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Running score of one pass: starts at 100, floored at 0 when read.
#[derive(Debug, Clone, PartialEq)]
pub struct PassScore {
    points: f64,
    pub issues: Vec<Issue>,
}

impl Default for PassScore {
    fn default() -> Self {
        Self {
            points: 100.0,
            issues: Vec::new(),
        }
    }
}

impl PassScore {
    pub fn penalize(&mut self, points: f64, issue: Issue) {
        self.points -= points;
        self.issues.push(issue);
    }

    pub fn deduct(&mut self, points: f64) {
        self.points -= points;
    }

    pub fn value(&self) -> f64 {
        self.points.max(0.0)
    }
}

pub(crate) fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

// ============================================================================
// Scorer trait
// ============================================================================

pub trait CaseScorer: Send + Sync + fmt::Debug {
    fn mode(&self) -> AnalysisMode;

    fn score(&self, mcq: &Mcq, outcome: &CaseOutcome) -> AnalysisResult;
}

pub fn scorer_for(mode: AnalysisMode, vocabulary: Arc<Vocabulary>) -> Box<dyn CaseScorer> {
    match mode {
        AnalysisMode::Comprehensive => Box::new(ComprehensiveScorer::new(vocabulary)),
        AnalysisMode::Preservation => Box::new(PreservationScorer::new(vocabulary)),
        AnalysisMode::Strict => Box::new(StrictScorer::new(vocabulary)),
    }
}

/// Comprehensive score of one case with the built-in vocabulary.
pub fn evaluate_case_quality(mcq: &Mcq, outcome: &CaseOutcome) -> AnalysisResult {
    static SCORER: OnceLock<ComprehensiveScorer> = OnceLock::new();
    SCORER.get_or_init(ComprehensiveScorer::default).score(mcq, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display_strings() {
        assert_eq!(Issue::FallbackUsed.to_string(), "FALLBACK_USED");
        assert_eq!(
            Issue::MissingCondition("horner syndrome".into()).to_string(),
            "MISSING_CONDITION: horner syndrome"
        );
        assert_eq!(
            Issue::PurposeMismatch {
                purpose: "diagnosis".into(),
                case_type: "management".into()
            }
            .to_string(),
            "PURPOSE_MISMATCH: diagnosis → management"
        );
        assert_eq!(
            Issue::TopicDrift {
                original: vec!["eye".into(), "stroke".into()],
                generated: vec!["movement".into()]
            }
            .to_string(),
            "TOPIC_DRIFT: eye, stroke → movement"
        );
        assert_eq!(
            Issue::MissingCriticalTerms(vec!["stroke".into(), "tia".into()]).to_string(),
            "MISSING_CRITICAL_TERMS: stroke, tia"
        );
    }

    #[test]
    fn test_issue_parse() {
        for text in [
            "CONVERSION_ERROR",
            "MISSING_SIGN: ptosis",
            "PURPOSE_MISMATCH: localization → unknown",
            "TOPIC_DRIFT: seizure → movement, stroke",
            "CRITICAL_TERM_MISSING: caudate",
            "MISSING_CRITICAL_TERMS: ms, parkinson, tremor",
            "MAJOR_TOPIC_DRIFT",
        ] {
            let issue: Issue = text.parse().unwrap();
            assert_eq!(issue.to_string(), text);
        }
        assert!("NOT_AN_ISSUE".parse::<Issue>().is_err());
        assert!("PURPOSE_MISMATCH: no arrow".parse::<Issue>().is_err());
    }

    #[test]
    fn test_issue_serializes_as_string() {
        let json = serde_json::to_string(&vec![Issue::TopicMismatch]).unwrap();
        assert_eq!(json, r#"["TOPIC_MISMATCH"]"#);
        let back: Vec<Issue> = serde_json::from_str(r#"["MISSING_LOCATION: pons"]"#).unwrap();
        assert_eq!(back, vec![Issue::MissingLocation("pons".into())]);
    }

    #[test]
    fn test_mode_bands() {
        assert_eq!(AnalysisMode::Comprehensive.band(80.0), QualityBand::Excellent);
        assert_eq!(AnalysisMode::Comprehensive.band(79.9), QualityBand::Good);
        assert_eq!(AnalysisMode::Comprehensive.band(30.0), QualityBand::Poor);
        assert_eq!(AnalysisMode::Preservation.band(70.0), QualityBand::Good);
        assert_eq!(AnalysisMode::Preservation.band(50.0), QualityBand::Fair);
        assert_eq!(AnalysisMode::Strict.band(74.9), QualityBand::Fair);
        assert_eq!(AnalysisMode::Strict.band(20.0), QualityBand::Poor);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Strict".parse::<AnalysisMode>().unwrap(), AnalysisMode::Strict);
        assert!("cycle2".parse::<AnalysisMode>().is_err());
        assert_eq!(
            serde_json::to_string(&AnalysisMode::Preservation).unwrap(),
            "\"preservation\""
        );
    }

    #[test]
    fn test_conversion_error_record() {
        let mcq = Mcq::new(5, "q", " Epilepsy ");
        let result = AnalysisResult::conversion_error(&mcq, AnalysisMode::Strict, &"timeout");
        assert_eq!(result.quality_score, 0.0);
        assert_eq!(result.issues, vec![Issue::ConversionError]);
        assert_eq!(result.error.as_deref(), Some("timeout"));
        assert_eq!(result.subspecialty, "Epilepsy");
        assert_eq!(result.components.len(), 4);
        assert!(result.critical_failure);
        assert!(!AnalysisMode::Strict.is_success(&result));
    }

    #[test]
    fn test_question_preview_truncates() {
        let long = "a".repeat(250);
        let result = AnalysisResult::new(&Mcq::new(1, &long, "s"), AnalysisMode::Comprehensive);
        assert_eq!(result.original_question.chars().count(), 203);
        assert!(result.original_question.ends_with("..."));
    }

    #[test]
    fn test_pass_score_floor() {
        let mut pass = PassScore::default();
        pass.penalize(60.0, Issue::InsufficientLength);
        pass.deduct(60.0);
        assert_eq!(pass.value(), 0.0);
        assert_eq!(pass.issues.len(), 1);
    }

    #[test]
    fn test_components_serialize_by_name() {
        let mut result = AnalysisResult::new(&Mcq::new(1, "q", "s"), AnalysisMode::Comprehensive);
        result.components.insert(Component::ClinicalRealism, 85.0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["components"]["clinical_realism"], 85.0);
        let back: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
