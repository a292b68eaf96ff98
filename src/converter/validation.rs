//! Structural and content validation of case drafts.
//!
//! A draft fails outright when a required field is missing. Otherwise it
//! passes when the weighted validation score reaches the threshold.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::mcq::Mcq;

/// Threshold used by the converters unless configured otherwise.
pub const DEFAULT_VALIDATION_THRESHOLD: f64 = 70.0;

/// Score credited for the semantic check, which this crate does not run.
const SEMANTIC_BASELINE: f64 = 75.0;

const LATERALIZATION_TERMS: &[&str] = &["right", "left", "bilateral", "unilateral"];

/// Case in the JSON shape the generation prompt asks for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseDraft {
    #[serde(default)]
    pub source_mcq_id: Option<Value>,
    #[serde(default)]
    pub clinical_presentation: PresentationDraft,
    #[serde(default)]
    pub question_prompt: String,
    #[serde(default)]
    pub core_concept_type: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationDraft {
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub history_present_illness: String,
    #[serde(default)]
    pub past_medical_history: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub physical_examination: String,
    #[serde(default)]
    pub vital_signs: BTreeMap<String, Value>,
}

impl CaseDraft {
    /// MCQ id the draft claims to be for; numeric strings are accepted.
    pub fn claimed_mcq_id(&self) -> Option<i64> {
        match self.source_mcq_id.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Presentation text shown to the learner: history, then examination.
    pub fn presentation_text(&self) -> String {
        let presentation = &self.clinical_presentation;
        let history = presentation.history_present_illness.trim();
        let exam = presentation.physical_examination.trim();
        if exam.is_empty() {
            history.to_string()
        } else {
            format!("{}\n\nExamination: {}", history, exam)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub score: f64,
    pub structural_issues: Vec<String>,
    pub content_issues: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Passed
    }

    pub fn issues(&self) -> impl Iterator<Item = &String> {
        self.structural_issues.iter().chain(&self.content_issues)
    }

    pub fn summary(&self) -> String {
        let verdict = if self.score >= 90.0 {
            "Excellent case quality"
        } else if self.score >= 75.0 {
            "Good case quality"
        } else if self.score >= 60.0 {
            "Acceptable case quality"
        } else {
            "Poor case quality"
        };
        let issue_count = self.structural_issues.len() + self.content_issues.len();
        if issue_count == 0 {
            format!("{} (score {:.1})", verdict, self.score)
        } else {
            format!("{} (score {:.1}, {} issue(s))", verdict, self.score, issue_count)
        }
    }
}

pub fn validate_draft(mcq: &Mcq, draft: &CaseDraft, threshold: f64) -> ValidationReport {
    let structural_issues = validate_structure(draft);
    let content_issues = validate_content(mcq, draft);

    let structural_score = (100.0 - 10.0 * structural_issues.len() as f64).max(0.0);
    let content_score = (100.0 - 15.0 * content_issues.len() as f64).max(0.0);
    let weighted = structural_score * 0.3 + content_score * 0.3 + SEMANTIC_BASELINE * 0.4;
    let score = (weighted * 10.0).round() / 10.0;

    let missing_required = structural_issues.iter().any(|i| i.contains("Missing"));
    let status = if !missing_required && score >= threshold {
        ValidationStatus::Passed
    } else {
        ValidationStatus::Failed
    };

    ValidationReport {
        status,
        score,
        structural_issues,
        content_issues,
    }
}

fn validate_structure(draft: &CaseDraft) -> Vec<String> {
    let presentation = &draft.clinical_presentation;
    let mut issues = Vec::new();

    if presentation.chief_complaint.trim().is_empty() {
        issues.push("Missing chief complaint".to_string());
    }
    if presentation.history_present_illness.trim().is_empty() {
        issues.push("Missing history of present illness".to_string());
    }
    if draft.question_prompt.trim().is_empty() {
        issues.push("Missing question prompt".to_string());
    }
    if draft.core_concept_type.trim().is_empty() {
        issues.push("Missing core concept type".to_string());
    }
    if presentation.chief_complaint.chars().count() < 10 {
        issues.push("Chief complaint too short".to_string());
    }
    if presentation.history_present_illness.chars().count() < 50 {
        issues.push("History too brief".to_string());
    }

    issues
}

fn medical_term_pattern() -> &'static Regex {
    static TERM: OnceLock<Regex> = OnceLock::new();
    TERM.get_or_init(|| {
        Regex::new(r"\b[a-z]+(?:'s)?\s+(?:syndrome|sign|test|maneuver|posture)\b")
            .expect("medical term pattern is valid")
    })
}

fn validate_content(mcq: &Mcq, draft: &CaseDraft) -> Vec<String> {
    let presentation = &draft.clinical_presentation;
    let mut issues = Vec::new();

    let history = presentation.history_present_illness.to_lowercase();
    if history.contains("placeholder") || history.contains("example") {
        issues.push("Contains placeholder or example text".to_string());
    }

    let mcq_text = mcq.question_text.to_lowercase();
    let case_text = format!(
        "{} {} {}",
        presentation.history_present_illness,
        presentation.physical_examination,
        presentation.chief_complaint
    )
    .to_lowercase();

    for term in LATERALIZATION_TERMS {
        if mcq_text.contains(term) && !case_text.contains(term) {
            issues.push(format!("Missing lateralization information: '{}'", term));
        }
    }

    for found in medical_term_pattern().find_iter(&mcq_text) {
        if !case_text.contains(found.as_str()) {
            issues.push(format!("Missing specific medical term: '{}'", found.as_str()));
        }
    }

    issues
}
