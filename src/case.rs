//! Generated case records.

use serde::{Deserialize, Serialize};

/// A clinical case rendering of an MCQ.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaseData {
    pub clinical_presentation: String,
    pub patient_demographics: String,
    pub question_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub learning_objectives: Vec<String>,
}

/// What a converter produced for one MCQ.
///
/// `Fallback` carries the template substituted after the converter rejected
/// its own output; scorers treat it as a low-quality case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "case", rename_all = "snake_case")]
pub enum CaseOutcome {
    Generated(CaseData),
    Fallback(CaseData),
}

impl CaseOutcome {
    pub fn case(&self) -> &CaseData {
        match self {
            CaseOutcome::Generated(case) | CaseOutcome::Fallback(case) => case,
        }
    }

    pub fn into_case(self) -> CaseData {
        match self {
            CaseOutcome::Generated(case) | CaseOutcome::Fallback(case) => case,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CaseOutcome::Fallback(_))
    }
}

/// Case record in the flat shape older converters wrote: optional fields and a
/// `fallback_used` flag alongside the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyCaseRecord {
    #[serde(default)]
    pub source_mcq_id: Option<i64>,
    #[serde(default)]
    pub clinical_presentation: String,
    #[serde(default)]
    pub patient_demographics: String,
    #[serde(default = "unknown_question_type")]
    pub question_type: String,
    #[serde(default)]
    pub question_prompt: Option<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub fallback_used: bool,
    /// Set when the converter failed outright for this MCQ.
    #[serde(default)]
    pub error: Option<String>,
}

fn unknown_question_type() -> String {
    "unknown".to_string()
}

impl From<LegacyCaseRecord> for CaseOutcome {
    fn from(record: LegacyCaseRecord) -> Self {
        let case = CaseData {
            clinical_presentation: record.clinical_presentation,
            patient_demographics: record.patient_demographics,
            question_type: record.question_type,
            question_prompt: record.question_prompt,
            learning_objectives: record.learning_objectives,
        };
        if record.fallback_used {
            CaseOutcome::Fallback(case)
        } else {
            CaseOutcome::Generated(case)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_flag_becomes_variant() {
        let record: LegacyCaseRecord = serde_json::from_str(
            r#"{"source_mcq_id": 7, "clinical_presentation": "text", "fallback_used": true}"#,
        )
        .unwrap();
        let outcome = CaseOutcome::from(record);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.case().clinical_presentation, "text");
        assert_eq!(outcome.case().question_type, "unknown");
        assert_eq!(outcome.case().patient_demographics, "");
    }

    #[test]
    fn test_legacy_without_flag_is_generated() {
        let record: LegacyCaseRecord =
            serde_json::from_str(r#"{"question_type": "management"}"#).unwrap();
        let outcome = CaseOutcome::from(record);
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.into_case().question_type, "management");
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let outcome = CaseOutcome::Fallback(CaseData::default());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "fallback");
        assert!(json["case"].is_object());
    }
}
