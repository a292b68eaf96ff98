//! Question purpose and question type classification.
//!
//! Two classifiers coexist. [`detect_question_purpose`] is the scorer's view: a
//! phrase cascade over six purposes. [`detect_question_type`] is the
//! converter's view: regex patterns over eight question types, which the strict
//! scorer also uses as the expected case type.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::matcher::{SubstringMatcher, TermMatcher};
use crate::vocabulary::Vocabulary;

// ============================================================================
// Scorer purpose cascade
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPurpose {
    Diagnosis,
    Management,
    AdvancedManagement,
    Investigation,
    Localization,
    General,
}

impl QuestionPurpose {
    pub fn all() -> Vec<QuestionPurpose> {
        vec![
            QuestionPurpose::Diagnosis,
            QuestionPurpose::Management,
            QuestionPurpose::AdvancedManagement,
            QuestionPurpose::Investigation,
            QuestionPurpose::Localization,
            QuestionPurpose::General,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionPurpose::Diagnosis => "diagnosis",
            QuestionPurpose::Management => "management",
            QuestionPurpose::AdvancedManagement => "advanced_management",
            QuestionPurpose::Investigation => "investigation",
            QuestionPurpose::Localization => "localization",
            QuestionPurpose::General => "general",
        }
    }

    /// Case question types that count as aligned with this purpose.
    pub fn expected_case_types(&self) -> &'static [&'static str] {
        match self {
            QuestionPurpose::Diagnosis => &["diagnosis"],
            QuestionPurpose::Management => &["management"],
            QuestionPurpose::AdvancedManagement => &["advanced_management", "management"],
            QuestionPurpose::Investigation => &["investigation"],
            QuestionPurpose::Localization => &["diagnosis", "localization"],
            QuestionPurpose::General => &["general"],
        }
    }

    pub fn accepts(&self, case_type: &str) -> bool {
        self.expected_case_types().contains(&case_type)
    }
}

impl fmt::Display for QuestionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionPurpose::all()
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown question purpose: {}", s))
    }
}

pub fn detect_question_purpose(question_text: &str) -> QuestionPurpose {
    detect_question_purpose_with(question_text, Vocabulary::builtin(), &SubstringMatcher)
}

/// First-match-wins cascade: diagnosis, management, advanced management,
/// investigation, localization, then general.
pub fn detect_question_purpose_with(
    question_text: &str,
    vocabulary: &Vocabulary,
    matcher: &dyn TermMatcher,
) -> QuestionPurpose {
    let text = question_text.to_lowercase();
    let cascade = [
        (&vocabulary.diagnosis_phrases, QuestionPurpose::Diagnosis),
        (&vocabulary.management_phrases, QuestionPurpose::Management),
        (
            &vocabulary.advanced_management_phrases,
            QuestionPurpose::AdvancedManagement,
        ),
        (&vocabulary.investigation_phrases, QuestionPurpose::Investigation),
        (&vocabulary.localization_phrases, QuestionPurpose::Localization),
    ];

    cascade
        .into_iter()
        .find(|(phrases, _)| matcher.any(&text, phrases))
        .map(|(_, purpose)| purpose)
        .unwrap_or(QuestionPurpose::General)
}

/// Whether a question is about refractory disease or procedural therapy.
pub fn detect_advanced_management_with(
    question_text: &str,
    vocabulary: &Vocabulary,
    matcher: &dyn TermMatcher,
) -> bool {
    matcher.any(&question_text.to_lowercase(), &vocabulary.advanced_keywords)
}

pub fn detect_advanced_management(question_text: &str) -> bool {
    detect_advanced_management_with(question_text, Vocabulary::builtin(), &SubstringMatcher)
}

// ============================================================================
// Converter question types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Diagnosis,
    Differential,
    Localization,
    Management,
    Investigation,
    Pathophysiology,
    Prognosis,
    Prevention,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Diagnosis => "diagnosis",
            QuestionType::Differential => "differential",
            QuestionType::Localization => "localization",
            QuestionType::Management => "management",
            QuestionType::Investigation => "investigation",
            QuestionType::Pathophysiology => "pathophysiology",
            QuestionType::Prognosis => "prognosis",
            QuestionType::Prevention => "prevention",
        }
    }

    /// Closing question for a generated case of this type.
    pub fn case_prompt(&self) -> &'static str {
        match self {
            QuestionType::Diagnosis => "What is the most likely diagnosis?",
            QuestionType::Differential => "What is your differential diagnosis?",
            QuestionType::Localization => "Where is the lesion most likely located?",
            QuestionType::Management => "What is the most appropriate next step in management?",
            QuestionType::Investigation => "Which investigation would you request next?",
            QuestionType::Pathophysiology => "What mechanism best explains these findings?",
            QuestionType::Prognosis => "What is the expected course for this patient?",
            QuestionType::Prevention => "What measure would best prevent recurrence?",
        }
    }

    /// Case types the strict scorer accepts, with a small penalty, in place of this one.
    pub fn acceptable_alternatives(&self) -> &'static [&'static str] {
        match self {
            QuestionType::Diagnosis => &["diagnosis"],
            QuestionType::Management => &["management", "advanced_management"],
            QuestionType::Investigation => &["investigation"],
            _ => &[],
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "diagnosis" => Ok(QuestionType::Diagnosis),
            "differential" => Ok(QuestionType::Differential),
            "localization" => Ok(QuestionType::Localization),
            "management" => Ok(QuestionType::Management),
            "investigation" => Ok(QuestionType::Investigation),
            "pathophysiology" => Ok(QuestionType::Pathophysiology),
            "prognosis" => Ok(QuestionType::Prognosis),
            "prevention" => Ok(QuestionType::Prevention),
            _ => Err(format!("Unknown question type: {}", s)),
        }
    }
}

const DIAGNOSIS_PATTERNS: &[&str] = &[
    r"most likely diagnosis",
    r"what is the diagnosis",
    r"which condition",
    r"diagnosed with",
    r"likely cause",
    r"clinical diagnosis",
    r"provisional diagnosis",
    r"working diagnosis",
    r"primary diagnosis",
    r"underlying condition",
    r"this patient has",
    r"this condition is",
    r"consistent with",
    r"suggests.*diagnosis",
    r"findings.*suggest",
    r"clinical picture.*consistent",
];

const DIFFERENTIAL_PATTERNS: &[&str] = &[
    r"differential diagnosis",
    r"differential.*includes",
    r"consider.*differential",
    r"broad.*differential",
    r"narrow.*differential",
    r"most.*appropriate.*differential",
    r"differential.*considerations",
    r"list.*of.*diagnoses",
    r"possible.*diagnoses",
    r"likely.*diagnoses",
];

const LOCALIZATION_PATTERNS: &[&str] = &[
    r"which localization",
    r"localization.*most likely",
    r"most likely.*localization",
    r"localization.*of.*lesion",
    r"lesion.*located",
    r"anatomical.*location",
    r"site.*of.*lesion",
    r"where.*is.*lesion",
    r"neuroanatomical.*localization",
    r"level.*of.*lesion",
    r"location.*of.*pathology",
    r"anatomical.*site",
    r"localizing.*sign",
    r"lateralizing.*sign",
    r"level.*of.*injury",
    r"spinal.*level",
    r"brain.*region",
    r"cortical.*area",
];

const MANAGEMENT_PATTERNS: &[&str] = &[
    r"next step in management",
    r"best treatment",
    r"what should be done",
    r"appropriate therapy",
    r"second-line management",
    r"first-line treatment",
    r"most appropriate management",
    r"treatment of choice",
    r"next step",
    r"what is the.*management",
    r"how should.*be treated",
    r"appropriate treatment",
    r"therapeutic.*option",
    r"next.*intervention",
    r"what should be switched",
    r"should be switched to",
    r"switch to",
    r"changed to",
    r"medication.*change",
    r"drug.*choice",
    r"therapy.*recommend",
    r"treatment.*plan",
    r"manage.*patient",
    r"best.*approach",
    r"optimal.*treatment",
    r"immediate.*action",
    r"emergency.*management",
    r"long-term.*management",
    r"preventive.*treatment",
    r"maintenance.*therapy",
];

const INVESTIGATION_PATTERNS: &[&str] = &[
    r"next step in workup",
    r"best test",
    r"which study",
    r"appropriate investigation",
    r"most useful.*test",
    r"next.*investigation",
    r"diagnostic.*test",
    r"most appropriate.*study",
    r"confirm.*diagnosis",
    r"evaluate.*further",
    r"additional.*testing",
    r"imaging.*study",
    r"laboratory.*test",
    r"further.*workup",
    r"initial.*test",
    r"screening.*test",
    r"monitoring.*test",
    r"follow.*study",
];

const PATHOPHYSIOLOGY_PATTERNS: &[&str] = &[
    r"mechanism.*responsible",
    r"pathophysiology",
    r"underlying.*mechanism",
    r"physiologic.*basis",
    r"explains.*finding",
    r"reason.*for",
    r"cause.*of.*symptom",
    r"why.*occur",
    r"results.*from",
    r"due.*to.*mechanism",
    r"molecular.*basis",
    r"cellular.*process",
];

fn question_patterns() -> &'static [(QuestionType, Vec<Regex>)] {
    static PATTERNS: OnceLock<Vec<(QuestionType, Vec<Regex>)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("question pattern is valid"))
                .collect()
        };
        vec![
            (QuestionType::Diagnosis, compile(DIAGNOSIS_PATTERNS)),
            (QuestionType::Differential, compile(DIFFERENTIAL_PATTERNS)),
            (QuestionType::Localization, compile(LOCALIZATION_PATTERNS)),
            (QuestionType::Management, compile(MANAGEMENT_PATTERNS)),
            (QuestionType::Investigation, compile(INVESTIGATION_PATTERNS)),
            (QuestionType::Pathophysiology, compile(PATHOPHYSIOLOGY_PATTERNS)),
        ]
    })
}

/// Classify a stem into a converter question type; diagnosis when nothing matches.
pub fn detect_question_type(question_text: &str) -> QuestionType {
    let text = question_text.to_lowercase();
    question_patterns()
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(&text)))
        .map(|(question_type, _)| *question_type)
        .unwrap_or(QuestionType::Diagnosis)
}

// ============================================================================
// Complexity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseComplexity {
    Basic,
    Intermediate,
    Advanced,
}

impl CaseComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseComplexity::Basic => "basic",
            CaseComplexity::Intermediate => "intermediate",
            CaseComplexity::Advanced => "advanced",
        }
    }
}

const COMPLEX_TERMS: &[&str] = &[
    "refractory",
    "resistant",
    "multiple",
    "complications",
    "differential",
];

pub fn assess_complexity(question_text: &str) -> CaseComplexity {
    let length = question_text.chars().count();
    let mut score = if length > 500 {
        2
    } else if length > 200 {
        1
    } else {
        0
    };

    let lowered = question_text.to_lowercase();
    score += COMPLEX_TERMS
        .iter()
        .filter(|term| lowered.contains(*term))
        .count();

    if score >= 4 {
        CaseComplexity::Advanced
    } else if score >= 2 {
        CaseComplexity::Intermediate
    } else {
        CaseComplexity::Basic
    }
}
