//! Critical content extraction from MCQ stems.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::matcher::{SubstringMatcher, TermMatcher};
use crate::vocabulary::Vocabulary;

/// Keywords found in a question, grouped by category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CriticalContent {
    pub conditions: Vec<String>,
    pub locations: Vec<String>,
    pub signs: Vec<String>,
    pub medications: Vec<String>,
    pub procedures: Vec<String>,
}

impl CriticalContent {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.conditions.len()
            + self.locations.len()
            + self.signs.len()
            + self.medications.len()
            + self.procedures.len()
    }
}

fn owned(found: Vec<&str>) -> Vec<String> {
    found.into_iter().map(str::to_string).collect()
}

/// Scan a question stem against the built-in keyword lists.
pub fn extract_critical_content(question_text: &str) -> CriticalContent {
    extract_critical_content_with(question_text, Vocabulary::builtin(), &SubstringMatcher)
}

pub fn extract_critical_content_with(
    question_text: &str,
    vocabulary: &Vocabulary,
    matcher: &dyn TermMatcher,
) -> CriticalContent {
    let text = question_text.to_lowercase();
    CriticalContent {
        conditions: owned(matcher.matching(&text, &vocabulary.conditions)),
        locations: owned(matcher.matching(&text, &vocabulary.locations)),
        signs: owned(matcher.matching(&text, &vocabulary.signs)),
        medications: owned(matcher.matching(&text, &vocabulary.medications)),
        procedures: owned(matcher.matching(&text, &vocabulary.procedures)),
    }
}

/// Key medical terms the term-preservation scorer expects to survive conversion.
pub fn extract_key_terms_with(
    question_text: &str,
    vocabulary: &Vocabulary,
    matcher: &dyn TermMatcher,
) -> Vec<String> {
    owned(matcher.matching(&question_text.to_lowercase(), &vocabulary.key_terms))
}

/// Critical medical terms for the strict scorer.
pub fn extract_critical_medical_terms_with(
    question_text: &str,
    vocabulary: &Vocabulary,
    matcher: &dyn TermMatcher,
) -> Vec<String> {
    let text = question_text.to_lowercase();
    vocabulary
        .strict_critical_terms()
        .filter(|term| matcher.contains(&text, term))
        .cloned()
        .collect()
}

pub(crate) fn age_pattern() -> &'static Regex {
    static AGE: OnceLock<Regex> = OnceLock::new();
    AGE.get_or_init(|| Regex::new(r"(?i)(\d+)[-\s]year[-\s]old").expect("age pattern is valid"))
}

/// First "N-year-old" age mentioned in `text`.
pub fn extract_age(text: &str) -> Option<u32> {
    age_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
