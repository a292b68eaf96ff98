//! Patient profile extraction from MCQ stems.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::content::age_pattern;

const DEFAULT_AGE: u32 = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Age and gender as the stem describes them.
///
/// `age_descriptor` keeps the stem's wording ("young", "elderly") or the
/// literal age digits, so generated cases can echo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub age: u32,
    pub age_descriptor: String,
    pub gender: Gender,
}

impl PatientProfile {
    pub fn extract(question_text: &str) -> Self {
        let (age, age_descriptor) = extract_age(question_text);
        Self {
            age,
            age_descriptor,
            gender: extract_gender(question_text),
        }
    }

    /// Demographics line stored on cases: "45-year-old male".
    pub fn demographics(&self) -> String {
        format!("{}-year-old {}", self.age, self.gender)
    }

    /// Patient description for prompts: "34-year-old female" or "young female".
    pub fn description(&self) -> String {
        if !self.age_descriptor.is_empty() && self.age_descriptor.chars().all(|c| c.is_ascii_digit())
        {
            format!("{}-year-old {}", self.age_descriptor, self.gender)
        } else {
            format!("{} {}", self.age_descriptor, self.gender)
        }
    }
}

fn descriptor_patterns() -> &'static [(Regex, u32, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, u32, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)\b(infant|baby)\b", 1, "infant"),
            (r"(?i)\b(child|kid)\b", 8, "child"),
            (r"(?i)\b(adolescent|teenager|teen)\b", 16, "adolescent"),
            (r"(?i)\byoung\b", 28, "young"),
            (r"(?i)\bmiddle[-\s]aged\b", 50, "middle-aged"),
            (r"(?i)\b(elderly|old)\b", 72, "elderly"),
        ]
        .into_iter()
        .map(|(pattern, age, label)| {
            (
                Regex::new(pattern).expect("age descriptor pattern is valid"),
                age,
                label,
            )
        })
        .collect()
    })
}

fn extract_age(text: &str) -> (u32, String) {
    if let Some(digits) = age_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    {
        if let Ok(age) = digits.parse() {
            return (age, digits.to_string());
        }
    }

    descriptor_patterns()
        .iter()
        .find(|(pattern, _, _)| pattern.is_match(text))
        .map(|(_, age, label)| (*age, label.to_string()))
        .unwrap_or_else(|| (DEFAULT_AGE, DEFAULT_AGE.to_string()))
}

fn gender_patterns() -> &'static [(Regex, Gender)] {
    static PATTERNS: OnceLock<Vec<(Regex, Gender)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)\bboy\b", Gender::Male),
            (r"(?i)\bgirl\b", Gender::Female),
            (r"(?i)\b(woman|female)\b", Gender::Female),
            (r"(?i)\b(man|male)\b", Gender::Male),
            (r"(?i)\b(she|her)\b", Gender::Female),
            (r"(?i)\b(he|his|him)\b", Gender::Male),
        ]
        .into_iter()
        .map(|(pattern, gender)| {
            (
                Regex::new(pattern).expect("gender pattern is valid"),
                gender,
            )
        })
        .collect()
    })
}

fn extract_gender(text: &str) -> Gender {
    gender_patterns()
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, gender)| *gender)
        .unwrap_or(Gender::Male)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_age() {
        let profile = PatientProfile::extract("A 34-year-old woman presents with diplopia.");
        assert_eq!(profile.age, 34);
        assert_eq!(profile.age_descriptor, "34");
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.demographics(), "34-year-old female");
        assert_eq!(profile.description(), "34-year-old female");
    }

    #[test]
    fn test_descriptive_age() {
        let profile = PatientProfile::extract("A young man has recurrent headaches.");
        assert_eq!(profile.age, 28);
        assert_eq!(profile.description(), "young male");
        assert_eq!(profile.demographics(), "28-year-old male");

        assert_eq!(PatientProfile::extract("An elderly patient").age, 72);
        assert_eq!(PatientProfile::extract("A middle-aged accountant").age, 50);
        assert_eq!(PatientProfile::extract("An infant with hypotonia").age, 1);
        assert_eq!(PatientProfile::extract("A teenager with tics").age, 16);
    }

    #[test]
    fn test_defaults() {
        let profile = PatientProfile::extract("Which drug blocks sodium channels?");
        assert_eq!(profile.age, 45);
        assert_eq!(profile.gender, Gender::Male);
        assert_eq!(profile.description(), "45-year-old male");
    }

    #[test]
    fn test_gender_priority() {
        // "female" must not be read as "male"
        assert_eq!(extract_gender("A female patient"), Gender::Female);
        assert_eq!(extract_gender("A boy and his mother; she reports"), Gender::Male);
        assert_eq!(extract_gender("The patient says her vision blurs"), Gender::Female);
        assert_eq!(extract_gender("His gait is shuffling"), Gender::Male);
    }
}
