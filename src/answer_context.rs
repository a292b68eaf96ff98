//! Answer context for case generation.
//!
//! Cases drift away from the MCQ's teaching point when the generator only
//! sees the stem. `AnswerContext` gathers what the correct answer is, what the
//! question is trying to teach and which options are distractors, so prompts
//! and template question prompts can anchor on it.

use serde::{Deserialize, Serialize};

use crate::mcq::Mcq;

const ANATOMICAL_FOCUS: &[(&str, &str)] = &[
    ("inferior olive", "Inferior olivary nucleus"),
    ("interstitial nucleus", "Interstitial nucleus of Cajal"),
    ("cerebellar peduncle", "Cerebellar peduncle"),
    ("dentate", "Dentate nucleus"),
    ("red nucleus", "Red nucleus"),
    ("pontine", "Pons"),
    ("medullary", "Medulla"),
    ("midbrain", "Midbrain"),
    ("thalamic", "Thalamus"),
    ("cortical", "Cerebral cortex"),
];

const LOCALIZING_SIGNS: &[&str] = &[
    "oscillopsia",
    "nystagmus",
    "ataxia",
    "dysmetria",
    "weakness",
    "numbness",
    "diplopia",
    "dysarthria",
    "tremor",
    "rigidity",
    "bradykinesia",
    "chorea",
    "hemianopia",
    "aphasia",
    "neglect",
];

const MAX_KEY_POINTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerContext {
    pub correct_letters: Vec<char>,
    pub answer_text: String,
    pub learning_objectives: Vec<String>,
    pub anatomical_focus: Option<String>,
    pub localizing_signs: Vec<String>,
    pub pathway: Option<String>,
    pub distractors: Vec<String>,
    pub key_points: Vec<String>,
}

impl AnswerContext {
    pub fn build(mcq: &Mcq) -> Self {
        let correct_letters = mcq
            .parsed_answer()
            .map(|a| a.letters)
            .unwrap_or_default();
        let answer_text = mcq.answer_text().unwrap_or_default();
        let question = mcq.question_text.to_lowercase();
        let answer_lower = answer_text.to_lowercase();

        let distractors = mcq
            .options
            .iter()
            .filter(|(letter, _)| !correct_letters.contains(letter))
            .map(|(_, text)| text.to_string())
            .collect();

        Self {
            learning_objectives: learning_objectives(&question, &answer_text),
            anatomical_focus: anatomical_focus(&answer_lower),
            localizing_signs: LOCALIZING_SIGNS
                .iter()
                .filter(|sign| question.contains(*sign))
                .map(|sign| sign.to_string())
                .collect(),
            pathway: pathway(&question, &answer_lower),
            distractors,
            key_points: key_points(&mcq.explanation_text()),
            correct_letters,
            answer_text,
        }
    }

    pub fn has_answer(&self) -> bool {
        !self.answer_text.is_empty()
    }

    /// Plain-text block for inclusion in a generation prompt.
    pub fn prompt_block(&self) -> String {
        let mut block = String::new();
        if self.has_answer() {
            block.push_str(&format!("Correct answer: {}\n", self.answer_text));
        }
        if !self.learning_objectives.is_empty() {
            block.push_str(&format!(
                "Learning objectives: {}\n",
                self.learning_objectives.join("; ")
            ));
        }
        if let Some(focus) = &self.anatomical_focus {
            block.push_str(&format!("Anatomical focus: {}\n", focus));
        }
        if let Some(pathway) = &self.pathway {
            block.push_str(&format!("Relevant pathway: {}\n", pathway));
        }
        if !self.localizing_signs.is_empty() {
            block.push_str(&format!(
                "Localizing signs to keep: {}\n",
                self.localizing_signs.join(", ")
            ));
        }
        for point in &self.key_points {
            block.push_str(&format!("- {}\n", point));
        }
        if !self.distractors.is_empty() {
            block.push_str(&format!(
                "Do not steer toward: {}\n",
                self.distractors.join("; ")
            ));
        }
        block
    }
}

fn learning_objectives(question: &str, answer_text: &str) -> Vec<String> {
    let answer = if answer_text.is_empty() {
        "the correct answer"
    } else {
        answer_text
    };

    if question.contains("localization") || question.contains("where") || question.contains("lesion") {
        vec![
            format!("Understand anatomical localization of {}", answer),
            "Correlate clinical signs with neuroanatomical structures".to_string(),
        ]
    } else if question.contains("management") || question.contains("treatment") {
        vec![
            format!("Recognize {} as appropriate management", answer),
            "Understand treatment selection rationale".to_string(),
        ]
    } else if question.contains("investigation") || question.contains("test") {
        vec![
            format!("Select {} as optimal diagnostic test", answer),
            "Understand diagnostic test selection principles".to_string(),
        ]
    } else if question.contains("diagnosis") || question.contains("most likely") {
        vec![
            format!("Identify {} from the clinical presentation", answer),
            "Distinguish it from the main differentials".to_string(),
        ]
    } else if question.contains("mechanism") || question.contains("pathophysiology") {
        vec![
            format!("Explain the mechanism underlying {}", answer),
            "Link pathophysiology to the clinical findings".to_string(),
        ]
    } else {
        vec![format!("Understand why {} is correct", answer)]
    }
}

fn anatomical_focus(answer_lower: &str) -> Option<String> {
    if answer_lower.is_empty() {
        return None;
    }
    ANATOMICAL_FOCUS
        .iter()
        .find(|(keyword, _)| answer_lower.contains(keyword))
        .map(|(_, location)| location.to_string())
}

fn pathway(question: &str, answer_lower: &str) -> Option<String> {
    if question.contains("oscillopsia") && answer_lower.contains("inferior olive") {
        Some("Dentato-rubro-olivary pathway (Guillain-Mollaret triangle)".to_string())
    } else if question.contains("tremor") && answer_lower.contains("dentate") {
        Some("Dentato-thalamic pathway".to_string())
    } else {
        None
    }
}

/// Bullet lines from an explanation, at most five.
fn key_points(explanation: &str) -> Vec<String> {
    explanation
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(['-', '•', '*']))
        .map(|line| line.trim_start_matches(['-', '•', '*', ' ']).to_string())
        .filter(|point| !point.is_empty())
        .take(MAX_KEY_POINTS)
        .collect()
}
