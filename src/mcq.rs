//! MCQ records as exported from the question bank.
//!
//! Exports are inconsistent: options arrive as mappings, lists, JSON-encoded
//! strings or Python list literals; answers arrive as "A", "a, c" or
//! "Option B". Everything is normalized on load and the original shape is
//! kept so the integrity checks can report it.

use regex::Regex;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Column width of the correct-answer field in the question bank.
pub const CORRECT_ANSWER_MAX_LEN: usize = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mcq {
    pub id: i64,
    #[serde(default)]
    pub question_number: Option<String>,
    pub question_text: String,
    #[serde(default)]
    pub options: McqOptions,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub correct_answer_text: Option<String>,
    #[serde(default)]
    pub subspecialty: String,
    #[serde(default)]
    pub exam_type: Option<String>,
    #[serde(default)]
    pub exam_year: Option<i32>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub explanation_sections: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub unified_explanation: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Mcq {
    /// Minimal record, mostly for tests and fixtures.
    pub fn new(id: i64, question_text: &str, subspecialty: &str) -> Self {
        Self {
            id,
            question_number: None,
            question_text: question_text.to_string(),
            options: McqOptions::default(),
            correct_answer: String::new(),
            correct_answer_text: None,
            subspecialty: subspecialty.to_string(),
            exam_type: None,
            exam_year: None,
            source_file: None,
            explanation: None,
            explanation_sections: None,
            unified_explanation: None,
            image_url: None,
        }
    }

    pub fn parsed_answer(&self) -> Option<CorrectAnswer> {
        CorrectAnswer::parse(&self.correct_answer)
    }

    /// Whether every answer letter names an existing option.
    pub fn has_valid_answer(&self) -> bool {
        match self.parsed_answer() {
            Some(answer) => {
                !self.options.is_empty()
                    && answer.letters.iter().all(|l| self.options.get(*l).is_some())
            }
            None => false,
        }
    }

    /// Text of the correct option(s), falling back to `correct_answer_text`.
    pub fn answer_text(&self) -> Option<String> {
        let from_options = self.parsed_answer().and_then(|answer| {
            let texts: Vec<&str> = answer
                .letters
                .iter()
                .filter_map(|l| self.options.get(*l))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("; "))
            }
        });

        from_options.or_else(|| {
            self.correct_answer_text
                .as_ref()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        })
    }

    pub fn answer_display(&self) -> String {
        if self.correct_answer.trim().is_empty() {
            return "No answer set".to_string();
        }
        if self.has_valid_answer() {
            if let Some(text) = self.answer_text() {
                return format!("{}. {}", self.correct_answer.trim(), text);
            }
        }
        format!("{} (Invalid - not in options)", self.correct_answer.trim())
    }

    /// Single explanation text: unified text, then legacy text, then merged sections.
    pub fn explanation_text(&self) -> String {
        if let Some(unified) = self.unified_explanation.as_deref() {
            if !unified.trim().is_empty() {
                return unified.trim().to_string();
            }
        }
        if let Some(explanation) = self.explanation.as_deref() {
            if !explanation.trim().is_empty() {
                return explanation.trim().to_string();
            }
        }
        self.explanation_sections
            .as_ref()
            .map(merge_sections_to_text)
            .unwrap_or_default()
    }

    pub fn has_explanation(&self) -> bool {
        if let Some(unified) = self.unified_explanation.as_deref() {
            if unified.trim().chars().count() > 50 {
                return true;
            }
        }

        if let Some(sections) = &self.explanation_sections {
            let substantive = ["option_analysis", "conceptual_foundation", "clinical_manifestation"]
                .iter()
                .filter_map(|key| sections.get(*key))
                .any(|value| section_text(value).chars().count() > 50);
            if substantive {
                return true;
            }
        }

        let Some(explanation) = self.explanation.as_deref() else {
            return false;
        };
        let trimmed = explanation.trim();
        let length = trimmed.chars().count();
        if length < 50 || explanation.contains("Classification Reason:") {
            return false;
        }
        if PLACEHOLDER_EXPLANATIONS
            .iter()
            .any(|p| explanation.contains(p))
            && length < 100
        {
            return false;
        }
        if explanation.contains('#') && length < 150 {
            let substantial = trimmed
                .split("\n\n")
                .map(str::trim)
                .any(|p| p.chars().count() > 30 && !p.starts_with('#'));
            if !substantial {
                return false;
            }
        }
        true
    }
}

const PLACEHOLDER_EXPLANATIONS: &[&str] = &[
    "No detailed explanation available",
    "No explanation available",
    "Classification:",
    "# Classification",
    "Explanation not yet generated",
    "Explanation Needed",
    "# Explanation Needed",
    "This MCQ requires a detailed explanation",
    "You can generate one using the",
    "This question has been reviewed by specialists",
];

// ============================================================================
// Options
// ============================================================================

/// Shape the options arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsFormat {
    #[default]
    Missing,
    Mapping,
    List,
    EncodedString,
    PythonLiteral,
    Lines,
    Malformed,
}

/// Letter-keyed option texts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct McqOptions {
    entries: BTreeMap<char, String>,
    format: OptionsFormat,
}

impl McqOptions {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(letter, text)| (letter.to_ascii_uppercase(), text.into()))
                .collect(),
            format: OptionsFormat::Mapping,
        }
    }

    /// Normalize whatever the export stored in the options column.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::Object(map) => {
                let mut entries = BTreeMap::new();
                let mut malformed = false;
                for (key, text) in map {
                    match option_letter(&key) {
                        Some(letter) => {
                            entries.insert(letter, value_text(&text));
                        }
                        None => malformed = true,
                    }
                }
                Self {
                    entries,
                    format: if malformed {
                        OptionsFormat::Malformed
                    } else {
                        OptionsFormat::Mapping
                    },
                }
            }
            Value::Array(items) => Self {
                entries: lettered(items.iter().map(value_text)),
                format: OptionsFormat::List,
            },
            Value::String(raw) => Self::from_text(&raw),
            Value::Bool(_) | Value::Number(_) => Self {
                entries: BTreeMap::new(),
                format: OptionsFormat::Malformed,
            },
        }
    }

    fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if let Ok(inner @ (Value::Object(_) | Value::Array(_))) =
            serde_json::from_str::<Value>(trimmed)
        {
            let mut options = Self::from_value(inner);
            if options.format != OptionsFormat::Malformed {
                options.format = OptionsFormat::EncodedString;
            }
            return options;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            if let Some(items) = parse_python_list(trimmed) {
                return Self {
                    entries: lettered(items.into_iter()),
                    format: OptionsFormat::PythonLiteral,
                };
            }
        }

        let entries: BTreeMap<char, String> = trimmed
            .lines()
            .filter_map(|line| {
                option_line_pattern()
                    .captures(line)
                    .and_then(|caps| {
                        let letter = caps.get(1)?.as_str().chars().next()?;
                        Some((letter.to_ascii_uppercase(), caps.get(2)?.as_str().trim().to_string()))
                    })
            })
            .collect();
        if entries.is_empty() {
            Self {
                entries,
                format: OptionsFormat::Malformed,
            }
        } else {
            Self {
                entries,
                format: OptionsFormat::Lines,
            }
        }
    }

    pub fn format(&self) -> OptionsFormat {
        self.format
    }

    pub fn get(&self, letter: char) -> Option<&str> {
        self.entries
            .get(&letter.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> {
        self.entries.iter().map(|(l, t)| (*l, t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for McqOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (letter, text) in &self.entries {
            map.serialize_entry(&letter.to_string(), text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for McqOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(McqOptions::from_value)
    }
}

fn option_letter(key: &str) -> Option<char> {
    let cleaned = key
        .trim()
        .trim_end_matches(['.', ')', ':'])
        .trim_start_matches('(')
        .trim();
    let mut chars = cleaned.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lettered<I: Iterator<Item = String>>(items: I) -> BTreeMap<char, String> {
    ('A'..='Z').zip(items).collect()
}

fn option_line_pattern() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^\s*\(?([A-Fa-f])[\.\):]\s*(.+)$").expect("option line pattern is valid")
    })
}

/// Parse a Python list literal of quoted strings, e.g. `['a', "b's"]`.
fn parse_python_list(raw: &str) -> Option<Vec<String>> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(_) => return None,
        };

        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        item.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                }
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return None;
        }
        items.push(item);
    }

    Some(items)
}

// ============================================================================
// Correct answer
// ============================================================================

/// Option letters named by the correct-answer field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectAnswer {
    pub letters: Vec<char>,
}

impl CorrectAnswer {
    /// Accepts "A", "a", "(C)", "Option B", "Answer: D", "B. text", "A, C", "A and C".
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        let stripped = upper
            .strip_prefix("ANSWER:")
            .or_else(|| upper.strip_prefix("ANSWER"))
            .or_else(|| upper.strip_prefix("OPTION"))
            .unwrap_or(upper.as_str())
            .trim();
        if stripped.is_empty() {
            return None;
        }

        if multi_answer_pattern().is_match(stripped) {
            let mut letters: Vec<char> = Vec::new();
            for c in stripped.chars().filter(|c| ('A'..='F').contains(c)) {
                if !letters.contains(&c) {
                    letters.push(c);
                }
            }
            // "AND" contributes an 'A'; only count standalone letters.
            letters.retain(|l| {
                stripped
                    .split(|c: char| !c.is_ascii_alphabetic())
                    .any(|token| token.len() == 1 && token.starts_with(*l))
            });
            if !letters.is_empty() {
                return Some(Self { letters });
            }
        }

        let caps = single_answer_pattern().captures(stripped)?;
        let letter = caps.get(1)?.as_str().chars().next()?;
        Some(Self {
            letters: vec![letter],
        })
    }

    pub fn as_field(&self) -> String {
        self.letters
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn single_answer_pattern() -> &'static Regex {
    static SINGLE: OnceLock<Regex> = OnceLock::new();
    SINGLE.get_or_init(|| {
        Regex::new(r"^\(?([A-F])\)?(?:[\.\):\-]\s*.*|\s+[^,&/\s].*)?$").expect("answer pattern is valid")
    })
}

fn multi_answer_pattern() -> &'static Regex {
    static MULTI: OnceLock<Regex> = OnceLock::new();
    MULTI.get_or_init(|| {
        Regex::new(r"^[A-F](?:\s*(?:,|/|&|AND)\s*[A-F])+$").expect("answer pattern is valid")
    })
}

/// Letter the option-analysis section marks as correct ("Option C: ... - Correct").
pub fn parse_answer_from_option_analysis(option_analysis: &str) -> Option<char> {
    static MARKED: OnceLock<Regex> = OnceLock::new();
    static OPTION: OnceLock<Regex> = OnceLock::new();
    let marked = MARKED.get_or_init(|| {
        Regex::new(r"(?im)Option ([A-F]):\s*[^–\-]+[–\-]\s*Correct(?:[^\w]|$)")
            .expect("option analysis pattern is valid")
    });
    let option = OPTION
        .get_or_init(|| Regex::new(r"(?i)Option ([A-F])").expect("option pattern is valid"));

    if let Some(caps) = marked.captures(option_analysis) {
        return caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_uppercase());
    }

    option_analysis
        .lines()
        .filter(|line| {
            line.contains("Correct")
                && !(line.contains("Incorrect") || line.contains("Partially correct"))
        })
        .find_map(|line| option.captures(line))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
        .map(|c| c.to_ascii_uppercase())
}

// ============================================================================
// Explanations
// ============================================================================

/// Canonical explanation sections, in teaching order: (key, title, required).
pub const CANONICAL_SECTIONS: &[(&str, &str, bool)] = &[
    ("option_analysis", "Option Analysis", true),
    ("conceptual_foundation", "Conceptual Foundation", false),
    ("pathophysiology", "Pathophysiology", false),
    ("clinical_manifestation", "Clinical Manifestations", false),
    ("diagnostic_approach", "Diagnostic Approach", false),
    ("classification_and_nosology", "Classification & Nosology", false),
    ("management_principles", "Management Principles", true),
    ("follow_up_guidelines", "Follow-up & Safety", false),
    ("clinical_pearls", "Clinical Pearls", false),
    ("current_evidence", "Current Evidence", false),
];

pub fn is_canonical_section(key: &str) -> bool {
    CANONICAL_SECTIONS.iter().any(|(k, _, _)| *k == key)
}

fn section_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Merge structured sections into one text: canonical sections first, then
/// unknown keys in key order, each as `### Title` followed by its prose.
pub fn merge_sections_to_text(sections: &BTreeMap<String, Value>) -> String {
    let canonical = CANONICAL_SECTIONS.iter().filter_map(|(key, title, _)| {
        sections
            .get(*key)
            .map(section_text)
            .filter(|text| !text.is_empty())
            .map(|text| format!("### {}\n\n{}", title, text))
    });

    let extra = sections
        .iter()
        .filter(|(key, _)| !is_canonical_section(key))
        .filter_map(|(key, value)| {
            let text = section_text(value);
            if text.is_empty() {
                None
            } else {
                Some(format!("### {}\n\n{}", title_case(key), text))
            }
        });

    canonical
        .chain(extra)
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

// ============================================================================
// Images
// ============================================================================

/// Rewrite Google Drive share links to the embeddable preview form.
pub fn normalize_image_url(url: &str) -> String {
    if !url.contains("drive.google.com") {
        return url.to_string();
    }

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"/file/d/([a-zA-Z0-9_-]+)",
            r"/d/([a-zA-Z0-9_-]+)",
            r"id=([a-zA-Z0-9_-]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("drive pattern is valid"))
        .collect()
    });

    patterns
        .iter()
        .find_map(|p| p.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|id| format!("https://drive.google.com/file/d/{}/preview", id.as_str()))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> McqOptions {
        McqOptions::from_value(value)
    }

    #[test]
    fn test_options_mapping() {
        let opts = options(json!({"A": "Pons", "b.": "Medulla"}));
        assert_eq!(opts.format(), OptionsFormat::Mapping);
        assert_eq!(opts.get('a'), Some("Pons"));
        assert_eq!(opts.get('B'), Some("Medulla"));
    }

    #[test]
    fn test_options_list_gets_letters() {
        let opts = options(json!(["Pons", "Medulla", "Midbrain"]));
        assert_eq!(opts.format(), OptionsFormat::List);
        assert_eq!(opts.letters().collect::<Vec<_>>(), vec!['A', 'B', 'C']);
        assert_eq!(opts.get('C'), Some("Midbrain"));
    }

    #[test]
    fn test_options_encoded_string() {
        let opts = options(json!("{\"A\": \"Pons\", \"B\": \"Medulla\"}"));
        assert_eq!(opts.format(), OptionsFormat::EncodedString);
        assert_eq!(opts.len(), 2);

        let listed = options(json!("[\"x\", \"y\"]"));
        assert_eq!(listed.format(), OptionsFormat::EncodedString);
        assert_eq!(listed.get('B'), Some("y"));
    }

    #[test]
    fn test_options_python_literal() {
        let opts = options(json!("['Parkinson\\'s disease', \"Wilson's disease\"]"));
        assert_eq!(opts.format(), OptionsFormat::PythonLiteral);
        assert_eq!(opts.get('A'), Some("Parkinson's disease"));
        assert_eq!(opts.get('B'), Some("Wilson's disease"));
    }

    #[test]
    fn test_options_lines() {
        let opts = options(json!("A. Pons\nB) Medulla\n(c) Midbrain"));
        assert_eq!(opts.format(), OptionsFormat::Lines);
        assert_eq!(opts.get('C'), Some("Midbrain"));
    }

    #[test]
    fn test_options_missing_and_malformed() {
        assert_eq!(options(Value::Null).format(), OptionsFormat::Missing);
        assert_eq!(options(json!("  ")).format(), OptionsFormat::Missing);
        assert_eq!(options(json!(42)).format(), OptionsFormat::Malformed);
        assert_eq!(options(json!("just prose")).format(), OptionsFormat::Malformed);
        assert_eq!(options(json!({"first": "x"})).format(), OptionsFormat::Malformed);
    }

    #[test]
    fn test_options_serialize_as_mapping() {
        let opts = options(json!(["Pons", "Medulla"]));
        assert_eq!(serde_json::to_value(&opts).unwrap(), json!({"A": "Pons", "B": "Medulla"}));
    }

    #[test]
    fn test_mcq_deserializes_with_defaults() {
        let mcq: Mcq = serde_json::from_value(json!({
            "id": 12,
            "question_text": "Stem",
            "options": ["x", "y"],
            "correct_answer": "b"
        }))
        .unwrap();
        assert_eq!(mcq.subspecialty, "");
        assert!(mcq.has_valid_answer());
        assert_eq!(mcq.answer_text().as_deref(), Some("y"));
        assert_eq!(mcq.answer_display(), "b. y");
    }

    #[test]
    fn test_correct_answer_parsing() {
        let letters = |raw: &str| CorrectAnswer::parse(raw).map(|a| a.letters);
        assert_eq!(letters("A"), Some(vec!['A']));
        assert_eq!(letters(" c "), Some(vec!['C']));
        assert_eq!(letters("(D)"), Some(vec!['D']));
        assert_eq!(letters("Option B"), Some(vec!['B']));
        assert_eq!(letters("Answer: E"), Some(vec!['E']));
        assert_eq!(letters("B. Levodopa"), Some(vec!['B']));
        assert_eq!(letters("A, C"), Some(vec!['A', 'C']));
        assert_eq!(letters("A and C"), Some(vec!['A', 'C']));
        assert_eq!(letters("B/D"), Some(vec!['B', 'D']));
        assert_eq!(letters(""), None);
        assert_eq!(letters("Levodopa"), None);
        assert_eq!(letters("Z"), None);
    }

    #[test]
    fn test_answer_not_in_options() {
        let mut mcq = Mcq::new(1, "Stem", "Epilepsy");
        mcq.options = McqOptions::from_pairs([('A', "x"), ('B', "y")]);
        mcq.correct_answer = "C".to_string();
        assert!(!mcq.has_valid_answer());
        assert_eq!(mcq.answer_display(), "C (Invalid - not in options)");

        mcq.correct_answer = String::new();
        assert_eq!(mcq.answer_display(), "No answer set");
    }

    #[test]
    fn test_answer_text_falls_back_to_field() {
        let mut mcq = Mcq::new(1, "Stem", "Epilepsy");
        mcq.correct_answer_text = Some(" Levetiracetam ".to_string());
        assert_eq!(mcq.answer_text().as_deref(), Some("Levetiracetam"));
    }

    #[test]
    fn test_parse_answer_from_option_analysis() {
        let text = "Option A: Pons - Incorrect. Too rostral.\nOption C: Medulla - Correct. Lateral medullary syndrome.";
        assert_eq!(parse_answer_from_option_analysis(text), Some('C'));

        let loose = "Option b is Correct because of the crossed findings";
        assert_eq!(parse_answer_from_option_analysis(loose), Some('B'));

        assert_eq!(parse_answer_from_option_analysis("Option A - Incorrect"), None);
    }

    #[test]
    fn test_merge_sections_order_and_titles() {
        let mut sections = BTreeMap::new();
        sections.insert("management_principles".to_string(), json!("Treat early."));
        sections.insert("option_analysis".to_string(), json!(" A is right. "));
        sections.insert("extra_notes".to_string(), json!("Legacy."));
        sections.insert("pathophysiology".to_string(), json!(""));

        let merged = merge_sections_to_text(&sections);
        assert_eq!(
            merged,
            "### Option Analysis\n\nA is right.\n\n### Management Principles\n\nTreat early.\n\n### Extra Notes\n\nLegacy."
        );
    }

    #[test]
    fn test_explanation_text_priority() {
        let mut mcq = Mcq::new(1, "Stem", "Epilepsy");
        let mut sections = BTreeMap::new();
        sections.insert("option_analysis".to_string(), json!("From sections."));
        mcq.explanation_sections = Some(sections);
        assert_eq!(mcq.explanation_text(), "### Option Analysis\n\nFrom sections.");

        mcq.explanation = Some("Legacy text".to_string());
        assert_eq!(mcq.explanation_text(), "Legacy text");

        mcq.unified_explanation = Some("Unified".to_string());
        assert_eq!(mcq.explanation_text(), "Unified");
    }

    #[test]
    fn test_has_explanation() {
        let mut mcq = Mcq::new(1, "Stem", "Epilepsy");
        assert!(!mcq.has_explanation());

        mcq.explanation = Some("No explanation available".to_string());
        assert!(!mcq.has_explanation());

        mcq.explanation = Some("Classification Reason: this question belongs to epilepsy by keyword.".to_string());
        assert!(!mcq.has_explanation());

        mcq.explanation = Some(
            "The lateral medulla is supplied by the PICA; infarction gives crossed sensory loss."
                .to_string(),
        );
        assert!(mcq.has_explanation());
    }

    #[test]
    fn test_normalize_image_url() {
        assert_eq!(
            normalize_image_url("https://drive.google.com/file/d/abc_123/view?usp=sharing"),
            "https://drive.google.com/file/d/abc_123/preview"
        );
        assert_eq!(
            normalize_image_url("https://drive.google.com/open?id=XYZ-9"),
            "https://drive.google.com/file/d/XYZ-9/preview"
        );
        assert_eq!(
            normalize_image_url("https://example.org/mri.png"),
            "https://example.org/mri.png"
        );
    }
}
