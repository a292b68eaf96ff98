//! Data-model checks for MCQ records.
//!
//! The question bank expects letter-keyed option mappings, answers that name
//! existing options, canonical explanation sections and embeddable image links.
//! Exports regularly break these; `check_mcq` reports every violation it finds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mcq::{
    is_canonical_section, normalize_image_url, parse_answer_from_option_analysis, CorrectAnswer,
    Mcq, OptionsFormat, CORRECT_ANSWER_MAX_LEN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityCode {
    OptionsMissing,
    OptionsNotMapping,
    OptionsMalformed,
    AnswerMissing,
    AnswerUnparseable,
    AnswerNotInOptions,
    AnswerTooLong,
    NonCanonicalSection,
    AnswerExplanationDisagreement,
    ImageUrlUnnormalized,
}

impl IntegrityCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityCode::OptionsMissing => "OPTIONS_MISSING",
            IntegrityCode::OptionsNotMapping => "OPTIONS_NOT_MAPPING",
            IntegrityCode::OptionsMalformed => "OPTIONS_MALFORMED",
            IntegrityCode::AnswerMissing => "ANSWER_MISSING",
            IntegrityCode::AnswerUnparseable => "ANSWER_UNPARSEABLE",
            IntegrityCode::AnswerNotInOptions => "ANSWER_NOT_IN_OPTIONS",
            IntegrityCode::AnswerTooLong => "ANSWER_TOO_LONG",
            IntegrityCode::NonCanonicalSection => "NON_CANONICAL_SECTION",
            IntegrityCode::AnswerExplanationDisagreement => "ANSWER_EXPLANATION_DISAGREEMENT",
            IntegrityCode::ImageUrlUnnormalized => "IMAGE_URL_UNNORMALIZED",
        }
    }
}

impl fmt::Display for IntegrityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    pub mcq_id: i64,
    pub code: IntegrityCode,
    pub detail: String,
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MCQ {}: {} ({})", self.mcq_id, self.code, self.detail)
    }
}

pub fn check_mcq(mcq: &Mcq) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    let mut push = |code: IntegrityCode, detail: String| {
        issues.push(IntegrityIssue {
            mcq_id: mcq.id,
            code,
            detail,
        })
    };

    match mcq.options.format() {
        OptionsFormat::Missing => push(IntegrityCode::OptionsMissing, "no options stored".into()),
        OptionsFormat::Malformed => push(
            IntegrityCode::OptionsMalformed,
            format!("{} option(s) recovered", mcq.options.len()),
        ),
        OptionsFormat::Mapping => {}
        other => push(
            IntegrityCode::OptionsNotMapping,
            format!("options stored as {:?}", other),
        ),
    }

    let raw_answer = mcq.correct_answer.trim();
    let answer = if raw_answer.is_empty() {
        push(IntegrityCode::AnswerMissing, "correct answer is blank".into());
        None
    } else {
        if raw_answer.chars().count() > CORRECT_ANSWER_MAX_LEN {
            push(
                IntegrityCode::AnswerTooLong,
                format!(
                    "{} chars exceeds column width {}",
                    raw_answer.chars().count(),
                    CORRECT_ANSWER_MAX_LEN
                ),
            );
        }
        let parsed = CorrectAnswer::parse(raw_answer);
        if parsed.is_none() {
            push(IntegrityCode::AnswerUnparseable, format!("'{}'", raw_answer));
        }
        parsed
    };

    if let Some(answer) = &answer {
        if !mcq.options.is_empty() {
            let missing: Vec<String> = answer
                .letters
                .iter()
                .filter(|l| mcq.options.get(**l).is_none())
                .map(char::to_string)
                .collect();
            if !missing.is_empty() {
                push(
                    IntegrityCode::AnswerNotInOptions,
                    format!("letter(s) {} not among options", missing.join(", ")),
                );
            }
        }
    }

    if let Some(sections) = &mcq.explanation_sections {
        for key in sections.keys().filter(|k| !is_canonical_section(k)) {
            push(IntegrityCode::NonCanonicalSection, key.clone());
        }

        let analysis = sections
            .get("option_analysis")
            .and_then(|v| v.as_str())
            .and_then(parse_answer_from_option_analysis);
        if let (Some(marked), Some(answer)) = (analysis, &answer) {
            if !answer.letters.contains(&marked) {
                push(
                    IntegrityCode::AnswerExplanationDisagreement,
                    format!(
                        "explanation marks {} correct, answer is {}",
                        marked,
                        answer.as_field()
                    ),
                );
            }
        }
    }

    if let Some(url) = mcq.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let normalized = normalize_image_url(url);
        if normalized != url {
            push(IntegrityCode::ImageUrlUnnormalized, normalized);
        }
    }

    issues
}

/// Lint a whole dataset, in dataset order.
pub fn check_all(mcqs: &[Mcq]) -> Vec<IntegrityIssue> {
    mcqs.iter().flat_map(check_mcq).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcq::McqOptions;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn clean_mcq() -> Mcq {
        let mut mcq = Mcq::new(5, "Which structure is involved?", "Stroke");
        mcq.options = McqOptions::from_pairs([('A', "Pons"), ('B', "Medulla")]);
        mcq.correct_answer = "B".to_string();
        mcq
    }

    fn codes(mcq: &Mcq) -> Vec<IntegrityCode> {
        check_mcq(mcq).into_iter().map(|i| i.code).collect()
    }

    #[test]
    fn test_clean_record_has_no_issues() {
        assert!(check_mcq(&clean_mcq()).is_empty());
    }

    #[test]
    fn test_options_shape_issues() {
        let mut mcq = clean_mcq();
        mcq.options = McqOptions::from_value(json!(["Pons", "Medulla"]));
        assert_eq!(codes(&mcq), vec![IntegrityCode::OptionsNotMapping]);

        mcq.options = McqOptions::from_value(json!(null));
        assert_eq!(codes(&mcq), vec![IntegrityCode::OptionsMissing]);

        mcq.options = McqOptions::from_value(json!("nonsense"));
        assert_eq!(codes(&mcq), vec![IntegrityCode::OptionsMalformed]);
    }

    #[test]
    fn test_answer_issues() {
        let mut mcq = clean_mcq();
        mcq.correct_answer = "  ".to_string();
        assert_eq!(codes(&mcq), vec![IntegrityCode::AnswerMissing]);

        mcq.correct_answer = "D".to_string();
        assert_eq!(codes(&mcq), vec![IntegrityCode::AnswerNotInOptions]);

        mcq.correct_answer = "Lateral medullary".to_string();
        assert_eq!(
            codes(&mcq),
            vec![IntegrityCode::AnswerTooLong, IntegrityCode::AnswerUnparseable]
        );
    }

    #[test]
    fn test_section_issues() {
        let mut mcq = clean_mcq();
        let mut sections = BTreeMap::new();
        sections.insert(
            "option_analysis".to_string(),
            json!("Option A: Pons - Correct. Basilar branches."),
        );
        sections.insert("summary".to_string(), json!("x"));
        mcq.explanation_sections = Some(sections);

        let issues = check_mcq(&mcq);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].code, IntegrityCode::NonCanonicalSection);
        assert_eq!(issues[0].detail, "summary");
        assert_eq!(issues[1].code, IntegrityCode::AnswerExplanationDisagreement);
        assert_eq!(issues[1].detail, "explanation marks A correct, answer is B");
    }

    #[test]
    fn test_image_url_issue() {
        let mut mcq = clean_mcq();
        mcq.image_url = Some("https://drive.google.com/file/d/abc/view".to_string());
        let issues = check_mcq(&mcq);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].detail, "https://drive.google.com/file/d/abc/preview");

        mcq.image_url = Some("https://drive.google.com/file/d/abc/preview".to_string());
        assert!(check_mcq(&mcq).is_empty());
    }

    #[test]
    fn test_issue_display() {
        let mut mcq = clean_mcq();
        mcq.correct_answer = "D".to_string();
        let rendered = check_mcq(&mcq)[0].to_string();
        assert_eq!(rendered, "MCQ 5: ANSWER_NOT_IN_OPTIONS (letter(s) D not among options)");
    }
}
