//! MCQ dataset files.
//!
//! Exports are either a bare JSON array of MCQs or an object wrapping the
//! array under `mcqs` or `questions`.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::DataFileError;
use crate::mcq::Mcq;

pub fn load_mcqs(path: &Path) -> Result<Vec<Mcq>, DataFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| DataFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| DataFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => match map.remove("mcqs").or_else(|| map.remove("questions")) {
            Some(inner @ Value::Array(_)) => inner,
            _ => {
                return Err(DataFileError::Layout {
                    path: path.to_path_buf(),
                    reason: "expected an array under \"mcqs\" or \"questions\"".to_string(),
                })
            }
        },
        _ => {
            return Err(DataFileError::Layout {
                path: path.to_path_buf(),
                reason: "expected a JSON array of MCQs".to_string(),
            })
        }
    };

    let mcqs: Vec<Mcq> = serde_json::from_value(records).map_err(|source| DataFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loaded {} MCQs from {:?}", mcqs.len(), path);
    Ok(mcqs)
}

/// MCQs grouped by trimmed subspecialty; blank subspecialties are skipped.
pub fn group_by_specialty(mcqs: &[Mcq]) -> BTreeMap<String, Vec<&Mcq>> {
    let mut groups: BTreeMap<String, Vec<&Mcq>> = BTreeMap::new();
    let mut unassigned = 0usize;

    for mcq in mcqs {
        let specialty = mcq.subspecialty.trim();
        if specialty.is_empty() {
            unassigned += 1;
            continue;
        }
        groups.entry(specialty.to_string()).or_default().push(mcq);
    }

    if unassigned > 0 {
        warn!("{} MCQs have no subspecialty and were skipped", unassigned);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_bare_array() {
        let file = write_temp(
            r#"[{"id": 1, "question_text": "Q1", "subspecialty": "Epilepsy"},
                {"id": 2, "question_text": "Q2", "options": {"A": "x"}, "correct_answer": "A"}]"#,
        );
        let mcqs = load_mcqs(file.path()).unwrap();
        assert_eq!(mcqs.len(), 2);
        assert_eq!(mcqs[1].options.get('A'), Some("x"));
    }

    #[test]
    fn test_load_wrapped_array() {
        let file = write_temp(r#"{"questions": [{"id": 3, "question_text": "Q"}]}"#);
        assert_eq!(load_mcqs(file.path()).unwrap()[0].id, 3);
    }

    #[test]
    fn test_load_rejects_other_layouts() {
        let file = write_temp(r#"{"data": []}"#);
        assert!(matches!(
            load_mcqs(file.path()),
            Err(DataFileError::Layout { .. })
        ));

        let file = write_temp("42");
        assert!(matches!(
            load_mcqs(file.path()),
            Err(DataFileError::Layout { .. })
        ));

        let file = write_temp("[{\"question_text\": \"no id\"}]");
        assert!(matches!(load_mcqs(file.path()), Err(DataFileError::Parse { .. })));
    }

    #[test]
    fn test_group_by_specialty() {
        let mcqs = vec![
            Mcq::new(1, "a", " Epilepsy "),
            Mcq::new(2, "b", "Epilepsy"),
            Mcq::new(3, "c", "Stroke"),
            Mcq::new(4, "d", "  "),
        ];
        let groups = group_by_specialty(&mcqs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["Epilepsy"].len(), 2);
        assert_eq!(groups["Stroke"][0].id, 3);
    }
}
