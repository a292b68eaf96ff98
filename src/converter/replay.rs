//! Replays cases recorded by an earlier conversion run.
//!
//! The cases file is either an array of records carrying `source_mcq_id`, or
//! an object keyed by MCQ id. Records use the flat legacy shape with a
//! `fallback_used` flag.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::CaseConverter;
use crate::case::{CaseOutcome, LegacyCaseRecord};
use crate::error::{ConversionError, DataFileError};
use crate::mcq::Mcq;

#[derive(Debug, Clone, Default)]
pub struct ReplayConverter {
    cases: HashMap<i64, LegacyCaseRecord>,
}

impl ReplayConverter {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (i64, LegacyCaseRecord)>,
    {
        Self {
            cases: records.into_iter().collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, DataFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| DataFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| DataFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |source: serde_json::Error| DataFileError::Parse {
            path: path.to_path_buf(),
            source,
        };

        let mut cases = HashMap::new();
        match value {
            Value::Array(items) => {
                for item in items {
                    let record: LegacyCaseRecord =
                        serde_json::from_value(item).map_err(parse_error)?;
                    match record.source_mcq_id {
                        Some(id) => {
                            cases.insert(id, record);
                        }
                        None => warn!("Skipping recorded case without source_mcq_id"),
                    }
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    let Ok(id) = key.trim().parse::<i64>() else {
                        warn!("Skipping recorded case with non-numeric key {:?}", key);
                        continue;
                    };
                    let record: LegacyCaseRecord =
                        serde_json::from_value(item).map_err(parse_error)?;
                    cases.insert(id, record);
                }
            }
            _ => {
                return Err(DataFileError::Layout {
                    path: path.to_path_buf(),
                    reason: "expected an array or an object of recorded cases".to_string(),
                })
            }
        }

        info!("Loaded {} recorded cases from {:?}", cases.len(), path);
        Ok(Self { cases })
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[async_trait]
impl CaseConverter for ReplayConverter {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn convert(&self, mcq: &Mcq) -> Result<CaseOutcome, ConversionError> {
        let record = self
            .cases
            .get(&mcq.id)
            .ok_or(ConversionError::NotFound(mcq.id))?;

        if let Some(error) = record.error.as_deref().filter(|e| !e.trim().is_empty()) {
            return Err(ConversionError::Recorded(error.to_string()));
        }

        Ok(CaseOutcome::from(record.clone()))
    }
}
