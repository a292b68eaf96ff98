use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or writing one of the JSON files the audit works with
/// (MCQ datasets, replayed cases, vocabularies, reports).
#[derive(Debug, Error)]
pub enum DataFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported layout in {path}: {reason}")]
    Layout { path: PathBuf, reason: String },
}

/// Errors from the chat completions client
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Invalid LLM API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("{0}")]
    InvalidRequest(&'static str),

    #[error("Failed to connect to LLM API: {0}")]
    Connection(String),

    #[error("LLM API returned error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse LLM response: {0}")]
    Decode(String),

    #[error("No response choices returned")]
    EmptyResponse,
}

/// Errors a case converter reports instead of a case.
///
/// Any of these becomes a `CONVERSION_ERROR` record in the batch; none abort the run.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("MCQ {0} has no question text")]
    EmptyQuestion(i64),

    #[error("no recorded case for MCQ {0}")]
    NotFound(i64),

    #[error("recorded conversion failure: {0}")]
    Recorded(String),
}
