//! Quality audit for MCQ to clinical case conversions.
//!
//! A batch samples MCQs per subspecialty, converts each into a clinical case
//! (template, LLM or replayed), scores the case against the MCQ with one of
//! three heuristic scorers and folds the results into a report.

pub mod activity_log;
pub mod answer_context;
pub mod batch;
pub mod case;
pub mod config;
pub mod content;
pub mod converter;
pub mod dataset;
pub mod error;
pub mod integrity;
pub mod llm_client;
pub mod matcher;
pub mod mcq;
pub mod purpose;
pub mod report;
pub mod scoring;
pub mod topic;
pub mod vocabulary;


pub use case::{CaseData, CaseOutcome};
pub use mcq::Mcq;
pub use scoring::{evaluate_case_quality, AnalysisMode, AnalysisResult, Issue};
