//! Topic buckets and drift detection.
//!
//! Both the question and the generated case are mapped onto a small set of
//! named buckets by keyword containment. Drift means both sides landed in at
//! least one bucket and share none. A side with no bucket at all never counts
//! as drift, so two texts about unrecognised subjects always look consistent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::matcher::{SubstringMatcher, TermMatcher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicBucket {
    pub name: String,
    pub keywords: Vec<String>,
}

impl TopicBucket {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicTable {
    pub buckets: Vec<TopicBucket>,
}

impl TopicTable {
    /// Buckets used by the educational-value pass of the comprehensive scorer.
    pub fn educational() -> Self {
        Self {
            buckets: vec![
                TopicBucket::new(
                    "movement",
                    &["parkinson", "huntington", "chorea", "tremor", "rigidity"],
                ),
                TopicBucket::new("seizure", &["seizure", "epilepsy", "ictal", "convulsion"]),
                TopicBucket::new("stroke", &["stroke", "hemiparesis", "infarct", "aphasia"]),
                TopicBucket::new("eye", &["horner", "ptosis", "diplopia", "miosis"]),
                TopicBucket::new("cardiac", &["cabg", "bypass", "cardiac", "coronary"]),
            ],
        }
    }

    /// Buckets used by the term-preservation scorer.
    pub fn clinical() -> Self {
        Self {
            buckets: vec![
                TopicBucket::new(
                    "movement_disorders",
                    &["parkinson", "huntington", "chorea", "tremor", "rigidity", "bradykinesia"],
                ),
                TopicBucket::new(
                    "stroke",
                    &["stroke", "hemiparesis", "aphasia", "infarct", "hemorrhage"],
                ),
                TopicBucket::new("epilepsy", &["seizure", "epilepsy", "ictal", "convulsion"]),
                TopicBucket::new("horner", &["horner", "ptosis", "miosis", "anhidrosis"]),
                TopicBucket::new("dementia", &["alzheimer", "dementia", "cognitive", "memory"]),
                TopicBucket::new("headache", &["migraine", "headache", "cluster"]),
                TopicBucket::new("neuropathy", &["neuropathy", "weakness", "guillain"]),
            ],
        }
    }

    /// Medical domains used by the strict scorer.
    pub fn domains() -> Self {
        Self {
            buckets: vec![
                TopicBucket::new(
                    "movement_disorders",
                    &[
                        "parkinson",
                        "huntington",
                        "chorea",
                        "tremor",
                        "rigidity",
                        "bradykinesia",
                        "dystonia",
                    ],
                ),
                TopicBucket::new(
                    "multiple_sclerosis",
                    &["multiple sclerosis", "ms", "demyelinating", "oligoclonal"],
                ),
                TopicBucket::new(
                    "stroke_vascular",
                    &["stroke", "tia", "infarct", "hemorrhage", "ischemic"],
                ),
                TopicBucket::new("epilepsy", &["seizure", "epilepsy", "ictal", "convulsion"]),
                TopicBucket::new(
                    "dementia_cognitive",
                    &["alzheimer", "dementia", "cognitive impairment", "memory loss"],
                ),
                TopicBucket::new("headache", &["migraine", "headache", "cluster"]),
                TopicBucket::new(
                    "neuropathy",
                    &["neuropathy", "guillain", "weakness", "peripheral nerve"],
                ),
                TopicBucket::new("horner_syndrome", &["horner", "ptosis", "miosis", "anhidrosis"]),
                TopicBucket::new(
                    "cardiac_surgery",
                    &["cabg", "bypass", "cardiac surgery", "coronary"],
                ),
            ],
        }
    }

    /// Names of the buckets whose keywords appear in `text` (lower-cased by the caller).
    pub fn classify(&self, text: &str, matcher: &dyn TermMatcher) -> BTreeSet<String> {
        self.buckets
            .iter()
            .filter(|bucket| matcher.any(text, &bucket.keywords))
            .map(|bucket| bucket.name.clone())
            .collect()
    }

    pub fn compare(
        &self,
        original: &str,
        generated: &str,
        matcher: &dyn TermMatcher,
    ) -> TopicComparison {
        TopicComparison {
            original: self.classify(&original.to_lowercase(), matcher),
            generated: self.classify(&generated.to_lowercase(), matcher),
        }
    }
}

/// Bucket sets for a question and the case generated from it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicComparison {
    pub original: BTreeSet<String>,
    pub generated: BTreeSet<String>,
}

impl TopicComparison {
    pub fn is_mismatch(&self) -> bool {
        !self.original.is_empty()
            && !self.generated.is_empty()
            && self.original.is_disjoint(&self.generated)
    }

    pub fn is_consistent(&self) -> bool {
        !self.is_mismatch()
    }
}

/// Clinical-bucket drift check on raw texts.
pub fn detect_topic_mismatch(original_question: &str, generated_case: &str) -> bool {
    TopicTable::clinical()
        .compare(original_question, generated_case, &SubstringMatcher)
        .is_mismatch()
}

/// Domain consistency check on raw texts; the inverse of a domain mismatch.
pub fn check_topic_consistency(original_question: &str, clinical_presentation: &str) -> bool {
    TopicTable::domains()
        .compare(original_question, clinical_presentation, &SubstringMatcher)
        .is_consistent()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_versus_parkinson_is_mismatch() {
        let original = "A 70-year-old woman with sudden stroke and right hemiparesis.";
        let generated = "He has a resting tremor and was diagnosed with parkinson disease.";
        assert!(detect_topic_mismatch(original, generated));
        assert!(!check_topic_consistency(original, generated));

        let educational = TopicTable::educational().compare(original, generated, &SubstringMatcher);
        assert!(educational.is_mismatch());
        assert!(educational.original.contains("stroke"));
        assert!(educational.generated.contains("movement"));
    }

    #[test]
    fn test_shared_bucket_is_consistent() {
        let original = "Sudden stroke with aphasia";
        let generated = "Acute infarct presenting with hemiparesis";
        assert!(!detect_topic_mismatch(original, generated));
        assert!(check_topic_consistency(original, generated));
    }

    #[test]
    fn test_unrecognised_side_is_never_drift() {
        let original = "Sudden stroke with aphasia";
        let unrelated = "Routine dental cleaning appointment";
        assert!(!detect_topic_mismatch(original, unrelated));
        assert!(!detect_topic_mismatch(unrelated, original));
        assert!(check_topic_consistency(original, unrelated));
        assert!(check_topic_consistency("", ""));
    }

    #[test]
    fn test_classify_is_case_insensitive_through_compare() {
        let comparison =
            TopicTable::clinical().compare("HORNER syndrome", "PTOSIS noted", &SubstringMatcher);
        assert_eq!(comparison.original, comparison.generated);
        assert!(comparison.is_consistent());
    }

    #[test]
    fn test_table_serializes_as_list() {
        let json = serde_json::to_value(TopicTable::educational()).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 5);
        let back: TopicTable = serde_json::from_value(json).unwrap();
        assert_eq!(back, TopicTable::educational());
    }
}
