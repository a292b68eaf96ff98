//! Keyword lists behind the scoring heuristics.
//!
//! The built-in lists are fixed neurology vocabularies. A JSON file can replace
//! any subset of them; missing fields keep their built-in values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

use crate::error::DataFileError;
use crate::topic::TopicTable;

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    // Critical content categories
    pub conditions: Vec<String>,
    pub locations: Vec<String>,
    pub signs: Vec<String>,
    pub procedures: Vec<String>,
    pub medications: Vec<String>,

    // Question purpose cascade, checked in this order
    pub diagnosis_phrases: Vec<String>,
    pub management_phrases: Vec<String>,
    pub advanced_management_phrases: Vec<String>,
    pub investigation_phrases: Vec<String>,
    pub localization_phrases: Vec<String>,

    pub clinical_language: Vec<String>,
    pub treatment_failure_context: Vec<String>,
    pub medication_details: Vec<String>,
    pub complexity_markers: Vec<String>,

    // Term-preservation mode
    pub key_terms: Vec<String>,
    pub critical_terms: Vec<String>,
    pub advanced_keywords: Vec<String>,
    pub detail_medication_indicators: Vec<String>,
    pub detail_failure_indicators: Vec<String>,
    pub detail_impact_indicators: Vec<String>,
    pub detail_common_medications: Vec<String>,

    // Strict mode
    pub strict_conditions: Vec<String>,
    pub strict_anatomy: Vec<String>,
    pub strict_signs: Vec<String>,
    pub strict_procedures: Vec<String>,
    pub strict_advanced_markers: Vec<String>,
    pub strict_detail_indicators: Vec<String>,

    pub educational_topics: TopicTable,
    pub clinical_topics: TopicTable,
    pub domain_topics: TopicTable,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            conditions: words(&[
                "horner syndrome",
                "parkinson",
                "huntington",
                "alzheimer",
                "multiple sclerosis",
                "ms",
                "guillain barre",
                "gbs",
                "myasthenia gravis",
                "epilepsy",
                "seizure",
                "stroke",
                "tia",
                "migraine",
                "cluster headache",
                "tension headache",
                "dementia",
                "delirium",
                "depression",
                "anxiety",
            ]),
            locations: words(&[
                "bilateral caudate",
                "caudate",
                "putamen",
                "globus pallidus",
                "thalamus",
                "brainstem",
                "midbrain",
                "pons",
                "medulla",
                "cerebellum",
                "frontal lobe",
                "temporal lobe",
                "parietal lobe",
                "occipital lobe",
                "left hemisphere",
                "right hemisphere",
                "bilateral",
            ]),
            signs: words(&[
                "ptosis",
                "miosis",
                "anhidrosis",
                "diplopia",
                "nystagmus",
                "tremor",
                "rigidity",
                "bradykinesia",
                "chorea",
                "dystonia",
                "ataxia",
                "hemiparesis",
                "paraparesis",
                "quadriparesis",
                "weakness",
                "aphasia",
                "dysarthria",
                "dysphagia",
            ]),
            procedures: words(&[
                "thalamotomy",
                "pallidotomy",
                "dbs",
                "deep brain stimulation",
                "vns",
                "vagal nerve stimulation",
                "hemispherectomy",
                "corpus callosotomy",
                "cabg",
                "bypass surgery",
                "cardiac surgery",
            ]),
            medications: words(&[
                "levodopa",
                "carbidopa",
                "ropinirole",
                "pramipexole",
                "rasagiline",
                "topiramate",
                "topamax",
                "lamotrigine",
                "lamictal",
                "levetiracetam",
                "keppra",
                "phenytoin",
                "carbamazepine",
                "valproate",
                "depakote",
            ]),

            diagnosis_phrases: words(&["diagnosis", "most likely", "what is the", "which condition"]),
            management_phrases: words(&[
                "treatment",
                "management",
                "next step",
                "best management",
                "therapy",
            ]),
            advanced_management_phrases: words(&[
                "refractory",
                "failed",
                "surgery",
                "surgical",
                "thalamotomy",
                "dbs",
            ]),
            investigation_phrases: words(&[
                "investigation",
                "test",
                "imaging",
                "mri",
                "ct",
                "eeg",
                "emg",
            ]),
            localization_phrases: words(&["lesion", "where", "location", "localize"]),

            clinical_language: words(&[
                "presents",
                "history",
                "examination",
                "symptoms",
                "complains",
                "reports",
            ]),
            treatment_failure_context: words(&["failed", "refractory", "side effects"]),
            medication_details: words(&["mg", "dose", "daily"]),
            complexity_markers: words(&["complex", "advanced"]),

            key_terms: words(&[
                "stroke",
                "seizure",
                "epilepsy",
                "parkinson",
                "huntington",
                "alzheimer",
                "multiple sclerosis",
                "ms",
                "migraine",
                "headache",
                "neuropathy",
                "myopathy",
                "weakness",
                "paralysis",
                "tremor",
                "rigidity",
                "chorea",
                "dystonia",
                "ataxia",
                "aphasia",
                "dysarthria",
                "dysphagia",
                "diplopia",
                "dementia",
                "cognitive",
                "memory",
                "confusion",
                "horner",
                "bilateral",
                "left",
                "right",
                "frontal",
                "temporal",
                "parietal",
                "brainstem",
                "cerebellum",
                "spinal",
                "caudate",
                "putamen",
                "ct",
                "mri",
                "eeg",
                "emg",
                "csf",
                "lumbar puncture",
                "surgery",
                "surgical",
                "cabg",
                "bypass",
                "cardiac",
                "hypertension",
                "diabetes",
                "atrial fibrillation",
                "thalamotomy",
                "dbs",
                "vns",
                "refractory",
                "intractable",
                "cocaine",
                "amphetamine",
                "ptosis",
                "miosis",
                "anhidrosis",
            ]),
            critical_terms: words(&[
                "horner",
                "parkinson",
                "huntington",
                "caudate",
                "stroke",
                "seizure",
                "epilepsy",
            ]),
            advanced_keywords: words(&[
                "thalamotomy",
                "dbs",
                "deep brain stimulation",
                "vns",
                "vagal nerve stimulation",
                "epilepsy surgery",
                "hemispherectomy",
                "corpus callosotomy",
                "refractory",
                "intractable",
                "resistant",
                "failed medical therapy",
                "surgical",
                "surgery",
            ]),
            detail_medication_indicators: words(&[
                "mg",
                "dose",
                "daily",
                "twice",
                "three times",
                "q8h",
                "q12h",
            ]),
            detail_failure_indicators: words(&[
                "failed",
                "inadequate",
                "side effects",
                "intolerant",
                "refractory",
            ]),
            detail_impact_indicators: words(&[
                "unable to work",
                "disability",
                "adl",
                "quality of life",
                "function",
            ]),
            detail_common_medications: words(&[
                "levodopa",
                "carbidopa",
                "ropinirole",
                "pramipexole",
                "levetiracetam",
                "valproate",
            ]),

            strict_conditions: words(&[
                "multiple sclerosis",
                "ms",
                "parkinson",
                "huntington",
                "alzheimer",
                "horner syndrome",
                "horner",
                "guillain barre",
                "gbs",
                "myasthenia gravis",
                "stroke",
                "tia",
                "seizure",
                "epilepsy",
                "migraine",
                "cluster headache",
            ]),
            strict_anatomy: words(&[
                "bilateral caudate",
                "caudate",
                "putamen",
                "thalamus",
                "brainstem",
                "frontal lobe",
                "temporal lobe",
                "parietal lobe",
                "cerebellum",
            ]),
            strict_signs: words(&[
                "ptosis",
                "miosis",
                "anhidrosis",
                "diplopia",
                "nystagmus",
                "tremor",
                "rigidity",
                "bradykinesia",
                "chorea",
                "dystonia",
                "hemiparesis",
                "paraparesis",
                "aphasia",
                "dysarthria",
            ]),
            strict_procedures: words(&[
                "thalamotomy",
                "dbs",
                "deep brain stimulation",
                "vns",
                "hemispherectomy",
                "cabg",
                "bypass surgery",
            ]),
            strict_advanced_markers: words(&["advanced", "refractory"]),
            strict_detail_indicators: words(&["failed", "mg", "dose"]),

            educational_topics: TopicTable::educational(),
            clinical_topics: TopicTable::clinical(),
            domain_topics: TopicTable::domains(),
        }
    }
}

impl Vocabulary {
    /// Shared instance of the built-in lists.
    pub fn builtin() -> &'static Vocabulary {
        static BUILTIN: OnceLock<Vocabulary> = OnceLock::new();
        BUILTIN.get_or_init(Vocabulary::default)
    }

    /// Load a vocabulary override; fields absent from the file keep built-in values.
    pub fn load(path: &Path) -> Result<Self, DataFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| DataFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let vocabulary: Vocabulary =
            serde_json::from_str(&content).map_err(|source| DataFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Loaded vocabulary override from {:?}", path);
        Ok(vocabulary)
    }

    /// Strict-mode critical terms: conditions, anatomy, signs and procedures in that order.
    pub fn strict_critical_terms(&self) -> impl Iterator<Item = &String> {
        self.strict_conditions
            .iter()
            .chain(&self.strict_anatomy)
            .chain(&self.strict_signs)
            .chain(&self.strict_procedures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_list_sizes() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.conditions.len(), 20);
        assert_eq!(vocab.locations.len(), 17);
        assert_eq!(vocab.signs.len(), 18);
        assert_eq!(vocab.procedures.len(), 11);
        assert_eq!(vocab.medications.len(), 15);
        assert_eq!(vocab.critical_terms.len(), 7);
        assert_eq!(vocab.strict_critical_terms().count(), 46);
    }

    #[test]
    fn test_keywords_are_lowercase() {
        let vocab = Vocabulary::builtin();
        for term in vocab
            .conditions
            .iter()
            .chain(&vocab.locations)
            .chain(&vocab.signs)
            .chain(&vocab.key_terms)
        {
            assert_eq!(term, &term.to_lowercase(), "keyword not lower-case: {}", term);
        }
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"conditions": ["narcolepsy"]}}"#).unwrap();

        let vocab = Vocabulary::load(file.path()).unwrap();
        assert_eq!(vocab.conditions, vec!["narcolepsy".to_string()]);
        assert_eq!(vocab.signs, Vocabulary::default().signs);
        assert_eq!(vocab.domain_topics, TopicTable::domains());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Vocabulary::load(Path::new("/nonexistent/vocab.json")).unwrap_err();
        assert!(matches!(err, DataFileError::Read { .. }));
    }
}
