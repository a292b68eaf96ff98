//! Term matching used by every keyword heuristic in the scorers.
//!
//! All scoring code asks "does this text mention this term?" through
//! [`TermMatcher`], so keyword lists and matching rules can change without
//! touching the scoring passes. Callers lower-case the text first; keyword
//! lists are stored lower-case.

use std::fmt;

pub trait TermMatcher: Send + Sync + fmt::Debug {
    /// Whether `term` occurs in `text`.
    fn contains(&self, text: &str, term: &str) -> bool;

    /// Terms from `terms` that occur in `text`, in list order.
    fn matching<'t>(&self, text: &str, terms: &'t [String]) -> Vec<&'t str> {
        terms
            .iter()
            .map(String::as_str)
            .filter(|term| self.contains(text, term))
            .collect()
    }

    /// Whether any term from `terms` occurs in `text`.
    fn any(&self, text: &str, terms: &[String]) -> bool {
        terms.iter().any(|term| self.contains(text, term))
    }
}

/// Literal substring containment.
///
/// No tokenization or stemming: "ms" matches inside "symptoms". Extra matches
/// only add validation work, they never hide a missing term.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl TermMatcher for SubstringMatcher {
    fn contains(&self, text: &str, term: &str) -> bool {
        text.contains(term)
    }
}

/// Match only when the term is bounded by non-alphanumeric characters.
///
/// Used where substring hits are plainly wrong, e.g. "male" inside "female".
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeWordMatcher;

impl TermMatcher for WholeWordMatcher {
    fn contains(&self, text: &str, term: &str) -> bool {
        if term.is_empty() {
            return false;
        }

        text.match_indices(term).any(|(start, _)| {
            let end = start + term.len();
            let before_ok = text[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
            let after_ok = text[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
            before_ok && after_ok
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_substring_matches_inside_words() {
        let matcher = SubstringMatcher;
        assert!(matcher.contains("new symptoms today", "ms"));
        assert!(matcher.contains("initial visit", "tia"));
        assert!(!matcher.contains("tremor", "rigidity"));
    }

    #[test]
    fn test_matching_keeps_list_order() {
        let matcher = SubstringMatcher;
        let list = terms(&["ptosis", "miosis", "anhidrosis"]);
        let found = matcher.matching("anhidrosis and ptosis", &list);
        assert_eq!(found, vec!["ptosis", "anhidrosis"]);
    }

    #[test]
    fn test_any() {
        let matcher = SubstringMatcher;
        let list = terms(&["failed", "refractory"]);
        assert!(matcher.any("refractory to two agents", &list));
        assert!(!matcher.any("first presentation", &list));
        assert!(!matcher.any("anything", &[]));
    }

    #[test]
    fn test_whole_word_rejects_embedded_terms() {
        let matcher = WholeWordMatcher;
        assert!(!matcher.contains("a 30-year-old female", "male"));
        assert!(matcher.contains("a 30-year-old male.", "male"));
        assert!(matcher.contains("male", "male"));
        assert!(matcher.contains("female patient, male partner", "male"));
        assert!(!matcher.contains("anything", ""));
    }

    proptest! {
        #[test]
        fn prop_whole_word_implies_substring(text in "[a-z ]{0,40}", term in "[a-z]{1,4}") {
            if WholeWordMatcher.contains(&text, &term) {
                prop_assert!(SubstringMatcher.contains(&text, &term));
            }
        }
    }
}
