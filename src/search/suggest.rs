//! Autocomplete phrases and spelling corrections.

use std::collections::HashMap;

use crate::domain::search::SearchDocument;

use super::distance::overlap_similarity;
use super::text;

/// Candidates below this similarity are never offered as corrections.
pub const SIMILARITY_FLOOR: f64 = 0.7;
/// Spelling correction is only attempted for terms at least this long.
pub const SPELLING_MIN_TERM_LEN: usize = 4;
/// Result counts below this are treated as a low-confidence signal.
pub const SPELLING_MAX_RESULTS: usize = 3;

/// Hard cap on autocomplete phrases per response.
pub const AUTOCOMPLETE_LIMIT: usize = 5;
/// How many of the best-matching documents feed the candidate pool.
pub const CANDIDATE_POOL_SIZE: usize = 20;
const NGRAM_MAX_WORDS: usize = 3;
const CANDIDATE_MIN_WORD_LEN: usize = 3;

const SCORE_EXACT: i32 = 10;
const SCORE_PREFIX: i32 = 5;
const SCORE_WORD: i32 = 3;
const LENGTH_PENALTY: i32 = 2;
const LENGTH_BONUS: i32 = 2;

/// Derive up to five autocomplete phrases from the top matching documents.
///
/// Candidates are 1–3-word n-grams of document names plus categories, kept
/// only when they contain the query as a substring.
pub fn autocomplete(documents: &[&SearchDocument], query: &str) -> Vec<String> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: HashMap<String, i32> = HashMap::new();
    for document in documents {
        for candidate in text::ngrams(&document.name, NGRAM_MAX_WORDS) {
            consider(&mut scored, candidate, &query);
        }
        consider(&mut scored, document.category.to_lowercase(), &query);
    }

    let mut candidates: Vec<(String, i32)> = scored.into_iter().collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    candidates.truncate(AUTOCOMPLETE_LIMIT);
    candidates.into_iter().map(|(text, _)| text).collect()
}

fn consider(scored: &mut HashMap<String, i32>, candidate: String, query: &str) {
    if candidate.is_empty() || !candidate.contains(query) {
        return;
    }

    let mut score = if candidate == query {
        SCORE_EXACT
    } else if candidate.starts_with(query) {
        SCORE_PREFIX
    } else if text::contains_word(&candidate, query) {
        SCORE_WORD
    } else {
        0
    };

    let len = candidate.chars().count();
    if len > 30 {
        score -= LENGTH_PENALTY;
    } else if (10..=20).contains(&len) {
        score += LENGTH_BONUS;
    }

    // Dedupe keeps the best score seen for a candidate.
    let slot = scored.entry(candidate).or_insert(i32::MIN);
    *slot = (*slot).max(score);
}

/// Whether a thin result set for this term warrants a spelling attempt.
pub fn should_attempt_spelling(term: &str, result_count: usize) -> bool {
    term.chars().count() >= SPELLING_MIN_TERM_LEN && result_count < SPELLING_MAX_RESULTS
}

/// Best spelling correction for `term` drawn from document names and
/// categories, or `None` when nothing clears the similarity floor.
pub fn spelling_correction(term: &str, documents: &[SearchDocument]) -> Option<String> {
    let term = term.trim().to_lowercase();
    let mut best: Option<(String, f64)> = None;

    for document in documents {
        for source in [document.name.as_str(), document.category.as_str()] {
            for word in text::tokenize(source) {
                if word.chars().count() < CANDIDATE_MIN_WORD_LEN || word == term {
                    continue;
                }
                let score = similarity(&term, &word);
                if score <= SIMILARITY_FLOOR {
                    continue;
                }
                let better = best
                    .as_ref()
                    .is_none_or(|(_, best_score)| score > *best_score);
                if better {
                    best = Some((word, score));
                }
            }
        }
    }

    best.map(|(word, _)| word)
}

/// Similarity in `[0, 1]`.
///
/// Chain: equality, containment (length ratio), common prefix longer than
/// two characters (prefix ratio), then normalized edit distance.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return 1.0;
    }

    if a.contains(b) || b.contains(a) {
        return a_len.min(b_len) as f64 / max_len as f64;
    }

    let prefix = text::common_prefix_len(a, b);
    if prefix > 2 {
        return prefix as f64 / max_len as f64;
    }

    overlap_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use crate::domain::product::{ProductRecord, VolatilityFlags};

    use super::*;

    fn doc(name: &str, category: &str) -> SearchDocument {
        SearchDocument::from_record(&ProductRecord {
            id: name.to_string(),
            slug: name.to_string(),
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            vendor: String::new(),
            price: 0.0,
            flags: VolatilityFlags::default(),
        })
    }

    #[test]
    fn autocomplete_prefers_prefix_phrases() {
        let d1 = doc("Kit Enxoval Completo", "Enxoval");
        let d2 = doc("Super Kit de Beleza", "Beleza");
        let docs: Vec<&SearchDocument> = vec![&d1, &d2];

        let suggestions = autocomplete(&docs, "kit");
        assert!(!suggestions.is_empty());
        assert!(suggestions.len() <= 5);
        assert!(suggestions[0].starts_with("kit"));
        // Every suggestion contains the query.
        assert!(suggestions.iter().all(|s| s.contains("kit")));
    }

    #[test]
    fn autocomplete_includes_matching_categories() {
        let d = doc("Berço Montessoriano", "Kits de Berço");
        let docs: Vec<&SearchDocument> = vec![&d];
        let suggestions = autocomplete(&docs, "kit");
        assert!(suggestions.iter().any(|s| s == "kits de berço"));
    }

    #[test]
    fn autocomplete_empty_query_yields_nothing() {
        let d = doc("Kit", "Enxoval");
        let docs: Vec<&SearchDocument> = vec![&d];
        assert!(autocomplete(&docs, "  ").is_empty());
    }

    #[test]
    fn similarity_chain() {
        assert_eq!(similarity("kit", "kit"), 1.0);
        // Containment: ratio of lengths.
        assert!((similarity("kit", "kits") - 0.75).abs() < 1e-9);
        // Long common prefix.
        assert!(similarity("montessori", "montessoriano") > 0.7);
        // Dissimilar strings land low.
        assert!(similarity("xyzqv", "berço") < 0.3);
    }

    #[test]
    fn spelling_returns_closest_candidate() {
        let docs = vec![
            doc("Berço Montessoriano", "Berços"),
            doc("Mobile Musical", "Decoração"),
        ];
        let corrected = spelling_correction("montessorian", &docs);
        assert_eq!(corrected.as_deref(), Some("montessoriano"));
    }

    #[test]
    fn spelling_returns_none_when_nothing_similar() {
        let docs = vec![
            doc("Berço Montessoriano", "Berços"),
            doc("Mobile Musical", "Decoração"),
        ];
        assert!(spelling_correction("xyzqv", &docs).is_none());
    }

    #[test]
    fn spelling_gate_requires_long_term_and_thin_results() {
        assert!(should_attempt_spelling("berco", 0));
        assert!(!should_attempt_spelling("kit", 0));
        assert!(!should_attempt_spelling("berco", 3));
    }
}
