//! Query execution and relevance scoring.
//!
//! Two passes run for every non-empty term: the indexed pass over
//! weighted fields with fuzzy token tolerance, and a direct substring
//! scan over the raw corpus. The merged set is scored, normalized into
//! [0, 10], filtered, sorted and paginated.

use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::error::DomainError;
use crate::domain::search::{FieldKind, SearchDocument};

use super::distance::levenshtein;
use super::index::IndexSnapshot;
use super::text;

/// Score assigned to direct-scan results when the indexed pass found
/// nothing at all.
pub const SCAN_FALLBACK_SCORE: f64 = 8.0;
/// Score for scan hits unioned into a thin (< 3 results) indexed set.
pub const SCAN_SUPPLEMENT_SCORE: f64 = 6.0;
/// Indexed result count below which scan hits are unioned in.
const THIN_RESULT_THRESHOLD: usize = 3;
/// Minimum term length for edit-distance tolerance.
const FUZZY_MIN_TERM_LEN: usize = 4;

const BONUS_EXACT: f64 = 50.0;
const BONUS_PREFIX: f64 = 30.0;
const BONUS_WORD: f64 = 20.0;
const BONUS_SUBSTRING: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::NameAsc => "name_asc",
            SortOrder::NameDesc => "name_desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_asc" | "price-asc" => Ok(SortOrder::PriceAsc),
            "price_desc" | "price-desc" => Ok(SortOrder::PriceDesc),
            "name_asc" | "name-asc" => Ok(SortOrder::NameAsc),
            "name_desc" | "name-desc" => Ok(SortOrder::NameDesc),
            other => Err(DomainError::validation(format!(
                "unknown sort order `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// A document with its normalized relevance score.
#[derive(Debug, Clone)]
pub struct ScoredDoc {
    pub doc: SearchDocument,
    pub score: f64,
    pub matched_fields: Vec<FieldKind>,
}

/// Run both passes against the snapshot and return the merged, scored,
/// relevance-ordered result set.
pub fn execute(snapshot: &IndexSnapshot, term: &str) -> Vec<ScoredDoc> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }

    let mut results = indexed_pass(snapshot, &term);
    let scan_hits = scan(&snapshot.documents, &term, SCAN_FALLBACK_SCORE);

    if results.is_empty() {
        return scan_hits;
    }

    if results.len() < THIN_RESULT_THRESHOLD {
        for hit in scan_hits {
            if !results.iter().any(|r| r.doc.id == hit.doc.id) {
                results.push(ScoredDoc {
                    score: SCAN_SUPPLEMENT_SCORE,
                    ..hit
                });
            }
        }
        // Re-establish relevance order after the union.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    results
}

/// Direct substring scan over the raw corpus, each hit at a fixed score.
pub fn scan(documents: &[SearchDocument], term: &str, score: f64) -> Vec<ScoredDoc> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }
    documents
        .iter()
        .filter(|doc| doc.blob.contains(&term))
        .map(|doc| ScoredDoc {
            doc: doc.clone(),
            score,
            matched_fields: vec![FieldKind::Blob],
        })
        .collect()
}

fn indexed_pass(snapshot: &IndexSnapshot, term: &str) -> Vec<ScoredDoc> {
    let query_terms = text::tokenize(term);
    if query_terms.is_empty() {
        return Vec::new();
    }

    // doc position -> matched fields, OR-combined across terms. Insertion
    // order of candidates follows document order for deterministic ties.
    let mut matched: HashMap<usize, Vec<FieldKind>> = HashMap::new();
    for (token, postings) in &snapshot.postings {
        if !query_terms.iter().any(|t| token_matches(token, t)) {
            continue;
        }
        for posting in postings {
            let fields = matched.entry(posting.doc).or_default();
            if !fields.contains(&posting.field) {
                fields.push(posting.field);
            }
        }
    }

    let mut candidates: Vec<(usize, Vec<FieldKind>)> = matched.into_iter().collect();
    candidates.sort_by_key(|(doc, _)| *doc);

    let mut raw: Vec<(ScoredDoc, f64)> = Vec::new();
    for (position, mut fields) in candidates {
        let doc = &snapshot.documents[position];
        fields.sort_by_key(|f| std::cmp::Reverse(f.weight()));
        let mut score = 0.0;
        for field in &fields {
            let field_text = doc.field(*field).to_lowercase();
            score += f64::from(field.weight()) * 10.0 + positional_bonus(&field_text, term);
        }
        raw.push((
            ScoredDoc {
                doc: doc.clone(),
                score: 0.0,
                matched_fields: fields,
            },
            score,
        ));
    }

    normalize(raw)
}

/// Composite positional bonus of `term` within a field's text.
fn positional_bonus(field_text: &str, term: &str) -> f64 {
    if field_text == term {
        BONUS_EXACT
    } else if field_text.starts_with(term) {
        BONUS_PREFIX
    } else if text::contains_word(field_text, term) {
        BONUS_WORD
    } else if field_text.contains(term) {
        BONUS_SUBSTRING
    } else {
        0.0
    }
}

/// Fuzzy token tolerance: exact, prefix, or distance ≤ 1 for longer terms.
fn token_matches(token: &str, term: &str) -> bool {
    if token == term || token.starts_with(term) {
        return true;
    }
    term.chars().count() >= FUZZY_MIN_TERM_LEN && levenshtein(token, term) <= 1
}

/// Scale raw scores against the set maximum into [0, 10]. The incoming
/// order is preserved for equal scores (stable sort).
fn normalize(raw: Vec<(ScoredDoc, f64)>) -> Vec<ScoredDoc> {
    let max = raw
        .iter()
        .map(|(_, score)| *score)
        .fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return Vec::new();
    }
    let mut results: Vec<ScoredDoc> = raw
        .into_iter()
        .map(|(mut scored, score)| {
            scored.score = score / max * 10.0;
            scored
        })
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results
}

/// Category and price-range filters, applied to the merged scored set.
pub fn apply_filters(results: Vec<ScoredDoc>, filters: &Filters) -> Vec<ScoredDoc> {
    let category = filters.category.as_ref().map(|c| c.to_lowercase());
    results
        .into_iter()
        .filter(|r| {
            if let Some(category) = &category {
                if r.doc.category.to_lowercase() != *category {
                    return false;
                }
            }
            if let Some(min) = filters.min_price {
                if r.doc.price < min {
                    return false;
                }
            }
            if let Some(max) = filters.max_price {
                if r.doc.price > max {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Explicit sort overrides the default relevance ordering.
pub fn apply_sort(results: &mut [ScoredDoc], sort: Option<SortOrder>) {
    let Some(sort) = sort else {
        return;
    };
    match sort {
        SortOrder::PriceAsc => results.sort_by(|a, b| a.doc.price.total_cmp(&b.doc.price)),
        SortOrder::PriceDesc => results.sort_by(|a, b| b.doc.price.total_cmp(&a.doc.price)),
        SortOrder::NameAsc => results.sort_by(|a, b| a.doc.name.cmp(&b.doc.name)),
        SortOrder::NameDesc => results.sort_by(|a, b| b.doc.name.cmp(&a.doc.name)),
    }
}

/// Slice out one page; returns the pre-pagination total.
pub fn paginate(results: Vec<ScoredDoc>, page: u32, limit: u32) -> (u64, Vec<ScoredDoc>) {
    let total = results.len() as u64;
    let limit = limit.max(1) as usize;
    let offset = (page.max(1) as usize - 1) * limit;
    let page_items = results.into_iter().skip(offset).take(limit).collect();
    (total, page_items)
}
