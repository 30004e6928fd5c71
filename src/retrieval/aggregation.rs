//! Rank-preserving merge of per-part hit lists
//!
//! Hit lists are concatenated in canonical part order (proposition, summary,
//! question) no matter how the identifier listed its parts, duplicates are
//! dropped keeping the first occurrence, and the result is cut to
//! `max_results`. Nothing is re-scored: position 1 is the top proposition hit
//! when the plan includes propositions, otherwise the top summary hit, and so on.

use crate::identifier::Part;
use crate::retrieval::{PassageHit, PerPartHits, RetrievalResult};
use std::collections::HashSet;

/// Merges raw per-part hits into a [`RetrievalResult`]
#[derive(Debug, Clone, Copy)]
pub struct ResultAggregator {
    max_results: usize,
}

impl ResultAggregator {
    pub fn new(max_results: usize) -> Self {
        Self { max_results }
    }

    pub fn aggregate(&self, per_part: &PerPartHits) -> RetrievalResult {
        let ordered = Part::ALL
            .iter()
            .filter_map(|part| per_part.get(part))
            .flat_map(|hits| hits.iter().cloned());

        let mut merged = deduplicate_hits(ordered);
        merged.truncate(self.max_results);

        RetrievalResult::from_ranked(merged)
    }
}

/// Deduplicate hits by passage_id, keeping the first instance
pub fn deduplicate_hits(hits: impl IntoIterator<Item = PassageHit>) -> Vec<PassageHit> {
    let mut seen: HashSet<i64> = HashSet::new();

    hits.into_iter()
        .filter(|hit| seen.insert(hit.passage_id))
        .collect()
}
