//! Passage hits and aggregated results

use crate::identifier::Part;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single candidate passage returned by a collection search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageHit {
    /// Corpus-wide passage identifier
    pub passage_id: i64,

    /// Full passage text
    pub passage_text: String,
}

impl PassageHit {
    pub fn new(passage_id: i64, passage_text: impl Into<String>) -> Self {
        Self {
            passage_id,
            passage_text: passage_text.into(),
        }
    }
}

/// Raw hit lists keyed by the part whose collection produced them
pub type PerPartHits = HashMap<Part, Vec<PassageHit>>;

/// Ranked, deduplicated, length-bounded list of hits
///
/// Only produced by [`ResultAggregator`](crate::retrieval::ResultAggregator).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RetrievalResult {
    hits: Vec<PassageHit>,
}

impl RetrievalResult {
    pub(crate) fn from_ranked(hits: Vec<PassageHit>) -> Self {
        Self { hits }
    }

    pub fn passage_ids(&self) -> Vec<i64> {
        self.hits.iter().map(|hit| hit.passage_id).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_as_list() {
        let result = RetrievalResult::from_ranked(vec![PassageHit::new(7, "seven")]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "passage_id": 7, "passage_text": "seven" }])
        );
    }
}
