//! Vector store collaborator: one similarity search per collection

use crate::config::VectorStoreConfig;
use crate::retrieval::PassageHit;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Collection '{collection}' unreachable: {reason}")]
    Unreachable { collection: String, reason: String },

    #[error("Malformed response from collection '{collection}': {reason}")]
    Malformed { collection: String, reason: String },

    #[error("Search in collection '{0}' timed out")]
    Timeout(String),
}

/// Trait for vector stores
///
/// Every collection is searched through the same contract; hits come back in
/// rank order with corpus-wide passage ids.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<PassageHit>, SearchError>;
}

/// HTTP client for the passage search service fronting the vector collections
pub struct HttpVectorStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    passage_id: serde_json::Value,
    #[serde(default)]
    passage_text: String,
}

impl HttpVectorStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SearchError::Unreachable {
                collection: "*".to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check that the search service answers at all
    pub async fn heartbeat(&self) -> Result<(), SearchError> {
        let url = format!("{}/heartbeat", self.base_url);
        let unreachable = |reason: String| SearchError::Unreachable {
            collection: "*".to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        if response.status().is_success() {
            tracing::debug!("Vector store heartbeat passed at {}", self.base_url);
            Ok(())
        } else {
            Err(unreachable(format!("heartbeat returned {}", response.status())))
        }
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<PassageHit>, SearchError> {
        let url = format!("{}/collections/{}/search", self.base_url, collection);

        let response = self
            .client
            .post(&url)
            .json(&SearchRequest { query, top_k })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(collection.to_string())
                } else {
                    SearchError::Unreachable {
                        collection: collection.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(SearchError::Unreachable {
                collection: collection.to_string(),
                reason: format!("search returned {}", response.status()),
            });
        }

        let body: SearchResponse = response.json().await.map_err(|e| SearchError::Malformed {
            collection: collection.to_string(),
            reason: e.to_string(),
        })?;

        Ok(convert_hits(collection, body.hits))
    }
}

/// Keep hits whose passage id is an integer (or integer string), in rank order
fn convert_hits(collection: &str, raw: Vec<RawHit>) -> Vec<PassageHit> {
    raw.into_iter()
        .filter_map(|hit| {
            let id = match &hit.passage_id {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            match id {
                Some(passage_id) => Some(PassageHit::new(passage_id, hit.passage_text)),
                None => {
                    tracing::warn!(
                        "Could not convert passage_id '{}' to int in '{}'. Skipping.",
                        hit.passage_id,
                        collection
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_hits_skips_bad_ids() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"hits": [
                {"passage_id": 12, "passage_text": "a"},
                {"passage_id": "13", "passage_text": "b"},
                {"passage_id": "x14", "passage_text": "c"},
                {"passage_id": null},
                {"passage_id": 15}
            ]}"#,
        )
        .unwrap();

        let hits = convert_hits("PropositionsDB", body.hits);
        assert_eq!(
            hits.iter().map(|h| h.passage_id).collect::<Vec<_>>(),
            vec![12, 13, 15]
        );
        assert_eq!(hits[2].passage_text, "");
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let config = VectorStoreConfig {
            // Port 9 (discard) is essentially never listening
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: "500ms".to_string(),
        };
        let store = HttpVectorStore::new(&config).unwrap();

        assert!(store.heartbeat().await.is_err());
        let err = store.search("QuestionsDB", "q", 3).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::Unreachable { .. } | SearchError::Timeout(_)
        ));
    }
}
