//! Deterministic collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use retrieval_eval::error::{EvalError, Result};
use retrieval_eval::formatter::{FormattedQueries, QueryFormatter};
use retrieval_eval::retrieval::{PassageHit, SearchError, VectorStore};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How a fake collection answers
#[derive(Clone)]
pub enum Collection {
    Hits(Vec<i64>),
    Down,
    Stalled,
}

/// Vector store answering from a fixed table, recording every call
#[derive(Default)]
pub struct FakeStore {
    collections: HashMap<String, Collection>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: &str, behavior: Collection) -> Self {
        self.collections.insert(collection.to_string(), behavior);
        self
    }

    /// (collection, query) pairs, sorted
    pub fn calls(&self) -> Vec<(String, String)> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> std::result::Result<Vec<PassageHit>, SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push((collection.to_string(), query.to_string()));

        match self.collections.get(collection).cloned() {
            Some(Collection::Hits(ids)) => Ok(ids
                .into_iter()
                .take(top_k)
                .map(|id| PassageHit::new(id, format!("passage {}", id)))
                .collect()),
            Some(Collection::Stalled) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            Some(Collection::Down) | None => Err(SearchError::Unreachable {
                collection: collection.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// Formatter that tags the raw query with each category name
#[derive(Default)]
pub struct TaggingFormatter {
    calls: AtomicUsize,
    omit_summary: bool,
}

impl TaggingFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_summary() -> Self {
        Self {
            omit_summary: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryFormatter for TaggingFormatter {
    async fn format(&self, query: &str) -> Result<FormattedQueries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FormattedQueries {
            proposition: Some(format!("proposition: {}", query)),
            summary: (!self.omit_summary).then(|| format!("summary: {}", query)),
            question: Some(format!("question: {}", query)),
        })
    }

    fn name(&self) -> &str {
        "tagging"
    }
}

/// Formatter whose backend is unreachable
pub struct OfflineFormatter;

#[async_trait]
impl QueryFormatter for OfflineFormatter {
    async fn format(&self, _query: &str) -> Result<FormattedQueries> {
        Err(EvalError::FormatterUnavailable("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

/// Write a `{id}.json` passage document
pub fn write_passage(dir: &Path, id: &str, questions: &[&str]) {
    let doc = serde_json::json!({
        "passage": format!("Passage {}", id),
        "num_questions": questions.len(),
        "questions": questions,
    });
    std::fs::write(dir.join(format!("{}.json", id)), doc.to_string()).unwrap();
}
