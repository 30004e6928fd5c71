//! Concurrent per-part search dispatch

use crate::config::CollectionsConfig;
use crate::error::{EvalError, Result};
use crate::identifier::Part;
use crate::retrieval::{PerPartHits, QueryBundle, SearchError, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Fans a [`QueryBundle`] out to one collection per part
///
/// All searches run concurrently under one shared deadline, and each call also
/// has its own timeout. A failed or late part contributes an empty list; only
/// when every part fails does the whole call fail.
#[derive(Clone)]
pub struct RetrievalOrchestrator {
    store: Arc<dyn VectorStore>,
    collections: CollectionsConfig,
    top_k: usize,
    call_timeout: Duration,
    deadline: Duration,
}

impl RetrievalOrchestrator {
    pub fn new(
        store: Arc<dyn VectorStore>,
        collections: CollectionsConfig,
        top_k: usize,
        call_timeout: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            collections,
            top_k,
            call_timeout,
            deadline,
        }
    }

    pub async fn retrieve(&self, bundle: &QueryBundle) -> Result<PerPartHits> {
        let deadline = Instant::now() + self.deadline;
        let mut tasks = JoinSet::new();

        for (part, query) in bundle.iter() {
            let store = Arc::clone(&self.store);
            let collection = self.collections.for_part(part).to_string();
            let query = query.to_string();
            let top_k = self.top_k;
            let call_timeout = self.call_timeout;

            tasks.spawn(async move {
                let outcome =
                    match tokio::time::timeout(call_timeout, store.search(&collection, &query, top_k))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(SearchError::Timeout(collection.clone())),
                    };
                (part, outcome)
            });
        }

        let mut per_part = PerPartHits::new();
        let mut succeeded = 0usize;
        let mut failures: Vec<String> = Vec::new();

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((part, Ok(hits))))) => {
                    tracing::debug!("{} search returned {} hits", part, hits.len());
                    succeeded += 1;
                    per_part.insert(part, hits);
                }
                Ok(Some(Ok((part, Err(e))))) => {
                    tracing::warn!("{} search failed, continuing without it: {}", part, e);
                    failures.push(e.to_string());
                    per_part.insert(part, Vec::new());
                }
                Ok(Some(Err(join_error))) => {
                    tracing::error!("Search task aborted: {}", join_error);
                    failures.push(join_error.to_string());
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Retrieval deadline of {:?} elapsed with {} searches outstanding",
                        self.deadline,
                        tasks.len()
                    );
                    failures.push(format!("deadline of {:?} elapsed", self.deadline));
                    tasks.abort_all();
                    break;
                }
            }
        }

        // Parts lost to a panic or the shared deadline still get an entry
        let missing: Vec<Part> = bundle.parts().filter(|p| !per_part.contains_key(p)).collect();
        for part in missing {
            per_part.insert(part, Vec::new());
        }

        if succeeded == 0 && !bundle.is_empty() {
            return Err(EvalError::RetrievalUnavailable(format!(
                "all {} collection searches failed: {}",
                bundle.len(),
                failures.join("; ")
            )));
        }

        Ok(per_part)
    }
}
