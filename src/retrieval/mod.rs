//! Hybrid retrieval
//!
//! Resolved plan -> query bundle -> concurrent per-collection searches ->
//! rank-preserving merge. The formatter and vector store are collaborators
//! behind traits, so tests substitute deterministic doubles.

mod aggregation;
mod bundle;
mod hits;
mod orchestrator;
mod store;

pub use aggregation::{deduplicate_hits, ResultAggregator};
pub use bundle::{QueryBundle, QueryBundleBuilder};
pub use hits::{PassageHit, PerPartHits, RetrievalResult};
pub use orchestrator::RetrievalOrchestrator;
pub use store::{HttpVectorStore, SearchError, VectorStore};

use crate::config::Config;
use crate::error::{EvalError, Result};
use crate::formatter::QueryFormatter;
use crate::identifier::ModelIdentifier;
use std::sync::Arc;

/// End-to-end retrieval for one model identifier
#[derive(Clone)]
pub struct RetrievalPipeline {
    builder: QueryBundleBuilder,
    orchestrator: Option<RetrievalOrchestrator>,
    aggregator: ResultAggregator,
}

impl RetrievalPipeline {
    /// `store` is `None` when the vector store failed its startup check;
    /// every retrieval then reports [`EvalError::NotReady`]
    pub fn new(
        config: &Config,
        formatter: Option<Arc<dyn QueryFormatter>>,
        store: Option<Arc<dyn VectorStore>>,
    ) -> Self {
        let builder = QueryBundleBuilder::new(formatter, config.formatter.timeout());
        let orchestrator = store.map(|store| {
            RetrievalOrchestrator::new(
                store,
                config.retrieval.collections.clone(),
                config.retrieval.top_k,
                config.vector_store.timeout(),
                config.retrieval.search_timeout(),
            )
        });

        Self {
            builder,
            orchestrator,
            aggregator: ResultAggregator::new(config.retrieval.max_results),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.orchestrator.is_some()
    }

    pub fn can_format(&self) -> bool {
        self.builder.can_format()
    }

    pub async fn run(&self, raw_query: &str, plan: &ModelIdentifier) -> Result<RetrievalResult> {
        let orchestrator = self.orchestrator.as_ref().ok_or_else(|| {
            EvalError::NotReady("vector store is not initialized".to_string())
        })?;

        let bundle = self.builder.build(raw_query, plan).await?;
        tracing::info!(
            "Executing retrieval for '{}' over parts {:?}",
            plan,
            bundle.parts().map(|p| p.as_str()).collect::<Vec<_>>()
        );

        let per_part = orchestrator.retrieve(&bundle).await?;
        let result = self.aggregator.aggregate(&per_part);

        tracing::info!(
            "Retrieval for '{}' selected {} passages: {:?}",
            plan,
            result.len(),
            result.passage_ids()
        );

        Ok(result)
    }
}
