//! HTTP service
//!
//! Thin axum layer over the corpus, the retrieval pipeline and the evaluation
//! recorder. Collaborators are checked once at startup; a collaborator that is
//! down leaves the affected endpoints answering 503 instead of failing startup.

pub mod handlers;
mod response;
mod shutdown;

pub use shutdown::ShutdownSignal;

use crate::config::{expand_tilde, Config};
use crate::corpus::PassageStore;
use crate::error::{EvalError, Result};
use crate::evaluation::EvaluationRecorder;
use crate::formatter::{LlmQueryFormatter, QueryFormatter};
use crate::retrieval::{HttpVectorStore, RetrievalPipeline, VectorStore};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub corpus: Arc<PassageStore>,
    pub pipeline: Arc<RetrievalPipeline>,
    pub recorder: Arc<EvaluationRecorder>,
}

impl AppState {
    pub fn new(
        corpus: PassageStore,
        pipeline: RetrievalPipeline,
        recorder: EvaluationRecorder,
    ) -> Self {
        Self {
            corpus: Arc::new(corpus),
            pipeline: Arc::new(pipeline),
            recorder: Arc::new(recorder),
        }
    }

    /// Build production collaborators from configuration
    pub async fn from_config(config: &Config) -> Self {
        let corpus = PassageStore::new(expand_tilde(&config.corpus.data_dir));
        if !corpus.is_available() {
            tracing::warn!(
                "Data directory {:?} does not exist; passage endpoints will fail",
                corpus.data_dir()
            );
        }

        let store = connect_vector_store(config).await;
        let formatter = connect_formatter(config);
        let pipeline = RetrievalPipeline::new(config, formatter, store);
        tracing::info!(
            "Retrieval ready: {}, query formatting available: {}",
            pipeline.is_ready(),
            pipeline.can_format()
        );

        let recorder = EvaluationRecorder::new(
            &config.evaluation,
            expand_tilde(&config.evaluation.log_path),
        );
        tracing::info!("Evaluation results will be appended to {:?}", recorder.log().path());

        Self::new(corpus, pipeline, recorder)
    }
}

async fn connect_vector_store(config: &Config) -> Option<Arc<dyn VectorStore>> {
    let store = match HttpVectorStore::new(&config.vector_store) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to create vector store client: {}", e);
            return None;
        }
    };

    match store.heartbeat().await {
        Ok(()) => {
            tracing::info!("Vector store reachable at {}", config.vector_store.base_url);
            Some(Arc::new(store))
        }
        Err(e) => {
            tracing::error!(
                "Vector store at {} failed its heartbeat, retrieval disabled: {}",
                config.vector_store.base_url,
                e
            );
            None
        }
    }
}

fn connect_formatter(config: &Config) -> Option<Arc<dyn QueryFormatter>> {
    if !config.formatter.enabled {
        tracing::info!("Query formatter disabled; formatted identifiers will answer 503");
        return None;
    }

    match LlmQueryFormatter::new(&config.formatter) {
        Ok(formatter) => {
            tracing::info!(
                "Query formatter '{}' at {}",
                config.formatter.model,
                config.formatter.base_url
            );
            Some(Arc::new(formatter))
        }
        Err(e) => {
            tracing::error!("Failed to create query formatter: {}", e);
            None
        }
    }
}

/// Route table
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/get_passage_list", get(handlers::passage_list))
        .route("/get_question_list", get(handlers::question_list))
        .route("/get_question", get(handlers::question))
        .route("/get_models", get(handlers::models))
        .route(
            "/get_model_based_passage_data",
            post(handlers::model_based_passage_data),
        )
        .route(
            "/save_evaluation_result",
            post(handlers::save_evaluation_result),
        )
        .with_state(state)
}

/// Bind and serve until SIGINT or SIGTERM
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config).await;
    let app = router(state);

    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| EvalError::Io {
            source: e,
            context: format!("Failed to bind {}", address),
        })?;
    tracing::info!("Listening on http://{}", address);

    let shutdown = ShutdownSignal::new()?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.wait())
        .await
        .map_err(|e| EvalError::Io {
            source: e,
            context: "HTTP server failed".to_string(),
        })?;

    tracing::info!("Server stopped");
    Ok(())
}
