//! Request handlers

use crate::error::{EvalError, Result, ValidationError};
use crate::evaluation::{Acknowledgement, EvaluationSubmission};
use crate::identifier::{enumerate_all, resolve};
use crate::retrieval::RetrievalResult;
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct PassageParams {
    pub passage_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionParams {
    pub passage_id: String,
    pub question_index: i64,
}

/// Passage ids arrive as either JSON strings or numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PassageRef {
    Number(u64),
    Text(String),
}

impl PassageRef {
    fn as_id(&self) -> String {
        match self {
            PassageRef::Number(n) => n.to_string(),
            PassageRef::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RetrievalRequest {
    pub passage_id: PassageRef,
    pub question_index: i64,
    pub model_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionList {
    pub passage: String,
    pub question_indexes: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionText {
    pub question: String,
}

pub async fn passage_list(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let ids = state.corpus.list_ids().await?;
    tracing::debug!("Listing {} passages", ids.len());
    Ok(Json(ids))
}

pub async fn question_list(
    State(state): State<AppState>,
    params: std::result::Result<Query<PassageParams>, QueryRejection>,
) -> Result<Json<QuestionList>> {
    let Query(params) = params.map_err(|e| EvalError::BadRequest(e.body_text()))?;
    let (passage, question_indexes) = state.corpus.question_indexes(&params.passage_id).await?;
    Ok(Json(QuestionList {
        passage,
        question_indexes,
    }))
}

pub async fn question(
    State(state): State<AppState>,
    params: std::result::Result<Query<QuestionParams>, QueryRejection>,
) -> Result<Json<QuestionText>> {
    let Query(params) = params.map_err(|e| EvalError::BadRequest(e.body_text()))?;
    let question = state
        .corpus
        .question(&params.passage_id, params.question_index)
        .await?;
    Ok(Json(QuestionText { question }))
}

pub async fn models() -> Json<Vec<String>> {
    Json(enumerate_all().iter().map(ToString::to_string).collect())
}

pub async fn model_based_passage_data(
    State(state): State<AppState>,
    request: std::result::Result<Json<RetrievalRequest>, JsonRejection>,
) -> Result<Json<RetrievalResult>> {
    let Json(request) = request.map_err(|e| EvalError::BadRequest(e.body_text()))?;
    let plan = resolve(&request.model_name)?;
    let passage_id = request.passage_id.as_id();

    tracing::info!(
        "Retrieval request: passage {}, question {}, model '{}'",
        passage_id,
        request.question_index,
        plan
    );

    let query = state
        .corpus
        .question(&passage_id, request.question_index)
        .await?;
    let result = state.pipeline.run(&query, &plan).await?;

    Ok(Json(result))
}

pub async fn save_evaluation_result(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Acknowledgement>> {
    let Json(body) = body.map_err(|e| EvalError::ValidationFailed {
        errors: vec![ValidationError::new("body", e.body_text())],
    })?;
    let submission: EvaluationSubmission =
        serde_json::from_value(body).map_err(|e| EvalError::ValidationFailed {
            errors: vec![ValidationError::new("body", e.to_string())],
        })?;

    let ack = state.recorder.record(&submission).await?;
    Ok(Json(ack))
}
