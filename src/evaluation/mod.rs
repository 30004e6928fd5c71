//! Human evaluation recording
//!
//! A submission carries one relevance judgment per displayed position. Score 0
//! is reserved for the placeholder (no hit shown at that position); a real hit
//! is judged 1, 2 or 3. Submissions are validated in full before the log is
//! touched, and accepted records are appended as one row each.

mod log;
mod validator;

pub use log::EvaluationLog;
pub use validator::SubmissionValidator;

use crate::config::EvaluationConfig;
use crate::error::Result;
use crate::identifier::ModelIdentifier;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Scoring payload as received from the evaluation UI
///
/// Every field is optional here so that absent fields are reported through
/// validation rather than a deserialization error. Hits may be given as a
/// `hits` list or as flat `p1_val`/`p1_score`, `p2_val`/`p2_score`, ... fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationSubmission {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub passage_id: Option<Value>,
    #[serde(default)]
    pub query_index: Option<Value>,
    #[serde(default)]
    pub hits: Option<Vec<SubmittedHit>>,
    #[serde(flatten)]
    pub positional: BTreeMap<String, Value>,
}

/// One position of a submission before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmittedHit {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub score: Option<Value>,
}

/// What was shown at a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HitValue {
    Placeholder,
    Passage(u64),
}

/// A validated (hit, score) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JudgedHit {
    pub value: HitValue,
    pub score: u8,
}

/// A validated submission, ready to be appended
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    pub record_id: Uuid,
    pub recorded_at: DateTime<Local>,
    pub model_name: ModelIdentifier,
    pub passage_id: String,
    pub query_index: u32,
    pub hits: Vec<JudgedHit>,
}

/// Response body for an accepted submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub status: String,
    pub record_id: Uuid,
    pub message: String,
}

/// Validates submissions and appends them to the evaluation log
pub struct EvaluationRecorder {
    validator: SubmissionValidator,
    log: EvaluationLog,
}

impl EvaluationRecorder {
    pub fn new(config: &EvaluationConfig, log_path: std::path::PathBuf) -> Self {
        Self {
            validator: SubmissionValidator::new(config.placeholder.clone(), config.slots),
            log: EvaluationLog::new(log_path, config.placeholder.clone(), config.slots),
        }
    }

    pub fn log(&self) -> &EvaluationLog {
        &self.log
    }

    pub async fn record(&self, submission: &EvaluationSubmission) -> Result<Acknowledgement> {
        let record = self.validator.validate(submission)?;
        self.log.append(&record).await?;

        tracing::info!(
            "Recorded evaluation {} for '{}' (passage {}, query {})",
            record.record_id,
            record.model_name,
            record.passage_id,
            record.query_index
        );

        Ok(Acknowledgement {
            status: "success".to_string(),
            record_id: record.record_id,
            message: "Evaluation result saved.".to_string(),
        })
    }
}
