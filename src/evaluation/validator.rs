use crate::error::{EvalError, Result, ValidationError};
use crate::evaluation::{
    EvaluationRecord, EvaluationSubmission, HitValue, JudgedHit, SubmittedHit,
};
use crate::identifier::{resolve, ModelIdentifier};
use serde_json::Value;
use std::collections::BTreeSet;

const MAX_SCORE: i64 = 3;

/// Submission validator
pub struct SubmissionValidator {
    placeholder: String,
    slots: usize,
}

impl SubmissionValidator {
    pub fn new(placeholder: String, slots: usize) -> Self {
        Self { placeholder, slots }
    }

    /// Validate a submission, reporting every violation at once
    pub fn validate(&self, submission: &EvaluationSubmission) -> Result<EvaluationRecord> {
        let mut errors = Vec::new();

        let model_name = Self::validate_model_name(submission, &mut errors);
        let passage_id = Self::validate_passage_id(submission, &mut errors);
        let query_index = Self::validate_query_index(submission, &mut errors);
        let hits = self.validate_hits(submission, &mut errors);

        match (model_name, passage_id, query_index) {
            (Some(model_name), Some(passage_id), Some(query_index)) if errors.is_empty() => {
                Ok(EvaluationRecord {
                    record_id: uuid::Uuid::new_v4(),
                    recorded_at: chrono::Local::now(),
                    model_name,
                    passage_id,
                    query_index,
                    hits,
                })
            }
            _ => Err(EvalError::ValidationFailed { errors }),
        }
    }

    fn validate_model_name(
        submission: &EvaluationSubmission,
        errors: &mut Vec<ValidationError>,
    ) -> Option<ModelIdentifier> {
        match submission.model_name.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(ValidationError::new("model_name", "Field is required"));
                None
            }
            Some(name) => match resolve(name) {
                Ok(id) => Some(id),
                Err(e) => {
                    errors.push(ValidationError::new("model_name", e.to_string()));
                    None
                }
            },
        }
    }

    fn validate_passage_id(
        submission: &EvaluationSubmission,
        errors: &mut Vec<ValidationError>,
    ) -> Option<String> {
        match &submission.passage_id {
            None | Some(Value::Null) => {
                errors.push(ValidationError::new("passage_id", "Field is required"));
                None
            }
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::String(_)) => {
                errors.push(ValidationError::new("passage_id", "Field is required"));
                None
            }
            Some(Value::Number(n)) if n.is_u64() => Some(n.to_string()),
            Some(other) => {
                errors.push(ValidationError::new(
                    "passage_id",
                    format!("Expected a passage id, got {}", other),
                ));
                None
            }
        }
    }

    fn validate_query_index(
        submission: &EvaluationSubmission,
        errors: &mut Vec<ValidationError>,
    ) -> Option<u32> {
        match &submission.query_index {
            None | Some(Value::Null) => {
                errors.push(ValidationError::new("query_index", "Field is required"));
                None
            }
            Some(value) => match value.as_i64().and_then(|i| u32::try_from(i).ok()) {
                Some(index) if index > 0 => Some(index),
                _ => {
                    errors.push(ValidationError::new(
                        "query_index",
                        format!("Must be a positive integer, got {}", value),
                    ));
                    None
                }
            },
        }
    }

    fn validate_hits(
        &self,
        submission: &EvaluationSubmission,
        errors: &mut Vec<ValidationError>,
    ) -> Vec<JudgedHit> {
        let positions: BTreeSet<usize> = submission
            .positional
            .keys()
            .filter_map(|key| positional_index(key))
            .collect();

        let submitted = match (&submission.hits, positions.is_empty()) {
            (None, true) => {
                errors.push(ValidationError::new("hits", "Field is required"));
                return Vec::new();
            }
            (Some(_), false) => {
                errors.push(ValidationError::new(
                    "hits",
                    "Give either a `hits` list or pN_val/pN_score fields, not both",
                ));
                return Vec::new();
            }
            (Some(hits), true) => {
                if hits.len() != self.slots {
                    errors.push(ValidationError::new(
                        "hits",
                        format!(
                            "Expected exactly {} hit/score pairs, got {}",
                            self.slots,
                            hits.len()
                        ),
                    ));
                }
                hits.clone()
            }
            (None, false) => self.positional_hits(submission, &positions, errors),
        };

        submitted
            .iter()
            .enumerate()
            .filter_map(|(i, hit)| self.validate_hit(i, hit, errors))
            .collect()
    }

    /// Hits from `p1_val`/`p1_score` up to the configured slot count
    fn positional_hits(
        &self,
        submission: &EvaluationSubmission,
        positions: &BTreeSet<usize>,
        errors: &mut Vec<ValidationError>,
    ) -> Vec<SubmittedHit> {
        let outside: Vec<String> = positions
            .iter()
            .filter(|n| **n == 0 || **n > self.slots)
            .map(|&n| {
                if n == usize::MAX {
                    "overflowing".to_string()
                } else {
                    n.to_string()
                }
            })
            .collect();
        if !outside.is_empty() {
            errors.push(ValidationError::new(
                "hits",
                format!(
                    "Expected exactly {} hit/score pairs (p1..p{}), got positions {}",
                    self.slots,
                    self.slots,
                    outside.join(", ")
                ),
            ));
        }

        let positional = &submission.positional;
        (1..=self.slots)
            .map(|n| SubmittedHit {
                value: positional.get(&format!("p{}_val", n)).cloned(),
                score: positional.get(&format!("p{}_score", n)).cloned(),
            })
            .collect()
    }

    fn validate_hit(
        &self,
        index: usize,
        hit: &SubmittedHit,
        errors: &mut Vec<ValidationError>,
    ) -> Option<JudgedHit> {
        let position = index + 1;
        let value_path = format!("p{}_val", position);
        let score_path = format!("p{}_score", position);

        let value = match &hit.value {
            None | Some(Value::Null) => {
                errors.push(ValidationError::new(&value_path, "Field is required"));
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                errors.push(ValidationError::new(&value_path, "Field is required"));
                None
            }
            Some(Value::String(s)) if s.trim() == self.placeholder => Some(HitValue::Placeholder),
            Some(Value::String(s)) => match s.trim().parse::<u64>() {
                Ok(id) => Some(HitValue::Passage(id)),
                Err(_) => {
                    errors.push(ValidationError::new(
                        &value_path,
                        format!(
                            "Expected a passage id or '{}', got '{}'",
                            self.placeholder, s
                        ),
                    ));
                    None
                }
            },
            Some(Value::Number(n)) if n.is_u64() => n.as_u64().map(HitValue::Passage),
            Some(other) => {
                errors.push(ValidationError::new(
                    &value_path,
                    format!("Expected a passage id or '{}', got {}", self.placeholder, other),
                ));
                None
            }
        };

        let score = match &hit.score {
            None | Some(Value::Null) => {
                errors.push(ValidationError::new(&score_path, "Field is required"));
                None
            }
            Some(raw) => match raw.as_i64() {
                Some(s) if (0..=MAX_SCORE).contains(&s) => Some(s as u8),
                _ => {
                    errors.push(ValidationError::new(
                        &score_path,
                        format!("Score must be one of 0, 1, 2, 3, got {}", raw),
                    ));
                    None
                }
            },
        };

        let (value, score) = (value?, score?);
        match (value, score) {
            (HitValue::Placeholder, 0) => {}
            (HitValue::Placeholder, s) => {
                errors.push(ValidationError::new(
                    &score_path,
                    format!("Placeholder '{}' must be scored 0, got {}", self.placeholder, s),
                ));
                return None;
            }
            (HitValue::Passage(id), 0) => {
                errors.push(ValidationError::new(
                    &score_path,
                    format!("Score 0 is reserved for the placeholder, but passage {} was shown", id),
                ));
                return None;
            }
            (HitValue::Passage(_), _) => {}
        }

        Some(JudgedHit { value, score })
    }
}

/// Position of a `pN_val` / `pN_score` key; indexes too large for `usize` map to `usize::MAX`
fn positional_index(key: &str) -> Option<usize> {
    let rest = key.strip_prefix('p')?;
    let digits = rest
        .strip_suffix("_val")
        .or_else(|| rest.strip_suffix("_score"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(usize::MAX))
}
