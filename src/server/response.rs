//! Mapping of service errors onto HTTP responses

use crate::error::{EvalError, ValidationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    detail: String,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [ValidationError]>,
}

impl EvalError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EvalError::InvalidIdentifier { .. }
            | EvalError::QuestionOutOfRange { .. }
            | EvalError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EvalError::PassageNotFound { .. } => StatusCode::NOT_FOUND,
            EvalError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EvalError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EvalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{} ({}): {}", status, self.kind(), self);
        } else {
            tracing::warn!("{} ({}): {}", status, self.kind(), self);
        }

        let errors = match &self {
            EvalError::ValidationFailed { errors } => Some(errors.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            detail: self.to_string(),
            kind: self.kind(),
            errors,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_codes() {
        let cases = [
            (EvalError::invalid_identifier("x", "bad"), StatusCode::BAD_REQUEST),
            (
                EvalError::BadRequest("missing field".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                EvalError::QuestionOutOfRange {
                    id: "1".to_string(),
                    index: 9,
                    available: 2,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                EvalError::PassageNotFound { id: "1".to_string() },
                StatusCode::NOT_FOUND,
            ),
            (
                EvalError::ValidationFailed { errors: vec![] },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                EvalError::NotReady("store".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                EvalError::FormatterMalformed("no summary".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                EvalError::RetrievalUnavailable("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                EvalError::AppendFault {
                    path: PathBuf::from("/x.csv"),
                    source: std::io::Error::other("disk full"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{}", error.kind());
        }
    }
}
