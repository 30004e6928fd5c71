use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the retrieval evaluation service
#[derive(Error, Debug)]
pub enum EvalError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Model identifier does not follow the `<strategy>_<part>[_<part>...]` grammar
    #[error("Invalid model identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// Query formatter did not produce a result in time or could not be reached
    #[error("Query formatter unavailable: {0}")]
    FormatterUnavailable(String),

    /// Query formatter answered, but without a category the plan needs
    #[error("Query formatter returned malformed output: {0}")]
    FormatterMalformed(String),

    /// Every collection search failed
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// A required collaborator was not initialized at startup
    #[error("Service not ready: {0}")]
    NotReady(String),

    /// Evaluation submission rejected before any write
    #[error("Evaluation submission rejected: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    /// Durable evaluation log write failed
    #[error("Failed to append evaluation record to {path}: {source}")]
    AppendFault {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Request body or parameters do not have the expected shape
    #[error("Malformed request: {0}")]
    BadRequest(String),

    /// Source passage not present in the corpus
    #[error("Passage ID '{id}' not found")]
    PassageNotFound { id: String },

    /// 1-based question index outside of the passage's question list
    #[error("Invalid question_index {index}: passage '{id}' has only {available} questions")]
    QuestionOutOfRange {
        id: String,
        index: i64,
        available: usize,
    },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EvalError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Config(_)
            | EvalError::ConfigValidation { .. }
            | EvalError::ConfigNotFound { .. }
            | EvalError::InvalidConfigValue { .. }
            | EvalError::Toml(_)
            | EvalError::TomlSerialization(_) => "config",
            EvalError::InvalidIdentifier { .. } => "invalid_identifier",
            EvalError::FormatterUnavailable(_) => "formatter_unavailable",
            EvalError::FormatterMalformed(_) => "formatter_malformed",
            EvalError::RetrievalUnavailable(_) => "retrieval_unavailable",
            EvalError::NotReady(_) => "not_ready",
            EvalError::ValidationFailed { .. } => "validation_failed",
            EvalError::AppendFault { .. } => "append_fault",
            EvalError::BadRequest(_) => "bad_request",
            EvalError::PassageNotFound { .. } => "passage_not_found",
            EvalError::QuestionOutOfRange { .. } => "question_out_of_range",
            EvalError::Io { .. } => "io",
            EvalError::Json { .. } => "json",
            EvalError::Other(_) => "internal",
        }
    }

    pub(crate) fn invalid_identifier(identifier: &str, reason: impl Into<String>) -> Self {
        EvalError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }
}

/// A single field-level validation failure
///
/// Shared by the configuration validator and the evaluation submission validator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationError {
    /// Path to the key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, EvalError>;
