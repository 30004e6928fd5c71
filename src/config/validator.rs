use crate::config::{parse_duration, Config, SCHEMA_VERSION};
use crate::error::{EvalError, Result, ValidationError};
use std::collections::HashSet;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_server(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_vector_store(config, &mut errors);
        Self::validate_formatter(config, &mut errors);
        Self::validate_evaluation(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EvalError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_server(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.server.bind_address.trim().is_empty() {
            errors.push(ValidationError::new(
                "server.bind_address",
                "Bind address cannot be empty",
            ));
        }

        if config.server.port == 0 {
            errors.push(ValidationError::new(
                "server.port",
                "Port must be greater than 0",
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked at startup, where a missing directory is only logged
        if config.corpus.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.data_dir",
                "Data directory path cannot be empty",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.max_results == 0 {
            errors.push(ValidationError::new(
                "retrieval.max_results",
                "Max results must be greater than 0",
            ));
        }

        if retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "Top-k must be greater than 0",
            ));
        }

        Self::check_duration("retrieval.search_timeout", &retrieval.search_timeout, errors);

        let collections = &retrieval.collections;
        let names = [
            ("retrieval.collections.proposition", &collections.proposition),
            ("retrieval.collections.summary", &collections.summary),
            ("retrieval.collections.question", &collections.question),
        ];
        let mut seen = HashSet::new();
        for (path, name) in names {
            if name.trim().is_empty() {
                errors.push(ValidationError::new(path, "Collection name cannot be empty"));
            } else if !seen.insert(name.as_str()) {
                errors.push(ValidationError::new(
                    path,
                    format!("Collection '{}' is already assigned to another part", name),
                ));
            }
        }
    }

    fn validate_vector_store(config: &Config, errors: &mut Vec<ValidationError>) {
        Self::check_url("vector_store.base_url", &config.vector_store.base_url, errors);
        Self::check_duration("vector_store.timeout", &config.vector_store.timeout, errors);
    }

    fn validate_formatter(config: &Config, errors: &mut Vec<ValidationError>) {
        let formatter = &config.formatter;

        // A disabled formatter only turns `formatted` identifiers into 503s
        if !formatter.enabled {
            return;
        }

        Self::check_url("formatter.base_url", &formatter.base_url, errors);
        Self::check_duration("formatter.timeout", &formatter.timeout, errors);

        if formatter.model.trim().is_empty() {
            errors.push(ValidationError::new(
                "formatter.model",
                "Model name cannot be empty",
            ));
        }

        if !formatter.api_key_env.is_empty() && formatter.api_key().is_none() {
            errors.push(ValidationError::new(
                "formatter.api_key_env",
                format!(
                    "Environment variable {} is not set or empty",
                    formatter.api_key_env
                ),
            ));
        }

        let temp = formatter.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "formatter.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }
    }

    fn validate_evaluation(config: &Config, errors: &mut Vec<ValidationError>) {
        let evaluation = &config.evaluation;

        if evaluation.log_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "evaluation.log_path",
                "Evaluation log path cannot be empty",
            ));
        }

        let placeholder = evaluation.placeholder.trim();
        if placeholder.is_empty() {
            errors.push(ValidationError::new(
                "evaluation.placeholder",
                "Placeholder marker cannot be empty",
            ));
        } else if placeholder.parse::<u64>().is_ok() {
            errors.push(ValidationError::new(
                "evaluation.placeholder",
                format!("Placeholder '{}' is indistinguishable from a passage id", placeholder),
            ));
        }

        if evaluation.slots == 0 {
            errors.push(ValidationError::new(
                "evaluation.slots",
                "Slot count must be greater than 0",
            ));
        }
    }

    fn check_duration(path: &str, value: &str, errors: &mut Vec<ValidationError>) {
        match parse_duration(value) {
            Some(d) if !d.is_zero() => {}
            _ => errors.push(ValidationError::new(
                path,
                format!("Invalid duration format: {}", value),
            )),
        }
    }

    fn check_url(path: &str, value: &str, errors: &mut Vec<ValidationError>) {
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            errors.push(ValidationError::new(
                path,
                format!("URL must start with http:// or https://, got '{}'", value),
            ));
        }
    }
}
