//! Configuration management
//!
//! Loads the TOML configuration, applies `RETRIEVAL_EVAL_*` environment
//! overrides and validates the result before anything is started.

use crate::error::{EvalError, Result};
use crate::identifier::Part;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";
const ENV_PREFIX: &str = "RETRIEVAL_EVAL_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
    pub vector_store: VectorStoreConfig,
    pub formatter: FormatterConfig,
    pub evaluation: EvaluationConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

/// Location of the `{passage_id}.json` question corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub data_dir: PathBuf,
}

/// Fan-out and aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Length bound of the aggregated result list
    pub max_results: usize,
    /// Candidates requested from each collection
    pub top_k: usize,
    /// Shared deadline for all per-part searches of one request
    pub search_timeout: String,
    pub collections: CollectionsConfig,
}

impl RetrievalConfig {
    pub fn search_timeout(&self) -> Duration {
        parse_duration(&self.search_timeout).unwrap_or(Duration::from_secs(10))
    }
}

/// Collection name backing each part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    pub proposition: String,
    pub summary: String,
    pub question: String,
}

impl CollectionsConfig {
    pub fn for_part(&self, part: Part) -> &str {
        match part {
            Part::Proposition => &self.proposition,
            Part::Summary => &self.summary,
            Part::Question => &self.question,
        }
    }
}

/// Vector store search service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    pub base_url: String,
    /// Per-call timeout for a single collection search
    pub timeout: String,
}

impl VectorStoreConfig {
    pub fn timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(Duration::from_secs(5))
    }
}

/// LLM query formatter (OpenAI-compatible chat completions endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key; empty for unauthenticated servers
    #[serde(default)]
    pub api_key_env: String,
    pub timeout: String,
    pub temperature: f32,
}

impl FormatterConfig {
    pub fn timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(Duration::from_secs(30))
    }

    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}

/// Human evaluation log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub log_path: PathBuf,
    /// Marker standing in for "no hit at this position"
    pub placeholder: String,
    /// Number of hit/score pairs per submission
    pub slots: usize,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EvalError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| EvalError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| EvalError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load from `path`, or fall back to defaults when the file does not exist
    ///
    /// Environment overrides and validation apply either way.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        tracing::warn!(
            "Config file not found, using defaults. Run 'retrieval-eval config init' to create one."
        );
        Self::default_with_overrides(std::env::vars())
    }

    fn default_with_overrides(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let mut config = Config::default();
        config.apply_overrides(vars);
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// Environment variables in format: RETRIEVAL_EVAL_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "SERVER__BIND_ADDRESS" => self.server.bind_address = value.to_string(),
            "SERVER__PORT" => self.server.port = parse_env(path, value)?,
            "CORPUS__DATA_DIR" => self.corpus.data_dir = PathBuf::from(value),
            "RETRIEVAL__MAX_RESULTS" => self.retrieval.max_results = parse_env(path, value)?,
            "RETRIEVAL__TOP_K" => self.retrieval.top_k = parse_env(path, value)?,
            "VECTOR_STORE__BASE_URL" => self.vector_store.base_url = value.to_string(),
            "FORMATTER__ENABLED" => self.formatter.enabled = parse_env(path, value)?,
            "FORMATTER__BASE_URL" => self.formatter.base_url = value.to_string(),
            "FORMATTER__MODEL" => self.formatter.model = value.to_string(),
            "EVALUATION__LOG_PATH" => self.evaluation.log_path = PathBuf::from(value),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| EvalError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("retrieval-eval").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.retrieval-eval");

        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 9000,
            },
            corpus: CorpusConfig {
                data_dir: data_dir.join("qna_data"),
            },
            retrieval: RetrievalConfig {
                max_results: 3,
                top_k: 10,
                search_timeout: "10s".to_string(),
                collections: CollectionsConfig {
                    proposition: "PropositionsDB".to_string(),
                    summary: "SummariesDB".to_string(),
                    question: "QuestionsDB".to_string(),
                },
            },
            vector_store: VectorStoreConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout: "5s".to_string(),
            },
            formatter: FormatterConfig {
                enabled: true,
                base_url: "http://localhost:5000/v1".to_string(),
                model: "Qwen/Qwen3-8B".to_string(),
                api_key_env: String::new(),
                timeout: "30s".to_string(),
                temperature: 0.0,
            },
            evaluation: EvaluationConfig {
                log_path: data_dir.join("eval_results.csv"),
                placeholder: "N/A".to_string(),
                slots: 3,
            },
        }
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| EvalError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Parse a duration string (e.g., "250ms", "5s", "2m")
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();

    // Check "ms" before "s" because "ms" ends with "s"
    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        value.parse().ok().map(Duration::from_secs)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            expand_tilde(Path::new("~/.retrieval-eval")),
            home.join(".retrieval-eval")
        );
        assert_eq!(expand_tilde(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_collection_per_part() {
        let config = Config::default();
        assert_eq!(
            config.retrieval.collections.for_part(Part::Question),
            "QuestionsDB"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.retrieval.max_results = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.max_results, 5);
        assert_eq!(loaded.evaluation.placeholder, "N/A");
    }

    #[test]
    fn test_defaults_with_overrides_are_validated() {
        let vars = |value: &str| {
            vec![(
                format!("{}RETRIEVAL__MAX_RESULTS", ENV_PREFIX),
                value.to_string(),
            )]
        };

        let config = Config::default_with_overrides(vars("5")).unwrap();
        assert_eq!(config.retrieval.max_results, 5);

        let err = Config::default_with_overrides(vars("0")).unwrap_err();
        assert!(matches!(err, EvalError::ConfigValidation { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/retrieval-eval.toml")).unwrap_err();
        assert!(matches!(err, EvalError::ConfigNotFound { .. }));
    }
}
