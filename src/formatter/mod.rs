//! Query formatter collaborator
//!
//! Rewrites a raw user query into task-specific search text, one candidate per
//! part. The retrieval path only sees the [`QueryFormatter`] trait; the
//! LLM-backed implementation lives in [`llm`].

mod llm;

pub use llm::LlmQueryFormatter;

use crate::error::Result;
use crate::identifier::Part;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Candidate search texts returned by a formatter, one slot per part
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedQueries {
    #[serde(default)]
    pub proposition: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

impl FormattedQueries {
    /// Text for a part, treating blank output as absent
    pub fn get(&self, part: Part) -> Option<&str> {
        let slot = match part {
            Part::Proposition => &self.proposition,
            Part::Summary => &self.summary,
            Part::Question => &self.question,
        };
        slot.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }
}

/// Trait for query formatters
///
/// Called at most once per retrieval request. Implementations must not retry
/// internally; retry policy belongs to the caller.
#[async_trait]
pub trait QueryFormatter: Send + Sync {
    /// Produce proposition/summary/question rewrites of `query`
    async fn format(&self, query: &str) -> Result<FormattedQueries>;

    /// Name used in logs
    fn name(&self) -> &str;
}
