//! OpenAI-compatible chat-completions client used as the query formatter

use crate::config::FormatterConfig;
use crate::error::{EvalError, Result};
use crate::formatter::{FormattedQueries, QueryFormatter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

const TRANSFORMATION_PROMPT: &str = r#"You rewrite search queries for a passage retrieval system.
Passages are indexed three ways: as declarative propositions, as short title-like
summaries, and as the standalone questions they answer.

Do not answer the user's query. Return exactly one JSON object with these string fields:
- "proposition": a declarative sentence a perfect answer passage would contain
- "summary": a short, title-like phrase describing the user's core need
- "question": a complete, context-free question a perfect answer passage would answer

Keep the language of the user's query.

User query: "#;

/// Query formatter backed by an OpenAI-compatible LLM server (vLLM, Ollama, ...)
pub struct LlmQueryFormatter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmQueryFormatter {
    pub fn new(config: &FormatterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EvalError::Config(format!("Failed to build formatter client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl QueryFormatter for LlmQueryFormatter {
    async fn format(&self, query: &str) -> Result<FormattedQueries> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{}{}", TRANSFORMATION_PROMPT, query),
            }],
            temperature: self.temperature,
            response_format: json!({ "type": "json_object" }),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EvalError::FormatterUnavailable(format!("LLM HTTP error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EvalError::FormatterUnavailable(format!(
                "LLM returned {status}: {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| EvalError::FormatterMalformed(format!("LLM response parse error: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EvalError::FormatterMalformed("LLM returned no content".to_string()))?;

        debug!(model = %self.model, "Formatter raw output: {}", content);
        parse_structured_output(&content)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Parse the JSON object out of a completion, tolerating a Markdown code fence
fn parse_structured_output(content: &str) -> Result<FormattedQueries> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| {
        EvalError::FormatterMalformed(format!("LLM output is not the expected JSON object: {e}"))
    })
}
