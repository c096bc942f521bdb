//! Optional answer summarization through a chat-capable language model.
//!
//! Retrieval hands the top hits and the question to a [`Summarizer`]; on any
//! [`SummarizeError`] it falls back to returning the raw chunk texts.
//! Disabled unless `[summarization] provider` is `openai` or `ollama`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::SummarizationConfig;
use crate::models::SearchHit;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const INSTRUCTION: &str = "Answer the question using only the document excerpts below. \
If the excerpts do not contain the answer, say so. Be concise.";

#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Provider not configured (missing key) or unreachable.
    #[error("summarization provider unavailable: {0}")]
    Unavailable(String),
    #[error("summarization provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed summarization response: {0}")]
    InvalidResponse(String),
    #[error("summarization timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub model: String,
    /// Instruction, question and context in one message.
    pub prompt: String,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Model name to put in [`SummaryRequest::model`].
    fn model(&self) -> &str;

    async fn summarize(&self, request: SummaryRequest) -> Result<String, SummarizeError>;
}

/// Assemble the single prompt message: instruction, question, then the
/// excerpts numbered in rank order.
pub fn build_prompt(question: &str, hits: &[SearchHit]) -> String {
    let mut prompt = format!("{}\n\nQuestion: {}\n\nExcerpts:\n", INSTRUCTION, question.trim());
    for (i, hit) in hits.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] ({}, chunk {})\n{}\n",
            i + 1,
            hit.metadata.filename,
            hit.metadata.chunk,
            hit.document
        ));
    }
    prompt
}

/// Build the configured summarizer, or `None` when disabled.
pub fn create_summarizer(
    config: &SummarizationConfig,
) -> anyhow::Result<Option<Arc<dyn Summarizer>>> {
    if !config.is_enabled() {
        return Ok(None);
    }
    match config.provider.as_str() {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
            if api_key.is_none() {
                tracing::warn!("OPENAI_API_KEY is not set; answers will not be summarized");
            }
            Ok(Some(Arc::new(OpenAIChatSummarizer::new(config, api_key)?)))
        }
        "ollama" => Ok(Some(Arc::new(OllamaSummarizer::new(config)?))),
        other => anyhow::bail!("Unknown summarization provider: {}", other),
    }
}

fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    Ok(Client::builder()
        .user_agent(concat!("doc-harness/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

async fn post_json(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    payload: &serde_json::Value,
    timeout: Duration,
) -> Result<serde_json::Value, SummarizeError> {
    tokio::time::timeout(timeout, send_json(client, url, bearer, payload, timeout))
        .await
        .map_err(|_| SummarizeError::Timeout(timeout))?
}

async fn send_json(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    payload: &serde_json::Value,
    timeout: Duration,
) -> Result<serde_json::Value, SummarizeError> {
    let mut request = client.post(url).json(payload);
    if let Some(key) = bearer {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            SummarizeError::Timeout(timeout)
        } else {
            SummarizeError::Unavailable(format!("failed to reach {}: {}", url, e))
        }
    })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SummarizeError::Unavailable(format!("{} returned 404", url)));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SummarizeError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| SummarizeError::InvalidResponse(e.to_string()))
}

fn non_empty(text: Option<&str>) -> Result<String, SummarizeError> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        Some(_) => Err(SummarizeError::InvalidResponse("empty completion".into())),
        None => Err(SummarizeError::InvalidResponse("missing completion text".into())),
    }
}

/// `POST /v1/chat/completions` with a single user message.
pub struct OpenAIChatSummarizer {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAIChatSummarizer {
    pub fn new(config: &SummarizationConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            http: build_client(timeout)?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl Summarizer for OpenAIChatSummarizer {
    fn model(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, request: SummaryRequest) -> Result<String, SummarizeError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SummarizeError::Unavailable("OPENAI_API_KEY not set".into()))?;

        let payload = json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = post_json(&self.http, &url, Some(key), &payload, self.timeout).await?;

        non_empty(
            body.get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_str()),
        )
    }
}

/// `POST /api/generate` on a local Ollama runtime, non-streaming.
pub struct OllamaSummarizer {
    http: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaSummarizer {
    pub fn new(config: &SummarizationConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("summarization.model required for Ollama provider"))?;
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            http: build_client(timeout)?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model,
            timeout,
        })
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    fn model(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, request: SummaryRequest) -> Result<String, SummarizeError> {
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": { "temperature": 0.1 },
        });
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = post_json(&self.http, &url, None, &payload, self.timeout).await?;

        if body.get("done").and_then(|d| d.as_bool()) == Some(false) {
            return Err(SummarizeError::InvalidResponse(
                "incomplete response (streaming not supported)".into(),
            ));
        }
        non_empty(body.get("response").and_then(|r| r.as_str()))
    }
}
