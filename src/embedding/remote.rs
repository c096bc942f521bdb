//! HTTP embedding providers (OpenAI and Ollama).
//!
//! Both providers share one retry loop:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Every request is bounded by `embedding.timeout_secs`, so a provider call
//! takes at most `(max_retries + 1) × timeout` plus backoff.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::{EmbedError, EmbeddingProvider};
use crate::config::EmbeddingConfig;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?)
}

async fn post_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    timeout: Duration,
) -> Result<serde_json::Value, EmbedError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(key) = bearer {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| EmbedError::InvalidResponse(e.to_string()));
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = EmbedError::Status {
                    status: status.as_u16(),
                    body: body_text,
                };

                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::debug!(attempt, error = %err, "embedding request will be retried");
                    last_err = Some(err);
                    continue;
                }

                return Err(err);
            }
            Err(e) if e.is_timeout() => {
                last_err = Some(EmbedError::Timeout(timeout));
            }
            Err(e) => {
                last_err = Some(EmbedError::Request(e.to_string()));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| EmbedError::Request("failed after retries".to_string())))
}

fn check_dims(vec: Vec<f32>, expected: usize) -> Result<Vec<f32>, EmbedError> {
    if vec.len() != expected {
        return Err(EmbedError::DimensionMismatch {
            expected,
            actual: vec.len(),
        });
    }
    Ok(vec)
}

fn parse_vector(value: &serde_json::Value) -> Result<Vec<f32>, EmbedError> {
    let array = value
        .as_array()
        .ok_or_else(|| EmbedError::InvalidResponse("embedding is not an array".to_string()))?;
    array
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbedError::InvalidResponse("non-numeric component".to_string()))
        })
        .collect()
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST {url}/v1/embeddings`. The API key is read from
/// `OPENAI_API_KEY`; when it is missing the provider is still created, and
/// every call fails with [`EmbedError::MissingApiKey`].
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
    api_key: Option<String>,
    max_retries: u32,
    timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; OpenAI embeddings will fail");
        }
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: Option<String>) -> Result<Self> {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let dims = match (config.dims, model.as_str()) {
            (Some(d), _) => d,
            (None, "text-embedding-3-small") | (None, "text-embedding-ada-002") => 1536,
            (None, "text-embedding-3-large") => 3072,
            (None, other) => bail!("embedding.dims required for OpenAI model '{}'", other),
        };
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            client: build_client(timeout)?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            model,
            dims,
            api_key,
            max_retries: config.max_retries,
            timeout,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(EmbedError::MissingApiKey("OPENAI_API_KEY"))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let json = post_with_retry(
            &self.client,
            &url,
            Some(key),
            &body,
            self.max_retries,
            self.timeout,
        )
        .await?;

        let embedding = json
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|item| item.get("embedding"))
            .ok_or_else(|| {
                EmbedError::InvalidResponse("missing data[0].embedding".to_string())
            })?;

        check_dims(parse_vector(embedding)?, self.dims)
    }
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). Requires an embedding model to be pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
    max_retries: u32,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            client: build_client(timeout)?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model,
            dims,
            max_retries: config.max_retries,
            timeout,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let url = format!("{}/api/embed", self.base_url.trim_end_matches('/'));
        let json = post_with_retry(
            &self.client,
            &url,
            None,
            &body,
            self.max_retries,
            self.timeout,
        )
        .await?;

        let embedding = json
            .get("embeddings")
            .and_then(|e| e.get(0))
            .ok_or_else(|| EmbedError::InvalidResponse("missing embeddings[0]".to_string()))?;

        check_dims(parse_vector(embedding)?, self.dims)
    }
}
