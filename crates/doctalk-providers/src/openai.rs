//! Unified OpenAI-compatible provider.
//!
//! A single struct that serves both collaborator roles the pipeline needs:
//! embeddings (`POST /embeddings`) and answer generation
//! (`POST /chat/completions`). Different vendors are distinguished only by
//! endpoint URL and API key.

use async_trait::async_trait;
use serde_json::{Value, json};

use doctalk_core::config::DocTalkConfig;
use doctalk_core::error::{DocTalkError, Result};
use doctalk_core::traits::{AnswerGenerator, Embedder};

/// A provider that works with any OpenAI-compatible API.
pub struct OpenAiProvider {
    /// API key for authentication.
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    /// Embedding model (e.g., "text-embedding-3-small").
    embedding_model: String,
    /// Chat model (e.g., "gpt-4o-mini").
    chat_model: String,
    /// Sampling temperature for answer generation.
    temperature: f32,
    /// Max tokens for answer generation.
    max_tokens: u32,
    /// HTTP client.
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create from configuration.
    ///
    /// API key resolution: `config.api_key` > `OPENAI_API_KEY` env var.
    pub fn from_config(config: &DocTalkConfig) -> Result<Self> {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        };

        if api_key.is_empty() {
            return Err(DocTalkError::Config(
                "no API key: set api_key in ~/.doctalk/config.toml or OPENAI_API_KEY".into(),
            ));
        }

        Ok(Self {
            api_key,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            embedding_model: config.embedding.model.clone(),
            chat_model: config.chat.model.clone(),
            temperature: config.chat.temperature,
            max_tokens: config.chat.max_tokens,
            client: reqwest::Client::new(),
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| DocTalkError::Http(format!("connection failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DocTalkError::Provider(format!(
                "API error {status}: {text}"
            )));
        }

        resp.json().await.map_err(|e| DocTalkError::Http(e.to_string()))
    }
}

#[async_trait]
impl Embedder for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let json = self.post_json("/embeddings", &body).await?;
        let values = parse_embedding(&json)?;

        tracing::trace!(model = %self.embedding_model, dims = values.len(), "embedded text");
        Ok(values)
    }
}

/// Pull the embedding vector out of an `/embeddings` response body.
///
/// Every element must be a number: skipping a bad element would shorten the
/// vector and only blow up much later as a dimension mismatch.
fn parse_embedding(json: &Value) -> Result<Vec<f32>> {
    let arr = json["data"]
        .get(0)
        .and_then(|d| d["embedding"].as_array())
        .ok_or_else(|| DocTalkError::Provider("no embedding in response".into()))?;

    let mut values = Vec::with_capacity(arr.len());
    for v in arr {
        let v = v
            .as_f64()
            .ok_or_else(|| DocTalkError::Provider("malformed embedding in response".into()))?;
        values.push(v as f32);
    }

    if values.is_empty() {
        return Err(DocTalkError::Provider("empty embedding in response".into()));
    }
    Ok(values)
}

#[async_trait]
impl AnswerGenerator for OpenAiProvider {
    async fn generate(&self, system_prompt: &str, question: &str) -> Result<String> {
        let body = json!({
            "model": self.chat_model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": question },
            ],
        });

        let json = self
            .post_json("/chat/completions", &body)
            .await
            .map_err(|e| match e {
                // Transport/API failures on this path are generation failures.
                DocTalkError::Http(m) | DocTalkError::Provider(m) => DocTalkError::Generation(m),
                other => other,
            })?;

        let answer = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| DocTalkError::Generation("no choices in response".into()))?;

        Ok(answer.to_string())
    }
}
