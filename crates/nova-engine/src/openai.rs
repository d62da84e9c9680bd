//! OpenAI-compatible HTTP client serving both provider contracts.
//!
//! Completions go to OpenRouter when an OpenRouter key is configured and to
//! OpenAI otherwise. Embeddings always use the OpenAI key.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::provider::{CompletionProvider, CompletionRequest, EmbeddingProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    OpenAi,
    OpenRouter,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiClient {
    client: Client,
    endpoint: Endpoint,
    base_url: String,
    api_key: String,
    embedding_model: String,
    fallback_model: String,
    referer: Option<String>,
}

impl OpenAiClient {
    fn build(config: &EngineConfig, endpoint: Endpoint, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build HTTP client: {e}")))?;
        let base_url = match endpoint {
            Endpoint::OpenAi => &config.openai_base_url,
            Endpoint::OpenRouter => &config.openrouter_base_url,
        };
        Ok(Self {
            client,
            endpoint,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            embedding_model: config.embedding_model.clone(),
            fallback_model: config.completion_model.clone(),
            referer: config.openrouter_referer.clone(),
        })
    }

    /// Completion client for the configured keys, or `None` without any key.
    pub fn completion_client(config: &EngineConfig) -> Result<Option<Self>> {
        let (endpoint, key) = match (&config.openrouter_api_key, &config.openai_api_key) {
            (Some(key), _) => (Endpoint::OpenRouter, key.clone()),
            (None, Some(key)) => (Endpoint::OpenAi, key.clone()),
            (None, None) => return Ok(None),
        };
        Self::build(config, endpoint, key).map(Some)
    }

    /// Embedding client, or `None` without an OpenAI key.
    pub fn embedding_client(config: &EngineConfig) -> Result<Option<Self>> {
        match &config.openai_api_key {
            Some(key) => Self::build(config, Endpoint::OpenAi, key.clone()).map(Some),
            None => Ok(None),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// OpenAI serves only its own models; vendor-prefixed ids fall back.
    pub fn resolve_model<'a>(&'a self, requested: &'a str) -> &'a str {
        match self.endpoint {
            Endpoint::OpenRouter => requested,
            Endpoint::OpenAi if requested.contains('/') => &self.fallback_model,
            Endpoint::OpenAi => requested,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key);
        if self.endpoint == Endpoint::OpenRouter
            && let Some(referer) = &self.referer
        {
            req = req.header("HTTP-Referer", referer);
        }
        req
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        req: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::ProviderUnavailable(format!(
                "API error ({status}): {body}"
            )));
        }
        Ok(response.json().await?)
    }
}

fn user_content(request: &CompletionRequest) -> Value {
    match &request.multimodal {
        Some(payload) if !payload.is_empty() => {
            let mut parts = vec![json!({ "type": "text", "text": request.user_input })];
            parts.extend(
                payload
                    .images
                    .iter()
                    .map(|url| json!({ "type": "image_url", "image_url": { "url": url } })),
            );
            Value::Array(parts)
        }
        _ => Value::String(request.user_input.clone()),
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let model = self.resolve_model(&request.model);
        let body = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Value::String(request.system_prompt.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: user_content(&request),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        tracing::debug!(model, endpoint = ?self.endpoint, "requesting completion");

        let completion: ChatCompletionResponse =
            Self::send_json(self.post("chat/completions").json(&body)).await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngineError::ProviderUnavailable("empty completion".to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse =
            Self::send_json(self.post("embeddings").json(&body)).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EngineError::ProviderUnavailable("empty embedding".to_string()))
    }
}
