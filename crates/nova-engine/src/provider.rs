//! Provider contracts for embeddings and completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Images attached to a turn, as URLs or `data:` URIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultimodalPayload {
    pub images: Vec<String>,
}

impl MultimodalPayload {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_input: String,
    pub multimodal: Option<MultimodalPayload>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
