//! The LLM client collaborator: a pluggable text/structured-content
//! generator. The core treats it as an opaque completion function; all
//! parsing/repair lives in the decoder.

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),
    #[error("model request timed out")]
    Timeout,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub schema: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError>;
}

/// A deterministic fake used by tests and the demo CLI. Returns whatever
/// text it was constructed with, ignoring the prompt.
pub struct FixedModelClient {
    pub response: String,
}

#[async_trait]
impl ModelClient for FixedModelClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        Ok(CompletionResponse { text: self.response.clone() })
    }
}
