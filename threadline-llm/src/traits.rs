use crate::dispatcher::{Completion, DispatchError};
use async_trait::async_trait;
use serde::Serialize;
use threadline_common::Message;

/// Whether the caller expects free text or an embedded JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Text,
    Json,
}

/// One chat-completions request, built per attempt tier and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

/// Why a single request against one credential failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// HTTP 429, or an error body that reports a rate-limit/quota condition.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Network failure, 5xx, or an unusable success body.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Any other rejection; carries the endpoint's own message when it gave one.
    #[error("API error ({}): {message}", status_label(.status))]
    Api {
        status: Option<u16>,
        message: String,
    },
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no status".to_string(), |s| s.to_string())
}

impl AttemptError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AttemptError::RateLimited(_))
    }
}

/// Wire-level seam: issue one request with one credential.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, AttemptError>;
}

/// Caller-level seam: run a conversation through whatever failover the
/// implementation provides.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        mode: ResponseMode,
    ) -> Result<Completion, DispatchError>;
}
