use crate::traits::{AttemptError, CompletionRequest, CompletionTransport};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use threadline_common::{Result, ThreadlineError};
use threadline_http::{Auth, HttpClient, HttpError, RequestOpts};

/// Chat-completions transport for OpenAI-compatible endpoints (Groq, OpenAI,
/// local gateways). Issues exactly one HTTP request per call; failover is the
/// dispatcher's job.
pub struct OpenAiCompatTransport {
    client: HttpClient,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl OpenAiCompatTransport {
    /// `endpoint` is the full chat-completions URL.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = HttpClient::new(endpoint)
            .map_err(|e| ThreadlineError::Config(format!("completion endpoint: {e}")))?
            .with_timeout(timeout)
            .with_retries(0);
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl CompletionTransport for OpenAiCompatTransport {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> std::result::Result<String, AttemptError> {
        let opts = RequestOpts {
            timeout: Some(self.timeout),
            retries: Some(0),
            auth: Some(Auth::Bearer(api_key)),
            ..Default::default()
        };

        let resp: ChatCompletionResponse = self
            .client
            .post_json_opts("", request, opts)
            .await
            .map_err(classify_http_error)?;

        if let Some(err) = resp.error {
            return Err(classify_error_body(err));
        }

        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AttemptError::Transient(
                "endpoint returned no completion text".into(),
            ));
        }
        Ok(text)
    }
}

fn looks_rate_limited(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    ["rate limit", "rate_limit", "ratelimit", "too many requests", "quota"]
        .iter()
        .any(|marker| m.contains(marker))
}

fn classify_http_error(e: HttpError) -> AttemptError {
    match e {
        HttpError::Api {
            status, message, ..
        } => {
            if status.as_u16() == 429 || looks_rate_limited(&message) {
                AttemptError::RateLimited(message)
            } else if status.is_server_error() {
                AttemptError::Transient(format!("{status}: {message}"))
            } else {
                AttemptError::Api {
                    status: Some(status.as_u16()),
                    message,
                }
            }
        }
        HttpError::Network(msg) => AttemptError::Transient(msg),
        HttpError::Decode(msg, _) => AttemptError::Transient(format!("undecodable body: {msg}")),
        other @ (HttpError::Url(_) | HttpError::Build(_)) => AttemptError::Api {
            status: None,
            message: other.to_string(),
        },
    }
}

fn classify_error_body(err: ErrorBody) -> AttemptError {
    let code = err
        .code
        .as_ref()
        .map(|c| c.to_string())
        .unwrap_or_default();
    let kind = err.kind.unwrap_or_default();
    if looks_rate_limited(&err.message) || looks_rate_limited(&kind) || looks_rate_limited(&code) {
        AttemptError::RateLimited(err.message)
    } else {
        AttemptError::Api {
            status: None,
            message: err.message,
        }
    }
}
