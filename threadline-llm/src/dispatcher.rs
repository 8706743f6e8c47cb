//! Multi-tier completion dispatch with credential failover.
//!
//! Model tiers are tried most capable first. Within a tier every credential in
//! the pool gets one attempt, starting from the pool's shared cursor. Any failed
//! attempt (rate limit, transient, or rejection) moves the cursor to the next
//! credential immediately; there is no same-credential backoff, since each key
//! has its own rate-limit bucket. With `K` credentials and `M` tiers a dispatch
//! makes at most `K * M` attempts before giving up.
use crate::credentials::CredentialPool;
use crate::json::extract_json;
use crate::traits::{
    AttemptError, Completer, CompletionRequest, CompletionTransport, ResponseFormat, ResponseMode,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use threadline_common::Message;
use tracing::{info, warn};

/// Sampling knobs shared by every request a dispatcher builds.
#[derive(Debug, Clone, Copy)]
pub struct SamplingSettings {
    pub temperature: f32,
    /// Used instead of `temperature` for [`ResponseMode::Json`].
    pub json_temperature: f32,
    pub max_tokens: u32,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            json_temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

/// A successful dispatch.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub credential_index: usize,
    pub attempts: usize,
    /// Embedded JSON object recovered from `text`; only attempted in JSON mode.
    pub json: Option<Value>,
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error(
        "every account and every fallback model has hit its limit ({attempts} attempts; last error: {last_error})"
    )]
    Exhausted { attempts: usize, last_error: String },

    #[error("completion dispatch is not configured: {0}")]
    Unconfigured(String),
}

pub struct CompletionDispatcher {
    transport: Arc<dyn CompletionTransport>,
    credentials: Arc<CredentialPool>,
    models: Vec<String>,
    sampling: SamplingSettings,
}

impl CompletionDispatcher {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        credentials: Arc<CredentialPool>,
        models: Vec<String>,
        sampling: SamplingSettings,
    ) -> Self {
        Self {
            transport,
            credentials,
            models,
            sampling,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialPool> {
        &self.credentials
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    fn build_request(&self, model: &str, messages: &[Message], mode: ResponseMode) -> CompletionRequest {
        let (temperature, response_format) = match mode {
            ResponseMode::Text => (self.sampling.temperature, None),
            ResponseMode::Json => (
                self.sampling.json_temperature,
                Some(ResponseFormat::json_object()),
            ),
        };
        CompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature,
            max_tokens: self.sampling.max_tokens,
            response_format,
        }
    }

    /// Run `messages` through every tier and credential until one succeeds.
    pub async fn dispatch(
        &self,
        messages: &[Message],
        mode: ResponseMode,
    ) -> Result<Completion, DispatchError> {
        if self.credentials.is_empty() {
            return Err(DispatchError::Unconfigured("no API credentials".into()));
        }
        if self.models.is_empty() {
            return Err(DispatchError::Unconfigured("no model tiers".into()));
        }

        let mut attempts = 0usize;
        let mut last_error: Option<AttemptError> = None;

        for model in &self.models {
            let request = self.build_request(model, messages, mode);

            for _ in 0..self.credentials.len() {
                let Some((index, key)) = self.credentials.current() else {
                    break;
                };
                attempts += 1;

                match self.transport.complete(key, &request).await {
                    Ok(text) => {
                        info!(
                            target: "llm.dispatch",
                            %model,
                            credential = index,
                            attempts,
                            chars = text.len(),
                            "completion succeeded"
                        );
                        let json = match mode {
                            ResponseMode::Json => extract_json(&text),
                            ResponseMode::Text => None,
                        };
                        return Ok(Completion {
                            text,
                            model: model.clone(),
                            credential_index: index,
                            attempts,
                            json,
                        });
                    }
                    Err(err) => {
                        let next = self.credentials.advance_from(index);
                        warn!(
                            target: "llm.dispatch",
                            %model,
                            credential = index,
                            next_credential = next,
                            attempts,
                            rate_limited = err.is_rate_limit(),
                            error = %err,
                            "attempt failed; rotating credential"
                        );
                        last_error = Some(err);
                    }
                }
            }

            warn!(target: "llm.dispatch", %model, "model tier exhausted; falling back");
        }

        Err(DispatchError::Exhausted {
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "none recorded".to_string()),
        })
    }
}

#[async_trait]
impl Completer for CompletionDispatcher {
    async fn complete(
        &self,
        messages: &[Message],
        mode: ResponseMode,
    ) -> Result<Completion, DispatchError> {
        self.dispatch(messages, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Replays a fixed outcome per credential and records every request.
    struct ScriptedTransport {
        outcomes: HashMap<String, Result<String, AttemptError>>,
        calls: Mutex<Vec<(String, CompletionRequest)>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: &[(&str, Result<&str, AttemptError>)]) -> Arc<Self> {
            Arc::new(Self {
                outcomes: outcomes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone().map(str::to_string)))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, CompletionRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionTransport for ScriptedTransport {
        async fn complete(
            &self,
            api_key: &str,
            request: &CompletionRequest,
        ) -> Result<String, AttemptError> {
            self.calls
                .lock()
                .unwrap()
                .push((api_key.to_string(), request.clone()));
            self.outcomes
                .get(api_key)
                .cloned()
                .unwrap_or_else(|| Err(AttemptError::Transient("unscripted".into())))
        }
    }

    fn dispatcher(transport: Arc<ScriptedTransport>, keys: &[&str], models: &[&str]) -> CompletionDispatcher {
        CompletionDispatcher::new(
            transport,
            Arc::new(CredentialPool::new(keys.iter().copied())),
            models.iter().map(|m| m.to_string()).collect(),
            SamplingSettings::default(),
        )
    }

    fn limited() -> Result<&'static str, AttemptError> {
        Err(AttemptError::RateLimited("429".into()))
    }

    #[tokio::test]
    async fn exhausts_after_every_tier_and_credential() {
        let transport = ScriptedTransport::new(&[("k1", limited()), ("k2", limited()), ("k3", limited())]);
        let d = dispatcher(transport.clone(), &["k1", "k2", "k3"], &["big", "small"]);

        let err = d.dispatch(&[Message::user("hi")], ResponseMode::Text).await.unwrap_err();

        match err {
            DispatchError::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 6);
                assert!(last_error.contains("Rate limit"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let calls = transport.calls();
        assert_eq!(calls.len(), 6);
        let order: Vec<(&str, &str)> = calls
            .iter()
            .map(|(k, r)| (k.as_str(), r.model.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("k1", "big"),
                ("k2", "big"),
                ("k3", "big"),
                ("k1", "small"),
                ("k2", "small"),
                ("k3", "small"),
            ]
        );
    }

    #[tokio::test]
    async fn rotates_once_to_the_working_credential() {
        let transport = ScriptedTransport::new(&[("k1", limited()), ("k2", Ok("hello"))]);
        let d = dispatcher(transport.clone(), &["k1", "k2"], &["big", "small"]);

        let done = d.dispatch(&[Message::user("hi")], ResponseMode::Text).await.unwrap();

        assert_eq!(done.text, "hello");
        assert_eq!(done.credential_index, 1);
        assert_eq!(done.model, "big");
        assert_eq!(done.attempts, 2);
        assert_eq!(d.credentials().rotations(), 1);
        assert_eq!(d.credentials().cursor(), 1);
    }

    #[tokio::test]
    async fn cursor_carries_over_between_dispatches() {
        let transport = ScriptedTransport::new(&[("k1", limited()), ("k2", Ok("ok"))]);
        let d = dispatcher(transport.clone(), &["k1", "k2"], &["big"]);

        d.dispatch(&[Message::user("one")], ResponseMode::Text).await.unwrap();
        d.dispatch(&[Message::user("two")], ResponseMode::Text).await.unwrap();

        let keys: Vec<String> = transport.calls().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["k1", "k2", "k2"]);
    }

    #[tokio::test]
    async fn transient_and_api_failures_also_fail_over() {
        let transport = ScriptedTransport::new(&[
            ("k1", Err(AttemptError::Transient("connection reset".into()))),
            (
                "k2",
                Err(AttemptError::Api {
                    status: Some(401),
                    message: "invalid api key".into(),
                }),
            ),
            ("k3", Ok("fine")),
        ]);
        let d = dispatcher(transport, &["k1", "k2", "k3"], &["big"]);

        let done = d.dispatch(&[Message::user("hi")], ResponseMode::Text).await.unwrap();
        assert_eq!(done.credential_index, 2);
        assert_eq!(done.attempts, 3);
    }

    #[tokio::test]
    async fn falls_back_to_the_next_tier() {
        struct TierGate;
        #[async_trait]
        impl CompletionTransport for TierGate {
            async fn complete(&self, _key: &str, request: &CompletionRequest) -> Result<String, AttemptError> {
                if request.model == "small" {
                    Ok("from small".into())
                } else {
                    Err(AttemptError::RateLimited("tokens per day".into()))
                }
            }
        }
        let d = CompletionDispatcher::new(
            Arc::new(TierGate),
            Arc::new(CredentialPool::new(["a", "b"])),
            vec!["big".into(), "small".into()],
            SamplingSettings::default(),
        );

        let done = d.dispatch(&[Message::user("hi")], ResponseMode::Text).await.unwrap();
        assert_eq!(done.model, "small");
        assert_eq!(done.attempts, 3);
    }

    #[tokio::test]
    async fn json_mode_lowers_temperature_and_parses_payload() {
        let transport = ScriptedTransport::new(&[("k1", Ok("trace: {\"steps\": [1, 2]}"))]);
        let d = dispatcher(transport.clone(), &["k1"], &["big"]);

        let done = d.dispatch(&[Message::user("trace")], ResponseMode::Json).await.unwrap();

        assert_eq!(done.json, Some(serde_json::json!({"steps": [1, 2]})));
        let (_, request) = &transport.calls()[0];
        assert_eq!(request.temperature, SamplingSettings::default().json_temperature);
        assert_eq!(request.response_format, Some(ResponseFormat::json_object()));
    }

    #[tokio::test]
    async fn text_mode_never_parses_json() {
        let transport = ScriptedTransport::new(&[("k1", Ok("{\"a\": 1}"))]);
        let d = dispatcher(transport.clone(), &["k1"], &["big"]);

        let done = d.dispatch(&[Message::user("x")], ResponseMode::Text).await.unwrap();
        assert!(done.json.is_none());
        assert!(transport.calls()[0].1.response_format.is_none());
    }

    #[tokio::test]
    async fn empty_configuration_is_reported() {
        let transport = ScriptedTransport::new(&[]);
        let d = dispatcher(transport.clone(), &[], &["big"]);
        assert!(matches!(
            d.dispatch(&[Message::user("x")], ResponseMode::Text).await,
            Err(DispatchError::Unconfigured(_))
        ));

        let d = dispatcher(transport.clone(), &["k"], &[]);
        assert!(matches!(
            d.dispatch(&[Message::user("x")], ResponseMode::Text).await,
            Err(DispatchError::Unconfigured(_))
        ));
        assert!(transport.calls().is_empty());
    }
}
