use crate::error::AppError;
use crate::prompts;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use threadline_common::Message;
use threadline_llm::{Completer, ResponseMode, json::extract_json};
use threadline_web::{ExtractionError, SourceExtractor, SourceText};
use tracing::{info, warn};
use url::Url;

/// Composes source extraction and completion dispatch into the three use cases
/// the HTTP surface exposes.
pub struct Orchestrator {
    extractor: Arc<dyn SourceExtractor>,
    llm: Arc<dyn Completer>,
    link_concurrency: usize,
    min_viable_chars: usize,
}

impl Orchestrator {
    pub fn new(extractor: Arc<dyn SourceExtractor>, llm: Arc<dyn Completer>) -> Self {
        Self {
            extractor,
            llm,
            link_concurrency: 1,
            min_viable_chars: 200,
        }
    }

    /// Links extracted at once within one request; results keep input order.
    pub fn with_link_concurrency(mut self, n: usize) -> Self {
        self.link_concurrency = n.max(1);
        self
    }

    pub fn with_min_viable_chars(mut self, n: usize) -> Self {
        self.min_viable_chars = n;
        self
    }

    /// Build a knowledge foundation from the links, or from the title alone
    /// when there are none.
    pub async fn initialize(&self, links: &[String], title: &str) -> Result<String, AppError> {
        if links.is_empty() {
            info!(target: "app.initialize", %title, "no links; synthesizing from title");
            return self.complete_text(&prompts::title_only(title)).await;
        }

        let results = self.extract_all(links).await;
        let mut sources: Vec<SourceText> = Vec::with_capacity(results.len());
        let mut failures: Vec<ExtractionError> = Vec::new();
        for result in results {
            match result {
                Ok(source) => sources.push(source),
                Err(e) => {
                    warn!(target: "app.initialize", url = %e.url, reason = %e.reason, "link skipped");
                    failures.push(e);
                }
            }
        }

        let usable: usize = sources.iter().map(|s| s.text.len()).sum();
        if sources.is_empty() || usable < self.min_viable_chars {
            let reason = failures
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("only {usable} characters of source text"));
            return Err(AppError::Extraction(reason));
        }

        info!(
            target: "app.initialize",
            links = links.len(),
            usable_sources = sources.len(),
            failed = failures.len(),
            chars = usable,
            "sources extracted"
        );
        let combined = sources
            .iter()
            .map(SourceText::render)
            .collect::<Vec<_>>()
            .join("\n\n");
        self.complete_text(&prompts::synthesis(title, &combined))
            .await
    }

    /// Answer the next turn grounded in `foundation`.
    pub async fn chat(&self, foundation: &str, history: Vec<Message>) -> Result<String, AppError> {
        if history.is_empty() {
            return Err(AppError::BadRequest(
                "history must contain at least one message".into(),
            ));
        }
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(prompts::chat_system(foundation));
        messages.extend(history);
        self.complete_text(&messages).await
    }

    /// Step-by-step execution trace of `code` as `{"steps": [...]}`.
    pub async fn debug(&self, code: &str, language: &str) -> Result<Value, AppError> {
        let completion = self
            .llm
            .complete(&prompts::debug(code, language), ResponseMode::Json)
            .await?;
        let trace = completion
            .json
            .or_else(|| extract_json(&completion.text))
            .ok_or_else(|| AppError::MalformedResponse("no JSON object in model output".into()))?;
        if !trace.get("steps").is_some_and(Value::is_array) {
            return Err(AppError::MalformedResponse(
                "trace has no \"steps\" array".into(),
            ));
        }
        Ok(trace)
    }

    /// Futures own their link and extractor handle; results keep input order.
    async fn extract_all(&self, links: &[String]) -> Vec<Result<SourceText, ExtractionError>> {
        let extractor = Arc::clone(&self.extractor);
        stream::iter(links.to_vec())
            .map(move |raw| {
                let extractor = Arc::clone(&extractor);
                async move {
                    let url = Url::parse(raw.trim()).map_err(|e| ExtractionError {
                        url: raw.clone(),
                        reason: format!("invalid URL: {e}"),
                        title: None,
                    })?;
                    extractor.extract(&url).await
                }
            })
            .buffered(self.link_concurrency)
            .collect()
            .await
    }

    async fn complete_text(&self, messages: &[Message]) -> Result<String, AppError> {
        let completion = self.llm.complete(messages, ResponseMode::Text).await?;
        Ok(completion.text)
    }
}
