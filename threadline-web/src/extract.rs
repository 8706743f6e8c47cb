use crate::adapters::AdapterChain;
use crate::gate::ConcurrencyGate;
use crate::sanitize::Sanitizer;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use threadline_drivers::browser::{BrowserManager, BrowserPage};
use tracing::{debug, info, warn};
use url::Url;

/// Separator placed between harvested text blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

const SCROLL_SCRIPT: &str = r#"
    window.scrollTo(0, document.body.scrollHeight);
    return document.body.scrollHeight;
"#;

/// Clean text recovered from one link.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceText {
    pub url: Url,
    pub title: Option<String>,
    pub text: String,
}

impl SourceText {
    /// Text with a provenance header for prompt assembly.
    pub fn render(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => format!("Source: {title}\n\n{}", self.text),
            _ => format!("Source: {}\n\n{}", self.url, self.text),
        }
    }
}

/// Why a link produced no usable text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{url}: {reason}")]
pub struct ExtractionError {
    pub url: String,
    pub reason: String,
    pub title: Option<String>,
}

impl ExtractionError {
    fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
            title: None,
        }
    }

    fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

/// Turns a link into text. Never fails past its boundary except as
/// [`ExtractionError`].
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    async fn extract(&self, url: &Url) -> Result<SourceText, ExtractionError>;
}

#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    pub navigation_timeout: Duration,
    /// Bound on each evaluation step after navigation.
    pub step_timeout: Duration,
    /// Fixed wait after scrolling for client-side rendering to finish.
    pub settle: Duration,
    pub scroll_interval: Duration,
    pub max_scroll_rounds: u32,
    pub min_block_chars: usize,
    pub min_viable_chars: usize,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(45),
            step_timeout: Duration::from_secs(15),
            settle: Duration::from_millis(2500),
            scroll_interval: Duration::from_millis(600),
            max_scroll_rounds: 20,
            min_block_chars: 20,
            min_viable_chars: 200,
        }
    }
}

/// Browser-driven extractor: gate, page, navigate, scroll, harvest, sanitize.
///
/// Each extraction runs on its own task. A caller that stops waiting does not
/// cancel the browser work, which still closes its page and frees its permit.
pub struct ContentExtractor {
    pipeline: Arc<Pipeline>,
}

#[derive(Clone)]
struct Pipeline {
    browser: Arc<BrowserManager>,
    gate: ConcurrencyGate,
    adapters: AdapterChain,
    sanitizer: Sanitizer,
    settings: ExtractorSettings,
}

/// What a page visit produced before sanitization.
struct Visit {
    title: Option<String>,
    harvest: anyhow::Result<Option<crate::adapters::Harvest>>,
}

impl ContentExtractor {
    pub fn new(
        browser: Arc<BrowserManager>,
        gate: ConcurrencyGate,
        sanitizer: Sanitizer,
        settings: ExtractorSettings,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline {
                browser,
                gate,
                adapters: AdapterChain::default(),
                sanitizer,
                settings,
            }),
        }
    }

    pub fn with_adapters(mut self, adapters: AdapterChain) -> Self {
        Arc::make_mut(&mut self.pipeline).adapters = adapters;
        self
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.pipeline.gate
    }
}

impl Pipeline {
    async fn run(&self, url: &Url) -> Result<SourceText, ExtractionError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ExtractionError::new(url.as_str(), "extraction is shutting down"))?;

        let page = match self.browser.open_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!(target: "web.extract", %url, error = %format!("{e:#}"), "no browser page");
                return Err(ExtractionError::new(url.as_str(), format!("{e:#}")));
            }
        };

        let visit = self.visit(page.as_ref(), url).await;

        if let Err(e) = page.close().await {
            warn!(target: "web.extract", %url, error = %e, "closing page failed");
        }
        drop(permit);

        let Visit { title, harvest } = visit;
        let harvest = match harvest {
            Ok(Some(harvest)) => harvest,
            Ok(None) => {
                let reason = match &title {
                    Some(t) => format!("no content bubbles found (page title: {t:?})"),
                    None => "no content bubbles found".to_string(),
                };
                return Err(ExtractionError::new(url.as_str(), reason).with_title(title));
            }
            Err(e) => {
                warn!(target: "web.extract", %url, error = %format!("{e:#}"), "page visit failed");
                return Err(ExtractionError::new(url.as_str(), format!("{e:#}")).with_title(title));
            }
        };

        let text = self
            .sanitizer
            .sanitize(&harvest.blocks.join(BLOCK_SEPARATOR));
        if text.len() < self.settings.min_viable_chars {
            return Err(ExtractionError::new(
                url.as_str(),
                format!(
                    "only {} characters of content found (need {})",
                    text.len(),
                    self.settings.min_viable_chars
                ),
            )
            .with_title(title));
        }

        info!(
            target: "web.extract",
            %url,
            adapter = %harvest.adapter,
            blocks = harvest.blocks.len(),
            chars = text.len(),
            "source extracted"
        );
        Ok(SourceText {
            url: url.clone(),
            title,
            text,
        })
    }

    async fn visit(&self, page: &dyn BrowserPage, url: &Url) -> Visit {
        let mut title = None;
        let harvest = async {
            page.goto(url.as_str(), self.settings.navigation_timeout)
                .await?;
            title = bounded("title", self.settings.step_timeout, page.title())
                .await
                .ok()
                .filter(|t| !t.trim().is_empty());
            self.scroll_to_bottom(page).await?;
            tokio::time::sleep(self.settings.settle).await;
            bounded(
                "harvest",
                self.settings.step_timeout,
                self.adapters
                    .harvest(page, url, self.settings.min_block_chars),
            )
            .await
        }
        .await;
        Visit { title, harvest }
    }

    /// Scroll until the document height stops growing or the round limit hits.
    async fn scroll_to_bottom(&self, page: &dyn BrowserPage) -> anyhow::Result<()> {
        let mut previous = None;
        for round in 0..self.settings.max_scroll_rounds {
            let height = bounded(
                "scroll",
                self.settings.step_timeout,
                page.execute(SCROLL_SCRIPT, vec![]),
            )
            .await?
            .as_u64();
            if height.is_some() && height == previous {
                debug!(target: "web.extract", round, ?height, "scroll height stable");
                return Ok(());
            }
            previous = height;
            tokio::time::sleep(self.settings.scroll_interval).await;
        }
        Ok(())
    }
}

#[async_trait]
impl SourceExtractor for ContentExtractor {
    async fn extract(&self, url: &Url) -> Result<SourceText, ExtractionError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExtractionError::new(
                url.as_str(),
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }

        let pipeline = Arc::clone(&self.pipeline);
        let target = url.clone();
        let task = tokio::spawn(async move { pipeline.run(&target).await });
        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(target: "web.extract", %url, error = %e, "extraction task failed");
                Err(ExtractionError::new(
                    url.as_str(),
                    format!("extraction task failed: {e}"),
                ))
            }
        }
    }
}

async fn bounded<T, F>(step: &str, limit: Duration, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow::anyhow!("{step} timed out after {}ms", limit.as_millis()))?
}
