//! Per-site DOM strategies.
//!
//! Each shared-conversation site renders its messages differently and changes
//! markup between releases, so selectors live behind [`SiteAdapter`]. An
//! [`AdapterChain`] tries the adapters that match the URL, then a generic
//! fallback that ends at `body`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use threadline_drivers::browser::BrowserPage;
use tracing::debug;
use url::Url;

/// Collects the `innerText` of every match whose trimmed length exceeds the
/// threshold. Arguments: selector, threshold.
const HARVEST_SCRIPT: &str = r#"
    const [selector, minChars] = arguments;
    return Array.from(document.querySelectorAll(selector))
        .map((el) => (el.innerText || el.textContent || '').trim())
        .filter((text) => text.length > minChars);
"#;

#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, url: &Url) -> bool;

    /// Text blocks longer than `min_block_chars`, in document order. Empty when
    /// none of this adapter's strategies found anything.
    async fn try_selectors(
        &self,
        page: &dyn BrowserPage,
        min_block_chars: usize,
    ) -> Result<Vec<String>>;
}

/// Adapter driven by an ordered CSS selector list; the first selector that
/// yields any block wins.
#[derive(Debug, Clone)]
pub struct SelectorAdapter {
    name: String,
    hosts: Vec<String>,
    selectors: Vec<String>,
}

impl SelectorAdapter {
    /// `hosts` match exactly or as a parent domain. An empty host list matches every URL.
    pub fn new<H, S>(name: &str, hosts: H, selectors: S) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            name: name.to_string(),
            hosts: hosts.into_iter().map(Into::into).collect(),
            selectors: selectors.into_iter().map(Into::into).collect(),
        }
    }

    /// Broad containers ending in the whole document body.
    pub fn generic() -> Self {
        Self::new(
            "generic",
            Vec::<String>::new(),
            ["article", "main", "[role=main]", "body"],
        )
    }
}

#[async_trait]
impl SiteAdapter for SelectorAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, url: &Url) -> bool {
        if self.hosts.is_empty() {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.hosts.iter().any(|h| {
            host == *h
                || host
                    .strip_suffix(h.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    async fn try_selectors(
        &self,
        page: &dyn BrowserPage,
        min_block_chars: usize,
    ) -> Result<Vec<String>> {
        for selector in &self.selectors {
            let raw = page
                .execute(HARVEST_SCRIPT, vec![json!(selector), json!(min_block_chars)])
                .await
                .with_context(|| format!("evaluating selector {selector:?}"))?;
            let blocks: Vec<String> = serde_json::from_value(raw).unwrap_or_default();
            let blocks: Vec<String> = blocks
                .into_iter()
                .filter(|b| b.trim().chars().count() > min_block_chars)
                .collect();
            debug!(
                target: "web.adapters",
                adapter = %self.name,
                %selector,
                blocks = blocks.len(),
                "selector evaluated"
            );
            if !blocks.is_empty() {
                return Ok(blocks);
            }
        }
        Ok(Vec::new())
    }
}

/// Ordered site adapters plus a fallback.
#[derive(Clone)]
pub struct AdapterChain {
    adapters: Vec<Arc<dyn SiteAdapter>>,
    fallback: Arc<dyn SiteAdapter>,
}

/// Blocks found by one adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Harvest {
    pub adapter: String,
    pub blocks: Vec<String>,
}

impl Default for AdapterChain {
    fn default() -> Self {
        Self::new(builtin_adapters(), Arc::new(SelectorAdapter::generic()))
    }
}

impl AdapterChain {
    pub fn new(adapters: Vec<Arc<dyn SiteAdapter>>, fallback: Arc<dyn SiteAdapter>) -> Self {
        Self { adapters, fallback }
    }

    /// Add a site adapter ahead of the built-ins.
    pub fn with_adapter(mut self, adapter: Arc<dyn SiteAdapter>) -> Self {
        self.adapters.insert(0, adapter);
        self
    }

    /// Adapters to try for `url`, fallback last.
    pub fn for_url(&self, url: &Url) -> Vec<Arc<dyn SiteAdapter>> {
        self.adapters
            .iter()
            .filter(|a| a.matches(url))
            .cloned()
            .chain(std::iter::once(Arc::clone(&self.fallback)))
            .collect()
    }

    /// Run the matching adapters in order; the first that yields blocks wins.
    pub async fn harvest(
        &self,
        page: &dyn BrowserPage,
        url: &Url,
        min_block_chars: usize,
    ) -> Result<Option<Harvest>> {
        for adapter in self.for_url(url) {
            let blocks = adapter.try_selectors(page, min_block_chars).await?;
            if !blocks.is_empty() {
                return Ok(Some(Harvest {
                    adapter: adapter.name().to_string(),
                    blocks,
                }));
            }
        }
        Ok(None)
    }
}

/// Adapters for the shared-conversation pages of the major chat products.
pub fn builtin_adapters() -> Vec<Arc<dyn SiteAdapter>> {
    vec![
        Arc::new(SelectorAdapter::new(
            "chatgpt",
            ["chatgpt.com", "chat.openai.com"],
            ["[data-message-author-role]", "div.markdown", "article"],
        )),
        Arc::new(SelectorAdapter::new(
            "claude",
            ["claude.ai"],
            [
                "[data-testid=\"user-message\"], .font-claude-message",
                "div.font-claude-response",
                "div.prose",
            ],
        )),
        Arc::new(SelectorAdapter::new(
            "gemini",
            ["gemini.google.com", "g.co"],
            ["user-query, model-response", "message-content", ".query-text"],
        )),
        Arc::new(SelectorAdapter::new(
            "grok",
            ["grok.com", "x.com"],
            ["div.message-bubble", "[data-testid=\"message\"]"],
        )),
        Arc::new(SelectorAdapter::new(
            "perplexity",
            ["perplexity.ai"],
            ["div.prose", "[data-testid=\"answer\"]", "h1"],
        )),
        Arc::new(SelectorAdapter::new(
            "deepseek",
            ["chat.deepseek.com"],
            [".ds-markdown", "div.ds-message"],
        )),
    ]
}
