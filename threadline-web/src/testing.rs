//! In-memory browser fakes for extractor and adapter tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use threadline_drivers::browser::{BrowserHandle, BrowserLauncher, BrowserPage};

#[derive(Clone, Default)]
pub struct FakePage {
    blocks: HashMap<String, Vec<String>>,
    title: Option<String>,
    goto_error: Option<String>,
    hang_on_goto: bool,
    pub closed: Arc<AtomicUsize>,
    pub scrolls: Arc<AtomicUsize>,
}

impl FakePage {
    pub fn with_blocks(mut self, selector: &str, blocks: Vec<String>) -> Self {
        self.blocks.insert(selector.to_string(), blocks);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn failing_goto(mut self, message: &str) -> Self {
        self.goto_error = Some(message.to_string());
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang_on_goto = true;
        self
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, _url: &str, timeout: Duration) -> Result<()> {
        if self.hang_on_goto {
            tokio::time::timeout(timeout, tokio::time::sleep(Duration::from_secs(3600)))
                .await
                .map_err(|_| anyhow!("navigation timed out after {}s", timeout.as_secs()))?;
        }
        match &self.goto_error {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }

    async fn title(&self) -> Result<String> {
        self.title.clone().ok_or_else(|| anyhow!("no title"))
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        if script.contains("querySelectorAll") {
            let selector = args.first().and_then(Value::as_str).unwrap_or_default();
            return Ok(json!(self.blocks.get(selector).cloned().unwrap_or_default()));
        }
        if script.contains("scrollTo") {
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            return Ok(json!(1000));
        }
        Ok(Value::Null)
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeBrowser {
    page: FakePage,
}

#[async_trait]
impl BrowserHandle for FakeBrowser {
    async fn is_connected(&self) -> bool {
        true
    }

    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        Ok(Box::new(self.page.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub struct FakeLauncher {
    pub page: FakePage,
    pub fail: Option<String>,
}

impl FakeLauncher {
    pub fn serving(page: FakePage) -> Self {
        Self { page, fail: None }
    }

    pub fn broken(message: &str) -> Self {
        Self {
            page: FakePage::default(),
            fail: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>> {
        match &self.fail {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(Arc::new(FakeBrowser {
                page: self.page.clone(),
            })),
        }
    }
}
