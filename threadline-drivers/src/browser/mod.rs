use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub mod driver;
pub mod fingerprint;
pub mod manager;
pub mod page;
pub mod stealth;

pub use driver::{FantocciniBrowser, FantocciniLauncher};
pub use manager::BrowserManager;
pub use page::FantocciniPage;

/// Starts a controllable browser process.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>>;
}

/// A running browser that pages can be opened on.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// Cheap liveness probe; `false` means the handle must be replaced.
    async fn is_connected(&self) -> bool;
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>>;
    async fn close(&self) -> Result<()>;
}

/// One isolated page. Callers own it and must [`close`](BrowserPage::close) it.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;
    async fn title(&self) -> Result<String>;
    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value>;
    async fn close(&self) -> Result<()>;
}
