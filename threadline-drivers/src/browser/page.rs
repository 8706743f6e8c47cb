use crate::browser::{stealth::identity_script, BrowserPage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fantoccini::{wd::WindowHandle, Client};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// One browser tab.
pub struct FantocciniPage {
    client: Client,
    window: WindowHandle,
    home: WindowHandle,
    window_lock: Arc<Mutex<()>>,
}

impl FantocciniPage {
    pub(crate) fn new(
        client: Client,
        window: WindowHandle,
        home: WindowHandle,
        window_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            client,
            window,
            home,
            window_lock,
        }
    }

    /// Take the session's window lock and make this tab current.
    async fn focus(&self) -> Result<MutexGuard<'_, ()>> {
        let guard = self.window_lock.lock().await;
        self.client.switch_to_window(self.window.clone()).await?;
        Ok(guard)
    }
}

#[async_trait]
impl BrowserPage for FantocciniPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let navigate = async {
            let _guard = self.focus().await?;
            self.client.goto(url).await?;
            if let Err(e) = self.client.execute(identity_script(), vec![]).await {
                debug!(target: "browser.page", error = %e, "identity script failed");
            }
            Ok::<_, anyhow::Error>(())
        };
        tokio::time::timeout(timeout, navigate)
            .await
            .map_err(|_| anyhow!("navigation timed out after {}s", timeout.as_secs()))?
    }

    async fn title(&self) -> Result<String> {
        let _guard = self.focus().await?;
        Ok(self.client.title().await?)
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let _guard = self.focus().await?;
        Ok(self.client.execute(script, args).await?)
    }

    async fn close(&self) -> Result<()> {
        let _guard = self.focus().await?;
        self.client.close_window().await?;
        self.client.switch_to_window(self.home.clone()).await?;
        debug!(target: "browser.page", window = ?self.window, "tab closed");
        Ok(())
    }
}
