use crate::browser::{
    fingerprint::UserAgentPool,
    page::FantocciniPage,
    stealth::{build_chrome_options, LaunchOptions},
    BrowserHandle, BrowserLauncher, BrowserPage,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{wd::WindowHandle, Client, ClientBuilder};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use webdriver::capabilities::Capabilities;

/// Starts Chrome sessions through a running WebDriver service (chromedriver).
pub struct FantocciniLauncher {
    opts: LaunchOptions,
    identities: UserAgentPool,
}

impl FantocciniLauncher {
    pub fn new(opts: LaunchOptions) -> Self {
        Self {
            opts,
            identities: UserAgentPool::new(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FantocciniLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>> {
        let profile = self.identities.pick();
        let mut caps = Capabilities::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            build_chrome_options(&self.opts, &profile),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.opts.webdriver_url)
            .await
            .with_context(|| format!("connecting to WebDriver at {}", self.opts.webdriver_url))?;
        let home = client.window().await.context("reading initial window")?;

        info!(
            target: "browser.driver",
            webdriver = %self.opts.webdriver_url,
            headless = self.opts.headless,
            user_agent = %profile.user_agent,
            "browser session started"
        );
        Ok(Arc::new(FantocciniBrowser {
            client,
            home,
            window_lock: Arc::new(Mutex::new(())),
        }))
    }
}

/// A live WebDriver session. Pages are tabs on it.
///
/// WebDriver has a single "current window" per session, so every tab command
/// switches to its own window while holding `window_lock`.
pub struct FantocciniBrowser {
    client: Client,
    home: WindowHandle,
    window_lock: Arc<Mutex<()>>,
}

#[async_trait]
impl BrowserHandle for FantocciniBrowser {
    async fn is_connected(&self) -> bool {
        self.client.windows().await.is_ok()
    }

    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        let _guard = self.window_lock.lock().await;
        self.client.switch_to_window(self.home.clone()).await?;
        let tab = self.client.new_window(true).await.context("opening tab")?;
        debug!(target: "browser.driver", window = ?tab.handle, "tab opened");
        Ok(Box::new(FantocciniPage::new(
            self.client.clone(),
            tab.handle,
            self.home.clone(),
            Arc::clone(&self.window_lock),
        )))
    }

    async fn close(&self) -> Result<()> {
        let _guard = self.window_lock.lock().await;
        self.client.clone().close().await?;
        info!(target: "browser.driver", "browser session closed");
        Ok(())
    }
}
