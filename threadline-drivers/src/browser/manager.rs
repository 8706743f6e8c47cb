use super::{BrowserHandle, BrowserLauncher, BrowserPage};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Owner of the single shared browser process.
///
/// The check-and-launch in [`acquire`](Self::acquire) runs under one async
/// mutex, so concurrent callers never start a second process. A handle that
/// fails its liveness probe is dropped and replaced on the next acquire.
pub struct BrowserManager {
    launcher: Arc<dyn BrowserLauncher>,
    current: Mutex<Option<Arc<dyn BrowserHandle>>>,
    launches: AtomicU64,
}

impl BrowserManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            current: Mutex::new(None),
            launches: AtomicU64::new(0),
        }
    }

    /// Return the live shared browser, launching one if needed.
    ///
    /// Launch failures are returned as-is and not retried here; the next call
    /// tries again.
    pub async fn acquire(&self) -> Result<Arc<dyn BrowserHandle>> {
        let mut slot = self.current.lock().await;

        if let Some(handle) = slot.as_ref() {
            if handle.is_connected().await {
                return Ok(Arc::clone(handle));
            }
            warn!(target: "browser.manager", "shared browser disconnected; relaunching");
            if let Some(stale) = slot.take() {
                if let Err(e) = stale.close().await {
                    warn!(target: "browser.manager", error = %e, "closing stale browser failed");
                }
            }
        }

        let handle = self
            .launcher
            .launch()
            .await
            .context("failed to launch browser")?;
        let n = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        info!(target: "browser.manager", launches = n, "browser launched");
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Acquire the shared browser and open a fresh page on it.
    pub async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        let browser = self.acquire().await?;
        browser.open_page().await
    }

    /// Number of processes started over this manager's lifetime.
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::SeqCst)
    }

    /// Close and forget the shared browser, if any.
    pub async fn shutdown(&self) -> Result<()> {
        let handle = self.current.lock().await.take();
        match handle {
            Some(handle) => {
                info!(target: "browser.manager", "shutting down shared browser");
                handle.close().await
            }
            None => Ok(()),
        }
    }
}
