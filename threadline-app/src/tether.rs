//! Wires configuration into a running service.

use crate::orchestrator::Orchestrator;
use crate::routes::{AppState, router};
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use threadline_config::ThreadlineConfig;
use threadline_drivers::browser::{BrowserManager, FantocciniLauncher, stealth::LaunchOptions};
use threadline_llm::{CompletionDispatcher, CredentialPool, OpenAiCompatTransport, SamplingSettings};
use threadline_web::{ConcurrencyGate, ContentExtractor, ExtractorSettings, Sanitizer};
use tracing::{info, warn};

/// The assembled service: HTTP router plus the shared resources that need an
/// orderly teardown.
pub struct Tether {
    router: Router,
    browser: Arc<BrowserManager>,
    gate: ConcurrencyGate,
    bind: String,
}

impl Tether {
    pub fn build(cfg: &ThreadlineConfig) -> Result<Self> {
        cfg.validate()?;

        let transport = OpenAiCompatTransport::new(
            &cfg.llm.endpoint,
            Duration::from_secs(cfg.llm.request_timeout_secs),
        )?;
        let credentials = Arc::new(CredentialPool::new(cfg.llm.api_keys.iter().cloned()));
        let dispatcher = Arc::new(CompletionDispatcher::new(
            Arc::new(transport),
            credentials,
            cfg.llm.models.clone(),
            SamplingSettings {
                temperature: cfg.llm.temperature,
                json_temperature: cfg.llm.json_temperature,
                max_tokens: cfg.llm.max_tokens,
            },
        ));

        let launcher = FantocciniLauncher::new(LaunchOptions {
            webdriver_url: cfg.browser.webdriver_url.clone(),
            binary: cfg.browser.binary.clone(),
            headless: cfg.browser.headless,
            block_media: cfg.browser.block_media,
        });
        let browser = Arc::new(BrowserManager::new(Arc::new(launcher)));
        let gate = ConcurrencyGate::new(cfg.extraction.max_concurrent);
        let sanitizer = Sanitizer::new(&cfg.extraction.boilerplate, cfg.extraction.max_chars)
            .context("compiling boilerplate phrases")?;
        let extractor = Arc::new(ContentExtractor::new(
            Arc::clone(&browser),
            gate.clone(),
            sanitizer,
            extractor_settings(cfg),
        ));

        let orchestrator = Orchestrator::new(extractor, dispatcher)
            .with_link_concurrency(cfg.extraction.link_concurrency)
            .with_min_viable_chars(cfg.extraction.min_viable_chars);

        info!(
            target: "app.tether",
            credentials = cfg.llm.api_keys.len(),
            models = ?cfg.llm.models,
            max_concurrent = gate.ceiling(),
            link_concurrency = cfg.extraction.link_concurrency,
            "service assembled"
        );

        Ok(Self {
            router: router(AppState {
                orchestrator: Arc::new(orchestrator),
            }),
            browser,
            gate,
            bind: cfg.server.bind.clone(),
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until ctrl-c, then stop admitting extractions and close the browser.
    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind)
            .await
            .with_context(|| format!("binding {}", self.bind))?;
        info!(target: "app.tether", bind = %self.bind, "listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(target: "app.tether", error = %e, "ctrl-c handler failed");
                }
                info!(target: "app.tether", "shutdown signal received");
            })
            .await?;

        self.gate.close();
        self.browser.shutdown().await?;
        info!(target: "app.tether", "shutdown complete");
        Ok(())
    }
}

fn extractor_settings(cfg: &ThreadlineConfig) -> ExtractorSettings {
    ExtractorSettings {
        navigation_timeout: Duration::from_secs(cfg.browser.navigation_timeout_secs),
        step_timeout: Duration::from_secs(cfg.browser.step_timeout_secs),
        settle: Duration::from_millis(cfg.browser.settle_millis),
        scroll_interval: Duration::from_millis(cfg.browser.scroll_interval_millis),
        max_scroll_rounds: cfg.browser.max_scroll_rounds,
        min_block_chars: cfg.extraction.min_block_chars,
        min_viable_chars: cfg.extraction.min_viable_chars,
    }
}
