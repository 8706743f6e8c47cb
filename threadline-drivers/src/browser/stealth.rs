use super::fingerprint::UserAgentProfile;
use serde_json::{json, Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone)]
/// Launch-time browser settings.
pub struct LaunchOptions {
    pub webdriver_url: String,
    pub binary: Option<PathBuf>,
    pub headless: bool,
    /// Skip images and media to cut memory and load time.
    pub block_media: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            binary: None,
            headless: true,
            block_media: true,
        }
    }
}

/// Chrome command-line arguments for a constrained server environment
/// (no sandbox privileges, tiny /dev/shm, single process).
pub fn build_launch_arguments(opts: &LaunchOptions, profile: &UserAgentProfile) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--single-process".to_string(),
        "--disable-gpu".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-extensions".to_string(),
        format!("--user-agent={}", profile.user_agent),
        format!("--window-size={},{}", profile.viewport.0, profile.viewport.1),
        format!("--lang={}", profile.languages.join(",")),
    ];
    if opts.headless {
        args.push("--headless=new".to_string());
    }
    if opts.block_media {
        args.push("--blink-settings=imagesEnabled=false".to_string());
        args.push("--autoplay-policy=user-gesture-required".to_string());
    }
    args
}

/// `goog:chromeOptions` capability body.
pub fn build_chrome_options(opts: &LaunchOptions, profile: &UserAgentProfile) -> Value {
    let mut chrome = Map::new();
    chrome.insert("args".to_string(), json!(build_launch_arguments(opts, profile)));
    if let Some(binary) = &opts.binary {
        chrome.insert("binary".to_string(), json!(binary.to_string_lossy()));
    }
    if opts.block_media {
        chrome.insert(
            "prefs".to_string(),
            json!({
                "profile.managed_default_content_settings.images": 2,
                "profile.managed_default_content_settings.media_stream": 2,
                "profile.default_content_setting_values.notifications": 2,
            }),
        );
    }
    Value::Object(chrome)
}

/// Script run after each navigation to hide the most common automation signals.
pub fn identity_script() -> &'static str {
    r#"
        Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
        Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
        if (!window.chrome) window.chrome = { runtime: {} };
    "#
}
