//! Loader for service configuration with YAML + environment overlays.
//!
//! Sources are merged in this order (later wins):
//!
//! 1. serde defaults on every field,
//! 2. an optional or required YAML/TOML/JSON file,
//! 3. inline snippets added with [`ThreadlineConfigLoader::with_yaml_str`],
//! 4. `THREADLINE__SECTION__KEY` environment variables.
//!
//! After merging, every string is run through `${VAR}` expansion so secrets can
//! stay out of the file (`api_keys: "${GROQ_KEYS}"`). Configuration is read once
//! at process start; there is no reload.
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadlineConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub extraction: ExtractionSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// Remote completion endpoint, credential pool and model tiers.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    /// Ordered credential pool. Accepts a comma-separated string or a list.
    #[serde(default, deserialize_with = "comma_list")]
    pub api_keys: Vec<String>,
    /// Model tiers, most capable first. Accepts a comma-separated string or a list.
    #[serde(default = "default_models", deserialize_with = "comma_list")]
    pub models: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_json_temperature")]
    pub json_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_keys: Vec::new(),
            models: default_models(),
            temperature: default_temperature(),
            json_temperature: default_json_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// How the controllable browser is reached and driven.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Browser executable; discovery is left to the WebDriver service when unset.
    #[serde(default)]
    pub binary: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Skip images, fonts and media while loading pages.
    #[serde(default = "default_true")]
    pub block_media: bool,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// Bound on each in-page step after navigation (title, scroll, harvest).
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
    #[serde(default = "default_scroll_interval_millis")]
    pub scroll_interval_millis: u64,
    #[serde(default = "default_max_scroll_rounds")]
    pub max_scroll_rounds: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            binary: None,
            headless: true,
            block_media: true,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            step_timeout_secs: default_step_timeout_secs(),
            settle_millis: default_settle_millis(),
            scroll_interval_millis: default_scroll_interval_millis(),
            max_scroll_rounds: default_max_scroll_rounds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSettings {
    /// Ceiling of the concurrency gate in front of the shared browser.
    #[serde(default = "default_one")]
    pub max_concurrent: usize,
    /// How many links of one request are extracted at once (1 = sequential).
    #[serde(default = "default_one")]
    pub link_concurrency: usize,
    #[serde(default = "default_min_block_chars")]
    pub min_block_chars: usize,
    #[serde(default = "default_min_viable_chars")]
    pub min_viable_chars: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_boilerplate")]
    pub boilerplate: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            link_concurrency: 1,
            min_block_chars: default_min_block_chars(),
            min_viable_chars: default_min_viable_chars(),
            max_chars: default_max_chars(),
            boilerplate: default_boilerplate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

fn default_llm_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".into()
}
fn default_models() -> Vec<String> {
    vec![
        "llama-3.3-70b-versatile".into(),
        "llama-3.1-8b-instant".into(),
    ]
}
fn default_temperature() -> f32 {
    0.7
}
fn default_json_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_true() -> bool {
    true
}
fn default_one() -> usize {
    1
}
fn default_navigation_timeout_secs() -> u64 {
    45
}
fn default_step_timeout_secs() -> u64 {
    15
}
fn default_settle_millis() -> u64 {
    2500
}
fn default_scroll_interval_millis() -> u64 {
    600
}
fn default_max_scroll_rounds() -> u32 {
    20
}
fn default_min_block_chars() -> usize {
    20
}
fn default_min_viable_chars() -> usize {
    200
}
fn default_max_chars() -> usize {
    15_000
}
fn default_boilerplate() -> Vec<String> {
    [
        "By messaging ChatGPT, you agree to our Terms and have read our Privacy Policy.",
        "ChatGPT can make mistakes. Check important info.",
        "Claude can make mistakes. Please double-check responses.",
        "Gemini may display inaccurate info, including about people, so double-check its responses.",
        "Log in",
        "Sign up",
        "Sign in",
        "Get started",
        "Continue this conversation",
        "Report conversation",
        "Terms of use",
        "Privacy policy",
        "Skip to content",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_bind() -> String {
    "0.0.0.0:3000".into()
}
fn default_log_level() -> String {
    "info".into()
}

/// Accept either `"a, b,c"` or `["a", "b", "c"]`; trims, drops empties and
/// repeated entries while keeping the first occurrence's position.
fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    let items = match Raw::deserialize(deserializer)? {
        Raw::One(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
        Raw::Many(v) => v,
    };
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    Ok(out)
}

impl ThreadlineConfig {
    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.llm.api_keys.is_empty() {
            return Err(LoadError::Invalid(
                "llm.api_keys must name at least one credential".into(),
            ));
        }
        if let Some(i) = self.llm.api_keys.iter().position(|k| k.contains("${")) {
            return Err(LoadError::Invalid(format!(
                "llm.api_keys[{i}] references an unset environment variable"
            )));
        }
        if self.browser.navigation_timeout_secs == 0 || self.browser.step_timeout_secs == 0 {
            return Err(LoadError::Invalid(
                "browser timeouts must be at least 1 second".into(),
            ));
        }
        if self.llm.models.is_empty() {
            return Err(LoadError::Invalid(
                "llm.models must name at least one model".into(),
            ));
        }
        if self.extraction.max_concurrent == 0 || self.extraction.link_concurrency == 0 {
            return Err(LoadError::Invalid(
                "extraction concurrency settings must be at least 1".into(),
            ));
        }
        if self.extraction.min_viable_chars > self.extraction.max_chars {
            return Err(LoadError::Invalid(format!(
                "extraction.min_viable_chars ({}) exceeds extraction.max_chars ({})",
                self.extraction.min_viable_chars, self.extraction.max_chars
            )));
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct ThreadlineConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ThreadlineConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadlineConfigLoader {
    /// Start from defaults; `THREADLINE__` env overrides are applied last.
    ///
    /// ```
    /// use threadline_config::ThreadlineConfigLoader;
    ///
    /// let config = ThreadlineConfigLoader::new()
    ///     .with_yaml_str("llm:\n  api_keys: \"k1,k2\"")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.llm.api_keys, vec!["k1", "k2"]);
    /// assert_eq!(config.extraction.max_concurrent, 1);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so container deployments can rely
    /// purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use threadline_config::ThreadlineConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_GROQ_KEYS", "alpha,beta"); }
    ///
    /// let config = ThreadlineConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   api_keys: "${DOCTEST_GROQ_KEYS}"
    ///   models: ["big-model", "small-model"]
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.llm.api_keys, vec!["alpha", "beta"]);
    /// assert_eq!(config.llm.models[0], "big-model");
    ///
    /// unsafe { std::env::remove_var("DOCTEST_GROQ_KEYS"); }
    /// ```
    pub fn load(self) -> Result<ThreadlineConfig, LoadError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("THREADLINE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| LoadError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${STATE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST}"));
    }

    #[test]
    fn comma_list_trims_and_dedups() {
        #[derive(Deserialize)]
        struct Keys {
            #[serde(deserialize_with = "comma_list")]
            keys: Vec<String>,
        }
        let p: Keys = serde_json::from_value(json!({"keys": " a, b ,,a,c "})).unwrap();
        assert_eq!(p.keys, vec!["a", "b", "c"]);
        let p: Keys = serde_json::from_value(json!({"keys": ["x", " y", "x"]})).unwrap();
        assert_eq!(p.keys, vec!["x", "y"]);
    }

    #[test]
    fn validate_rejects_empty_pool_and_inverted_bounds() {
        let mut cfg = ThreadlineConfig::default();
        assert!(cfg.validate().is_err());

        cfg.llm.api_keys = vec!["k".into()];
        assert!(cfg.validate().is_ok());

        cfg.extraction.min_viable_chars = cfg.extraction.max_chars + 1;
        assert!(matches!(cfg.validate(), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_unexpanded_credentials() {
        let mut cfg = ThreadlineConfig::default();
        cfg.llm.api_keys = vec!["gsk_real".into(), "${GROQ_KEYS}".into()];

        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("api_keys[1]"), "{err}");
        assert!(!err.contains("GROQ_KEYS"), "{err}");
    }

    #[test]
    fn validate_rejects_zero_step_timeout() {
        let mut cfg = ThreadlineConfig::default();
        cfg.llm.api_keys = vec!["k".into()];
        cfg.browser.step_timeout_secs = 0;
        assert!(matches!(cfg.validate(), Err(LoadError::Invalid(_))));
    }
}
