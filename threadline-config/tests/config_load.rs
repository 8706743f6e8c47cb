use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;
use threadline_config::ThreadlineConfigLoader;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn file_with_env_expansion_and_overrides() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
llm:
  endpoint: "https://llm.internal/v1/chat/completions"
  api_keys: "${TEST_POOL_KEYS}"
  models:
    - "tier-one"
    - "tier-two"
  max_tokens: 512
browser:
  step_timeout_secs: 7
extraction:
  max_concurrent: 2
  link_concurrency: 2
"#;
    let p = write_yaml(&tmp, "threadline.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("TEST_POOL_KEYS", Some("key-a,key-b, key-c")),
            ("THREADLINE__SERVER__BIND", Some("127.0.0.1:8088")),
            ("THREADLINE__BROWSER__HEADLESS", Some("false")),
        ],
        || {
            let config = ThreadlineConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load service config");

            assert_eq!(config.llm.api_keys, vec!["key-a", "key-b", "key-c"]);
            assert_eq!(config.llm.models, vec!["tier-one", "tier-two"]);
            assert_eq!(config.llm.max_tokens, 512);
            assert_eq!(config.extraction.max_concurrent, 2);
            assert_eq!(config.server.bind, "127.0.0.1:8088");
            assert!(!config.browser.headless);
            assert_eq!(config.browser.step_timeout_secs, 7);
            assert_eq!(config.browser.navigation_timeout_secs, 45);
            assert!(config.validate().is_ok());
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_env() {
    let tmp = TempDir::new().unwrap();
    let absent = tmp.path().join("nope.yaml");

    temp_env::with_vars(
        [
            ("THREADLINE__LLM__API_KEYS", Some("only-key")),
            ("THREADLINE__LLM__MODELS", Some("m1,m2,m3")),
        ],
        || {
            let config = ThreadlineConfigLoader::new()
                .with_optional_file(&absent)
                .load()
                .expect("env-only config");

            assert_eq!(config.llm.api_keys, vec!["only-key"]);
            assert_eq!(config.llm.models, vec!["m1", "m2", "m3"]);
            assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
            assert_eq!(config.browser.step_timeout_secs, 15);
        },
    );
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let absent = tmp.path().join("nope.yaml");

    let result = ThreadlineConfigLoader::new().with_file(absent).load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn unset_key_variable_fails_validation() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "threadline.yaml",
        "llm:\n  api_keys: \"${THREADLINE_TEST_UNSET_KEYS}\"\n",
    );

    temp_env::with_vars([("THREADLINE_TEST_UNSET_KEYS", None::<&str>)], || {
        let config = ThreadlineConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load leaves unknown variables literal");

        assert_eq!(config.llm.api_keys, vec!["${THREADLINE_TEST_UNSET_KEYS}"]);
        assert!(config.validate().is_err());
    });
}
