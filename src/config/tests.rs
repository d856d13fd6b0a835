// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use serde_json::{Map, json};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

#[derive(Debug)]
struct MockConfigProvider {
    values: Map<String, Value>,
    name: String,
}

impl MockConfigProvider {
    fn new(name: &str, values: Value) -> Self {
        Self {
            values: values.as_object().cloned().unwrap_or_default(),
            name: name.to_string(),
        }
    }
}

impl ConfigProvider for MockConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }
}

fn config_from(values: Value) -> Config {
    Config::builder()
        .with_provider(MockConfigProvider::new("mock", values))
        .build()
}

fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_later_provider_wins() {
    let config = Config::builder()
        .with_provider(MockConfigProvider::new(
            "low",
            json!({"server.port": 8080, "server.host": "0.0.0.0"}),
        ))
        .with_provider(MockConfigProvider::new("high", json!({"server.port": 9090})))
        .build();

    assert_eq!(config.get::<u16>("server.port").unwrap(), Some(9090));
    assert_eq!(config.get::<String>("server.host").unwrap().as_deref(), Some("0.0.0.0"));
    assert_eq!(config.get::<String>("server.missing").unwrap(), None);
    assert_eq!(config.provider_names(), vec!["low", "high"]);
}

#[test]
fn test_get_or_default_and_type_errors() {
    let config = config_from(json!({"server.port": "not a number"}));
    assert!(matches!(
        config.get::<u16>("server.port"),
        Err(ConfigError::ParseError(_))
    ));
    assert_eq!(config.get_or_default("server.host", "127.0.0.1".to_string()).unwrap(), "127.0.0.1");
}

#[test]
fn test_file_provider_reads_toml_sections() {
    let file = write_config(
        ".toml",
        r#"
[render]
root_url = "http://example.com"
bots_ua = ["googlebot", "bingbot"]
only = ["/", { pattern = "^/posts" }]
"#,
    );
    let provider = FileConfigProvider::new(file.path().to_str().unwrap()).unwrap();

    assert!(provider.has("render.root_url"));
    assert!(!provider.has("render.service_url"));

    let config = Config::builder().with_provider(provider).build();
    let options = RenderOptions::from_config(&config);
    assert_eq!(options.root_url.as_deref(), Some("http://example.com"));
    assert_eq!(
        options.bots_ua,
        Some(vec!["googlebot".to_string(), "bingbot".to_string()])
    );
    assert_eq!(
        options.only,
        Some(vec![PathRule::from("/"), PathRule::pattern("^/posts")])
    );
}

#[test]
fn test_file_provider_reads_yaml_and_json() {
    let yaml = write_config(".yaml", "render:\n  timeout: 2500\n  sanitize_urls: true\n");
    let config = Config::builder()
        .with_provider(FileConfigProvider::new(yaml.path().to_str().unwrap()).unwrap())
        .build();
    let options = RenderOptions::from_config(&config);
    assert_eq!(options.timeout(), Duration::from_millis(2500));
    assert!(options.sanitize_urls);

    let json = write_config(".json", r#"{"render": {"debug": true}}"#);
    let config = Config::builder()
        .with_provider(FileConfigProvider::new(json.path().to_str().unwrap()).unwrap())
        .build();
    assert_eq!(RenderOptions::from_config(&config).debug, Some(true));
}

#[test]
fn test_file_provider_rejects_unknown_extension_and_bad_content() {
    let ini = write_config(".ini", "a=b");
    assert!(FileConfigProvider::new(ini.path().to_str().unwrap()).is_err());

    let broken = write_config(".json", "{ not json");
    assert!(matches!(
        FileConfigProvider::new(broken.path().to_str().unwrap()),
        Err(ConfigError::ProviderError { .. })
    ));

    assert!(FileConfigProvider::parse("[1, 2]", FileFormat::Json).is_err());
}

#[test]
fn test_from_config_is_lenient() {
    let config = config_from(json!({
        "render.root_url": "http://example.com",
        "render.timeout": "soon",
        "render.bots_ua": "googlebot",
        "render.only": ["/", 42, {"pattern": "^/a"}, {"regex": "^/b"}],
        "render.sanitize_urls": "yes",
    }));

    let options = RenderOptions::from_config(&config);
    assert_eq!(options.root_url.as_deref(), Some("http://example.com"));
    assert_eq!(options.timeout, None);
    assert_eq!(options.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    assert_eq!(options.bots_ua, None);
    assert_eq!(options.only, Some(vec![PathRule::from("/"), PathRule::pattern("^/a")]));
    assert!(!options.sanitize_urls);
}

#[test]
fn test_request_options_read_as_object() {
    let config = config_from(json!({
        "render.request_options": {"headers": {"x-token": "abc"}, "timeout": 100},
    }));
    let options = RenderOptions::from_config(&config);
    assert_eq!(options.request_options["headers"]["x-token"], "abc");
    assert_eq!(options.request_options["timeout"], 100);
}

#[test]
fn test_zero_timeout_uses_default() {
    let options = RenderOptions::default().with_timeout(Duration::ZERO);
    assert_eq!(options.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
}

#[test]
fn test_huge_timeout_saturates() {
    let options = RenderOptions::default().with_timeout(Duration::MAX);
    assert_eq!(options.timeout, Some(u64::MAX));
    assert_eq!(options.timeout(), Duration::from_millis(u64::MAX));
}

#[test]
fn test_normalize_required_url() {
    assert_eq!(
        normalize_required_url("root_url", "ROOT_URL", Some("https://example.com/")).unwrap(),
        "https://example.com"
    );
    assert_eq!(
        normalize_required_url("root_url", "ROOT_URL", Some("HTTP://example.com/app")).unwrap(),
        "HTTP://example.com/app"
    );
    assert!(matches!(
        normalize_required_url("root_url", "ROOT_URL", None),
        Err(ConfigError::MissingUrl { key: "root_url", env: "ROOT_URL" })
    ));
    assert!(matches!(
        normalize_required_url("root_url", "ROOT_URL", Some("")),
        Err(ConfigError::MissingUrl { .. })
    ));
    assert!(matches!(
        normalize_required_url("service_url", "RENDERGATE_SERVICE_URL", Some("ftp://example.com")),
        Err(ConfigError::MalformedUrl { key: "service_url", .. })
    ));
    assert!(matches!(
        normalize_required_url("service_url", "RENDERGATE_SERVICE_URL", Some("http://")),
        Err(ConfigError::MalformedUrl { .. })
    ));
}

#[test]
#[serial]
fn test_env_fallbacks_fill_unset_fields_only() {
    unsafe {
        std::env::set_var("ROOT_URL", "http://from-env.example");
        std::env::remove_var("RENDERGATE_SERVICE_URL");
        std::env::set_var("PRERENDER_SERVICE_URL", "http://legacy-render.example");
        std::env::set_var("RENDERGATE_SERVICE_AUTH", "user:pass");
        std::env::set_var("DEBUG", "TRUE");
    }

    let options = RenderOptions {
        root_url: Some("http://explicit.example".to_string()),
        ..RenderOptions::default()
    }
    .with_env_fallbacks();

    assert_eq!(options.root_url.as_deref(), Some("http://explicit.example"));
    assert_eq!(options.service_url.as_deref(), Some("http://legacy-render.example"));
    assert_eq!(options.auth.as_deref(), Some("user:pass"));
    assert_eq!(options.debug, Some(true));

    unsafe {
        std::env::remove_var("ROOT_URL");
        std::env::remove_var("PRERENDER_SERVICE_URL");
        std::env::remove_var("RENDERGATE_SERVICE_AUTH");
        std::env::remove_var("DEBUG");
    }
}

#[test]
#[serial]
fn test_env_provider_overrides_file() {
    let file = write_config(".yaml", "server:\n  port: 8080\n  host: 0.0.0.0\n");
    unsafe {
        std::env::set_var("RGLAYER_SERVER__PORT", "9191");
    }

    let config = Config::builder()
        .with_provider(FileConfigProvider::new(file.path().to_str().unwrap()).unwrap())
        .with_provider(EnvConfigProvider::new("RGLAYER_"))
        .build();

    assert_eq!(config.get::<u16>("server.port").unwrap(), Some(9191));
    assert_eq!(config.get::<String>("server.host").unwrap().as_deref(), Some("0.0.0.0"));

    unsafe {
        std::env::remove_var("RGLAYER_SERVER__PORT");
    }
}
