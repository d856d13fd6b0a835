// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug)]
struct MockConfigProvider {
    values: HashMap<String, Value>,
}

impl MockConfigProvider {
    fn new(entries: &[(&str, Value)]) -> Self {
        Self {
            values: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}

impl ConfigProvider for MockConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }
}

fn base_provider() -> MockConfigProvider {
    MockConfigProvider::new(&[
        ("render.root_url", json!("http://example.com")),
        ("render.service_url", json!("http://render.local:3000/")),
        ("server.port", json!(8181)),
        ("server.origin", json!("http://localhost:3000")),
    ])
}

#[tokio::test]
async fn test_loader_builds_from_provider() {
    let proxy = RenderProxy::loader()
        .with_provider(base_provider())
        .build()
        .await
        .unwrap();

    assert_eq!(proxy.gate().root_url(), "http://example.com");
    assert_eq!(proxy.gate().service_url(), "http://render.local:3000");
    assert_eq!(proxy.server().config().port, 8181);
    assert_eq!(proxy.server().config().host, "127.0.0.1");
    assert_eq!(proxy.config().provider_names(), vec!["mock"]);
}

#[tokio::test]
async fn test_later_providers_win() {
    let proxy = RenderProxy::loader()
        .with_provider(base_provider())
        .with_provider(MockConfigProvider::new(&[("server.port", json!(9000))]))
        .build()
        .await
        .unwrap();

    assert_eq!(proxy.server().config().port, 9000);
    assert_eq!(
        proxy.server().config().origin.as_deref(),
        Some("http://localhost:3000")
    );
}

#[tokio::test]
async fn test_missing_origin_without_fallback_fails() {
    let provider = MockConfigProvider::new(&[
        ("render.root_url", json!("http://example.com")),
        ("render.service_url", json!("http://render.local:3000")),
    ]);

    let err = RenderProxy::loader().with_provider(provider).build().await.unwrap_err();
    assert!(matches!(err, LoaderError::Other(_)));
}

#[tokio::test]
async fn test_malformed_service_url_fails() {
    let provider = MockConfigProvider::new(&[
        ("render.root_url", json!("http://example.com")),
        ("render.service_url", json!("render.local")),
        ("server.origin", json!("http://localhost:3000")),
    ]);

    let err = RenderProxy::loader().with_provider(provider).build().await.unwrap_err();
    assert!(matches!(err, LoaderError::ConfigError(ref e) if e.is_url_error()));
}

#[tokio::test]
async fn test_loader_reads_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[render]
root_url = "https://shop.example"
service_url = "https://render.example"
timeout = 5000
ignore = ["/cart"]

[server]
port = 8282
origin = "http://127.0.0.1:3000"
"#
    )
    .unwrap();

    let proxy = RenderProxy::loader()
        .with_config_file(file.path().to_str().unwrap())
        .build()
        .await
        .unwrap();

    assert_eq!(proxy.gate().root_url(), "https://shop.example");
    assert_eq!(proxy.gate().timeout(), std::time::Duration::from_secs(5));
    assert_eq!(proxy.server().config().port, 8282);
}

#[tokio::test]
async fn test_missing_config_file_fails() {
    let err = RenderProxy::loader()
        .with_config_file("/nonexistent/rendergate.toml")
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, LoaderError::ConfigError(_)));
}
