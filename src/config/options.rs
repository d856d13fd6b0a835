// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Options accepted by [`RenderGate::new`](crate::RenderGate::new).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::time::Duration;

use super::{Config, ConfigError};
use crate::warn_fmt;

static PROTO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").expect("static regex"));

/// One allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathRule {
    /// The normalized path must equal this string.
    Exact(String),
    /// The normalized path must match this regular expression.
    Pattern { pattern: String },
}

impl PathRule {
    /// Shorthand for a pattern entry.
    pub fn pattern(source: impl Into<String>) -> Self {
        PathRule::Pattern { pattern: source.into() }
    }

    /// Interpret a raw configuration entry; anything that is neither a
    /// string nor an object with a string `pattern` is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(path) => Some(PathRule::Exact(path.clone())),
            Value::Object(map) => map
                .get("pattern")
                .and_then(Value::as_str)
                .map(PathRule::pattern),
            _ => None,
        }
    }
}

impl From<&str> for PathRule {
    fn from(path: &str) -> Self {
        PathRule::Exact(path.to_string())
    }
}

/// Raw, unvalidated configuration of a render gate.
///
/// Every field is optional; unset fields fall back to the environment
/// (URLs, auth, debug) or to the built-in defaults (lists and patterns).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    pub root_url: Option<String>,
    pub service_url: Option<String>,
    /// `user:pass` sent as Basic auth to the rendering service.
    pub auth: Option<String>,
    pub bots_ua: Option<Vec<String>>,
    pub ignored_headers: Option<Vec<String>>,
    pub only: Option<Vec<PathRule>>,
    pub only_re: Option<String>,
    pub ignore: Option<Vec<String>>,
    pub static_ext: Option<String>,
    /// Upstream timeout in milliseconds.
    pub timeout: Option<u64>,
    #[serde(default)]
    pub sanitize_urls: bool,
    #[serde(default)]
    pub request_options: Map<String, Value>,
    pub debug: Option<bool>,
}

/// Default upstream timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 180_000;

impl RenderOptions {
    pub fn new(root_url: impl Into<String>, service_url: impl Into<String>) -> Self {
        Self {
            root_url: Some(root_url.into()),
            service_url: Some(service_url.into()),
            ..Self::default()
        }
    }

    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn with_bots(mut self, bots: Vec<String>) -> Self {
        self.bots_ua = Some(bots);
        self
    }

    pub fn with_ignored_headers(mut self, headers: Vec<String>) -> Self {
        self.ignored_headers = Some(headers);
        self
    }

    pub fn with_only(mut self, rules: Vec<PathRule>) -> Self {
        self.only = Some(rules);
        self
    }

    pub fn with_only_re(mut self, pattern: impl Into<String>) -> Self {
        self.only_re = Some(pattern.into());
        self
    }

    pub fn with_ignore(mut self, rules: Vec<String>) -> Self {
        self.ignore = Some(rules);
        self
    }

    pub fn with_static_ext(mut self, pattern: impl Into<String>) -> Self {
        self.static_ext = Some(pattern.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_sanitize_urls(mut self, sanitize: bool) -> Self {
        self.sanitize_urls = sanitize;
        self
    }

    pub fn with_request_options(mut self, overrides: Map<String, Value>) -> Self {
        self.request_options = overrides;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Effective upstream timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.filter(|ms| *ms > 0).unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Read the `render` section of a layered configuration.
    ///
    /// Values of the wrong shape are reported and left unset so the
    /// documented default applies.
    pub fn from_config(config: &Config) -> Self {
        let only = lenient::<Vec<Value>>(config, "render.only").map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let rule = PathRule::from_value(entry);
                    if rule.is_none() {
                        warn_fmt!(
                            "Config",
                            "`render.only` rule {} is neither a path nor a pattern, rule ignored",
                            entry
                        );
                    }
                    rule
                })
                .collect()
        });

        Self {
            root_url: lenient(config, "render.root_url"),
            service_url: lenient(config, "render.service_url"),
            auth: lenient(config, "render.auth"),
            bots_ua: lenient(config, "render.bots_ua"),
            ignored_headers: lenient(config, "render.ignored_headers"),
            only,
            only_re: lenient(config, "render.only_re"),
            ignore: lenient(config, "render.ignore"),
            static_ext: lenient(config, "render.static_ext"),
            timeout: lenient(config, "render.timeout"),
            sanitize_urls: lenient(config, "render.sanitize_urls").unwrap_or(false),
            request_options: lenient(config, "render.request_options").unwrap_or_default(),
            debug: lenient(config, "render.debug"),
        }
    }

    /// Fill unset URLs, auth and debug from the process environment.
    pub fn with_env_fallbacks(mut self) -> Self {
        if self.root_url.is_none() {
            self.root_url = first_env(&["ROOT_URL"]);
        }
        if self.service_url.is_none() {
            self.service_url = first_env(&["RENDERGATE_SERVICE_URL", "PRERENDER_SERVICE_URL"]);
        }
        if self.auth.is_none() {
            self.auth = first_env(&["RENDERGATE_SERVICE_AUTH", "PRERENDER_SERVICE_AUTH"]);
        }
        if self.debug.is_none() {
            self.debug = env::var("DEBUG").ok().map(|v| v.eq_ignore_ascii_case("true"));
        }
        self
    }
}

fn lenient<T: serde::de::DeserializeOwned>(config: &Config, key: &str) -> Option<T> {
    match config.get::<T>(key) {
        Ok(value) => value,
        Err(e) => {
            warn_fmt!("Config", "`{}` is invalid ({}), falling back to default", key, e);
            None
        }
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.is_empty())
}

/// Validate a required URL and strip one trailing and one leading slash.
pub(crate) fn normalize_required_url(
    key: &'static str,
    env: &'static str,
    value: Option<&str>,
) -> Result<String, ConfigError> {
    let raw = value
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingUrl { key, env })?;

    if !PROTO_RE.is_match(raw) {
        return Err(ConfigError::MalformedUrl {
            key,
            reason: "must start with http:// or https://".to_string(),
        });
    }

    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);

    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::MalformedUrl {
        key,
        reason: e.to_string(),
    })?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::MalformedUrl {
            key,
            reason: "missing host".to_string(),
        });
    }

    Ok(trimmed.to_string())
}
