// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request URL normalization and rendering-service URL construction.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::ConfigError;

/// Query parameter of the AJAX crawling scheme.
pub const ESCAPED_FRAGMENT: &str = "_escaped_fragment_";

static REPEATED_SLASHES: Lazy<Regex> = Lazy::new(|| Regex::new("/+").expect("static regex"));

/// Decoded value of a non-empty `_escaped_fragment_` parameter.
pub fn escaped_fragment(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == ESCAPED_FRAGMENT)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Resolves inbound request targets against the canonical root and builds
/// the URL sent to the rendering service.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    root_url: String,
    root: Url,
    service_url: String,
    sanitize: bool,
}

impl UrlBuilder {
    /// Both URLs must already be validated and stripped of their trailing slash.
    pub fn new(root_url: String, service_url: String, sanitize: bool) -> Result<Self, ConfigError> {
        let root = Url::parse(&root_url).map_err(|e| ConfigError::MalformedUrl {
            key: "root_url",
            reason: e.to_string(),
        })?;
        Ok(Self {
            root_url,
            root,
            service_url,
            sanitize,
        })
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Resolve a request target (path plus optional query) against the root.
    ///
    /// Returns `None` when the target cannot be parsed; such requests are
    /// never rendered.  A non-empty escaped fragment is appended to the path.
    pub fn resolve_request_url(&self, path_and_query: &str) -> Option<Url> {
        let target = if self.sanitize {
            REPEATED_SLASHES.replace_all(path_and_query, "/")
        } else {
            path_and_query.into()
        };

        let mut url = self.root.join(&target).ok()?;

        if let Some(fragment) = escaped_fragment(url.query()) {
            let base = url.path().trim_end_matches('/');
            let fragment = fragment.strip_prefix('/').unwrap_or(&fragment);
            let path = format!("{base}/{fragment}");
            url.set_path(&path);
        }

        Some(url)
    }

    /// `<service>/?url=<enc(root + "/" + path)>[&bot=<enc(ua)>]`.
    ///
    /// The query string of `resolved` is intentionally not forwarded.
    pub fn build_service_url(&self, resolved: &Url, user_agent: Option<&str>) -> String {
        let path = resolved.path();
        let target = format!("{}/{}", self.root_url, path.strip_prefix('/').unwrap_or(path));

        let mut service_url = format!("{}/?url={}", self.service_url, urlencoding::encode(&target));
        if let Some(agent) = user_agent.filter(|ua| !ua.is_empty()) {
            service_url.push_str("&bot=");
            service_url.push_str(&urlencoding::encode(agent));
        }
        service_url
    }
}
