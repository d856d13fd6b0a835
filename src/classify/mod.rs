// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request classification.
//!
//! A request is eligible for rendering when it is a GET or HEAD from a
//! crawler (matching User-Agent, or carrying `_escaped_fragment_`), its
//! target resolves against the root URL, and its normalized path passes the
//! [`RuleEngine`].

mod bots;
mod rules;
mod target;


pub use bots::BotMatcher;
pub use rules::RuleEngine;
pub use target::{ESCAPED_FRAGMENT, UrlBuilder, escaped_fragment};

use url::Url;

use crate::config::RenderOptions;
use crate::core::InboundRequest;
use crate::patterns;

/// Outcome of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub eligible: bool,
    /// Resolved request URL, absent when the target did not parse.
    pub url: Option<Url>,
    pub escaped_fragment: Option<String>,
}

impl ClassificationResult {
    fn ineligible(url: Option<Url>, escaped_fragment: Option<String>) -> Self {
        Self {
            eligible: false,
            url,
            escaped_fragment,
        }
    }

    pub fn normalized_path(&self) -> Option<&str> {
        self.url.as_ref().map(Url::path)
    }
}

/// Combines bot detection, URL resolution and path rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    bots: BotMatcher,
    rules: RuleEngine,
    urls: UrlBuilder,
}

impl Classifier {
    pub fn new(bots: BotMatcher, rules: RuleEngine, urls: UrlBuilder) -> Self {
        Self { bots, rules, urls }
    }

    /// Compile a classifier from options whose URLs are already validated.
    pub(crate) fn from_options(
        options: &RenderOptions,
        root_url: String,
        service_url: String,
    ) -> Result<Self, crate::config::ConfigError> {
        Ok(Self::new(
            BotMatcher::new(patterns::bot_signatures(options.bots_ua.as_deref())),
            RuleEngine::from_options(options),
            UrlBuilder::new(root_url, service_url, options.sanitize_urls)?,
        ))
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    pub fn classify(&self, request: &InboundRequest) -> ClassificationResult {
        let query = request.query();
        let fragment = escaped_fragment(query);

        if !self
            .bots
            .is_crawler_request(&request.method, request.user_agent(), query)
        {
            return ClassificationResult::ineligible(None, fragment);
        }

        let Some(url) = self.urls.resolve_request_url(request.path_and_query()) else {
            return ClassificationResult::ineligible(None, fragment);
        };

        let eligible = self.rules.classify_path(url.path());
        ClassificationResult {
            eligible,
            url: Some(url),
            escaped_fragment: fragment,
        }
    }
}
