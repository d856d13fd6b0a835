// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crawler detection.

use regex::Regex;
use reqwest::Method;

use super::target::escaped_fragment;

/// Recognises crawler traffic from method, User-Agent and query string.
#[derive(Debug, Clone)]
pub struct BotMatcher {
    signatures: Option<Regex>,
}

impl BotMatcher {
    /// `None` disables User-Agent matching entirely.
    pub fn new(signatures: Option<Regex>) -> Self {
        Self { signatures }
    }

    pub fn matches_user_agent(&self, user_agent: &str) -> bool {
        self.signatures
            .as_ref()
            .is_some_and(|re| re.is_match(user_agent))
    }

    /// Only GET and HEAD qualify.  A non-empty `_escaped_fragment_` marks
    /// the request as a crawler regardless of its User-Agent.
    pub fn is_crawler_request(
        &self,
        method: &Method,
        user_agent: Option<&str>,
        query: Option<&str>,
    ) -> bool {
        if method != Method::GET && method != Method::HEAD {
            return false;
        }

        self.matches_user_agent(user_agent.unwrap_or_default()) || escaped_fragment(query).is_some()
    }
}
