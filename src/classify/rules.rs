// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Path rules: static-extension exclusion, allow rules and deny rules.

use regex::Regex;

use crate::config::RenderOptions;
use crate::patterns::{self, CompiledRule};

/// Decides from a normalized path whether rendering is permitted.
///
/// Evaluation order, highest priority first:
///
/// 1. static-extension match → never rendered;
/// 2. allow-pattern, when configured, decides eligibility;
/// 3. otherwise the allow-list is scanned, first match wins;
/// 4. a deny match overrides whatever the allow rules said.
///
/// Without any allow rule every path is eligible.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    static_ext: Regex,
    allow_pattern: Option<Regex>,
    allow_list: Option<Vec<CompiledRule>>,
    deny_pattern: Option<Regex>,
}

impl RuleEngine {
    pub fn new(
        static_ext: Regex,
        allow_pattern: Option<Regex>,
        allow_list: Option<Vec<CompiledRule>>,
        deny_pattern: Option<Regex>,
    ) -> Self {
        Self {
            static_ext,
            allow_pattern,
            allow_list,
            deny_pattern,
        }
    }

    /// Compile the rule set described by `options`.
    pub fn from_options(options: &RenderOptions) -> Self {
        Self::new(
            patterns::static_extensions(options.static_ext.as_deref()),
            patterns::optional("only_re", options.only_re.as_deref()),
            patterns::allow_list(options.only.as_deref()),
            patterns::deny_list(options.ignore.as_deref()),
        )
    }

    pub fn is_static(&self, path: &str) -> bool {
        self.static_ext.is_match(path)
    }

    pub fn classify_path(&self, path: &str) -> bool {
        if self.is_static(path) {
            return false;
        }

        let mut eligible = true;
        let mut granted = false;

        if let Some(allow) = &self.allow_pattern {
            granted = allow.is_match(path);
            eligible = granted;
        }

        if !granted {
            if let Some(rules) = &self.allow_list {
                eligible = rules.iter().any(|rule| rule.matches(path));
            }
        }

        if self.deny_pattern.as_ref().is_some_and(|deny| deny.is_match(path)) {
            return false;
        }

        eligible
    }
}
