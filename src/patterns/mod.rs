// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pattern compiler.
//!
//! Every configured list is turned into a [`Regex`] exactly once, when the
//! gate is built.  Bad optional input never fails construction: the
//! offending option is reported and replaced by its documented default
//! (or dropped, for options without one).

pub mod defaults;


use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::config::PathRule;
use crate::warn_fmt;

/// Characters allowed in the optional query string after a static extension.
const QUERY_TAIL: &str = r"(?:\?[a-zA-Z0-9\-._~:/#\[\]@!$&'()*+,;=]*)?$";

static DEFAULT_BOTS: Lazy<Regex> = Lazy::new(|| {
    alternation(defaults::BOT_SIGNATURES, false, true).expect("built-in bot list compiles")
});

static DEFAULT_IGNORED_HEADERS: Lazy<Regex> = Lazy::new(|| {
    alternation(defaults::IGNORED_HEADERS, true, true).expect("built-in header list compiles")
});

static DEFAULT_STATIC_EXT: Lazy<Regex> = Lazy::new(|| {
    let source = format!(r"\.(?:{}){}", defaults::STATIC_EXTENSIONS.join("|"), QUERY_TAIL);
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .expect("built-in extension pattern compiles")
});

/// Join `entries` into one alternation, optionally anchored to the whole input.
pub fn alternation<S: AsRef<str>>(
    entries: &[S],
    anchored: bool,
    case_insensitive: bool,
) -> Result<Regex, regex::Error> {
    let joined = entries.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("|");
    let source = if anchored {
        format!("^(?:{joined})$")
    } else {
        joined
    };
    RegexBuilder::new(&source)
        .case_insensitive(case_insensitive)
        .build()
}

/// Bot-signature matcher.  `None` means "no User-Agent is a bot"; that only
/// happens when the caller configures an empty list.
pub fn bot_signatures(configured: Option<&[String]>) -> Option<Regex> {
    let Some(entries) = configured else {
        return Some(DEFAULT_BOTS.clone());
    };
    if entries.is_empty() {
        warn_fmt!("Patterns", "`bots_ua` is empty, only escaped-fragment requests will be rendered");
        return None;
    }
    match alternation(entries, false, true) {
        Ok(re) => Some(re),
        Err(e) => {
            warn_fmt!("Patterns", "`bots_ua` does not compile ({}), falling back to defaults", e);
            Some(DEFAULT_BOTS.clone())
        }
    }
}

/// Header-name matcher, anchored and case-insensitive.
pub fn ignored_headers(configured: Option<&[String]>) -> Regex {
    let Some(entries) = configured else {
        return DEFAULT_IGNORED_HEADERS.clone();
    };
    match alternation(entries, true, true) {
        Ok(re) => re,
        Err(e) => {
            warn_fmt!("Patterns", "`ignored_headers` does not compile ({}), falling back to defaults", e);
            DEFAULT_IGNORED_HEADERS.clone()
        }
    }
}

/// Static-extension matcher.  A custom pattern is compiled case-insensitively.
pub fn static_extensions(configured: Option<&str>) -> Regex {
    let Some(source) = configured else {
        return DEFAULT_STATIC_EXT.clone();
    };
    match RegexBuilder::new(source).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            warn_fmt!("Patterns", "`static_ext` does not compile ({}), falling back to defaults", e);
            DEFAULT_STATIC_EXT.clone()
        }
    }
}

/// Optional single pattern such as the allow-pattern; dropped when invalid.
pub fn optional(name: &str, configured: Option<&str>) -> Option<Regex> {
    let source = configured?;
    match Regex::new(source) {
        Ok(re) => Some(re),
        Err(e) => {
            warn_fmt!("Patterns", "`{}` does not compile ({}), rules are ignored", name, e);
            None
        }
    }
}

/// Deny-list entries joined into one unanchored pattern.
pub fn deny_list(configured: Option<&[String]>) -> Option<Regex> {
    let entries = configured.filter(|e| !e.is_empty())?;
    match alternation(entries, false, false) {
        Ok(re) => Some(re),
        Err(e) => {
            warn_fmt!("Patterns", "`ignore` does not compile ({}), rules are ignored", e);
            None
        }
    }
}

/// A compiled allow-list entry.
#[derive(Debug, Clone)]
pub enum CompiledRule {
    Exact(String),
    Pattern(Regex),
}

impl CompiledRule {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            CompiledRule::Exact(literal) => literal == path,
            CompiledRule::Pattern(re) => re.is_match(path),
        }
    }
}

/// Compile the allow-list, skipping patterns that fail to compile.
pub fn allow_list(configured: Option<&[PathRule]>) -> Option<Vec<CompiledRule>> {
    let rules = configured?;
    let compiled = rules
        .iter()
        .filter_map(|rule| match rule {
            PathRule::Exact(path) => Some(CompiledRule::Exact(path.clone())),
            PathRule::Pattern { pattern } => match Regex::new(pattern) {
                Ok(re) => Some(CompiledRule::Pattern(re)),
                Err(e) => {
                    warn_fmt!("Patterns", "`only` rule /{}/ does not compile ({}), rule ignored", pattern, e);
                    None
                }
            },
        })
        .collect();
    Some(compiled)
}
