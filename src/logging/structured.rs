// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! slog backend and per-request log context.

use log::LevelFilter;
use slog::{Drain, Logger, o};
use slog_async::Async;
use slog_json::Json;
use slog_term::{FullFormat, TermDecorator};
use std::io;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LogFormat,
    pub level: slog::Level,
    pub static_fields: Vec<(String, String)>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            level: slog::Level::Info,
            static_fields: Vec::new(),
        }
    }
}

pub(crate) fn slog_level(level: LevelFilter) -> slog::Level {
    match level {
        LevelFilter::Trace => slog::Level::Trace,
        LevelFilter::Debug => slog::Level::Debug,
        LevelFilter::Info => slog::Level::Info,
        LevelFilter::Warn => slog::Level::Warning,
        LevelFilter::Error | LevelFilter::Off => slog::Level::Error,
    }
}

/// Build a root logger for `config`.
pub fn create_logger(config: &LoggerConfig) -> Logger {
    let logger = match config.format {
        LogFormat::Terminal => {
            let decorator = TermDecorator::new().build();
            let drain = FullFormat::new(decorator).build().fuse();
            let drain = drain.filter_level(config.level).fuse();
            Logger::root(Async::new(drain).build().fuse(), o!())
        }
        LogFormat::Json => {
            let drain = Json::new(io::stdout()).add_default_keys().build().fuse();
            let drain = drain.filter_level(config.level).fuse();
            Logger::root(Async::new(drain).build().fuse(), o!())
        }
    };

    config
        .static_fields
        .iter()
        .fold(logger, |logger, (key, value)| {
            // slog keys are 'static; static fields are installed once per process.
            let key: &'static str = Box::leak(key.clone().into_boxed_str());
            logger.new(o!(key => value.clone()))
        })
}

/// Keeps the global slog logger installed while alive.
pub struct LoggerGuard {
    _guard: slog_scope::GlobalLoggerGuard,
}

pub fn init_global_logger(config: &LoggerConfig) -> LoggerGuard {
    let guard = slog_scope::set_global_logger(create_logger(config));
    LoggerGuard { _guard: guard }
}

/// Per-request context carried through the server's log lines.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub trace_id: String,
    pub method: String,
    pub path: String,
    pub remote_addr: String,
    pub user_agent: String,
    started: Instant,
}

impl RequestInfo {
    pub fn new(method: String, path: String, remote_addr: String, user_agent: String) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            method,
            path,
            remote_addr,
            user_agent,
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}
