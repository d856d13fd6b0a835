// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging setup for rendergate.
//!
//! Everything in the crate logs through the `log` facade, usually via the
//! `*_fmt!` macros which prefix each message with its component.  The
//! backend is either `env_logger` or, when `logging.structured` is set,
//! a `slog` drain fed through `slog_stdlog`.

pub mod config;
pub mod structured;
#[cfg(test)]
pub mod test_logger;
mod wrapper;

#[cfg(test)]
mod tests;

use log::{LevelFilter, error, info};
use once_cell::sync::OnceCell;
use std::env;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use self::config::LoggingConfig;
use self::structured::LoggerGuard;

static INIT: Once = Once::new();
static STRUCTURED_GUARD: OnceCell<LoggerGuard> = OnceCell::new();
static USING_STRUCTURED: AtomicBool = AtomicBool::new(false);

/// Map a textual level onto a [`LevelFilter`]; unknown values map to `Info`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Level requested through `RUST_LOG_LEVEL`, if any.
pub fn level_from_env() -> Option<LevelFilter> {
    env::var("RUST_LOG_LEVEL").ok().map(|level| parse_level(&level))
}

/// Install `env_logger` at `level`.  Only the first call has an effect.
pub fn init(level: Option<LevelFilter>) {
    INIT.call_once(|| {
        let filter = level.unwrap_or(LevelFilter::Info).to_string().to_lowercase();
        let env = env_logger::Env::default().filter_or("RUST_LOG", filter);

        let installed = env_logger::Builder::from_env(env)
            .format_timestamp_millis()
            .format_target(true)
            .try_init();

        if installed.is_ok() {
            info!("Logging initialized at level: {}", log::max_level());
        }
    });
}

/// Install the backend described by `config`.  `level` overrides the
/// configured level when given.
pub fn init_with_config(level: Option<LevelFilter>, config: &LoggingConfig) {
    if !config.structured {
        init(level.or_else(|| Some(parse_level(&config.level))));
        return;
    }

    INIT.call_once(|| {
        let mut logger_config = config.to_logger_config();
        let filter = level.unwrap_or_else(|| parse_level(&config.level));
        if let Some(level) = level {
            logger_config.level = structured::slog_level(level);
        }

        let guard = structured::init_global_logger(&logger_config);
        let _ = STRUCTURED_GUARD.set(guard);

        match filter.to_level() {
            Some(level) => {
                if let Err(e) = slog_stdlog::init_with_level(level) {
                    eprintln!("failed to bridge log to slog: {e}");
                    return;
                }
            }
            None => log::set_max_level(LevelFilter::Off),
        }

        USING_STRUCTURED.store(true, Ordering::SeqCst);
        info!("Structured logging initialized ({:?})", logger_config.format);
    });
}

/// Whether the structured backend is active.
pub fn is_structured() -> bool {
    USING_STRUCTURED.load(Ordering::SeqCst)
}

/// Log an error with context and return it.
pub fn log_error<E: std::fmt::Display>(context: &str, err: E) -> E {
    error!("{}: {}", context, err);
    err
}
