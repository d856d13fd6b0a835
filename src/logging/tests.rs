// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::config::LoggingConfig;
use super::structured::{LogFormat, RequestInfo, create_logger};
use super::*;
use crate::logging::test_logger;
use serial_test::serial;

#[test]
fn test_parse_level() {
    assert_eq!(parse_level("TRACE"), LevelFilter::Trace);
    assert_eq!(parse_level("debug"), LevelFilter::Debug);
    assert_eq!(parse_level("warning"), LevelFilter::Warn);
    assert_eq!(parse_level("error"), LevelFilter::Error);
    assert_eq!(parse_level("off"), LevelFilter::Off);
    assert_eq!(parse_level("verbose"), LevelFilter::Info);
}

#[test]
#[serial]
fn test_level_from_env() {
    unsafe {
        env::set_var("RUST_LOG_LEVEL", "debug");
    }
    assert_eq!(level_from_env(), Some(LevelFilter::Debug));
    unsafe {
        env::remove_var("RUST_LOG_LEVEL");
    }
    assert_eq!(level_from_env(), None);
}

#[test]
fn test_logging_config_defaults_from_yaml() {
    let config: LoggingConfig = serde_yaml::from_str("structured: true\nformat: json\n").unwrap();
    assert!(config.structured);
    assert_eq!(config.level, "info");
    assert!(config.static_fields.is_empty());

    let logger_config = config.to_logger_config();
    assert_eq!(logger_config.format, LogFormat::Json);
    assert_eq!(logger_config.level, slog::Level::Info);
}

#[test]
fn test_static_fields_are_carried_over() {
    let mut config = LoggingConfig::default();
    config.static_fields.insert("service".to_string(), "rendergate".to_string());
    config.level = "warn".to_string();

    let logger_config = config.to_logger_config();
    assert_eq!(logger_config.format, LogFormat::Terminal);
    assert_eq!(logger_config.level, slog::Level::Warning);
    assert_eq!(
        logger_config.static_fields,
        vec![("service".to_string(), "rendergate".to_string())]
    );

    let logger = create_logger(&logger_config);
    slog::info!(logger, "static fields attached");
}

#[test]
fn test_init_is_idempotent() {
    test_logger::init_test_logger();
    init(Some(LevelFilter::Debug));
    init(Some(LevelFilter::Error));
    init_with_config(None, &LoggingConfig::default());
}

#[test]
fn test_request_info_trace_ids_are_unique() {
    let a = RequestInfo::new("GET".into(), "/".into(), "127.0.0.1".into(), "curl".into());
    let b = RequestInfo::new("GET".into(), "/".into(), "127.0.0.1".into(), "curl".into());
    assert_ne!(a.trace_id, b.trace_id);
    assert!(a.elapsed_ms() < 10_000);
}

#[test]
fn test_log_error_returns_error() {
    let err = log_error("Loader", "boom");
    assert_eq!(err, "boom");
}
