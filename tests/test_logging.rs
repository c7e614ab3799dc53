//! Tests for logging configuration and format parsing
//!
//! Tests the pure functions in the logging module that turn environment
//! variables and the CLI verbosity into a subscriber configuration.

use research_crew::observability::logging::{resolve_level, LogFormat};
use tracing::Level;

#[test]
fn test_log_format_parse_is_case_insensitive() {
    assert_eq!(LogFormat::parse("jSoN"), LogFormat::Json);
    assert_eq!(LogFormat::parse("PrEtTy"), LogFormat::Pretty);
    assert_eq!(LogFormat::parse("CoMpAcT"), LogFormat::Compact);
}

#[test]
fn test_unknown_format_falls_back_to_compact() {
    assert_eq!(LogFormat::parse("yaml"), LogFormat::Compact);
    assert_eq!(LogFormat::parse("123"), LogFormat::Compact);
}

#[test]
fn test_level_resolution() {
    let test_cases = vec![
        (Some("ERROR"), 0, Level::ERROR),
        (Some("warn"), 2, Level::WARN),
        (Some("Info"), 0, Level::INFO),
        (Some("TRACE"), 0, Level::TRACE),
        (Some("invalid"), 3, Level::WARN),
        (None, 0, Level::WARN),
        (None, 1, Level::INFO),
        (None, 2, Level::DEBUG),
        (None, 3, Level::TRACE),
    ];

    for (log_level, verbosity, expected) in test_cases {
        assert_eq!(
            resolve_level(log_level, verbosity),
            expected,
            "Failed for LOG_LEVEL={log_level:?}, -v x{verbosity}"
        );
    }
}
