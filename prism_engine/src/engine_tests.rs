//! Unit tests for the Engine logging facade
//!
//! IMPORTANT: LOGGER and MIN_SEVERITY are process-wide.
//! All tests are marked with #[serial] to run sequentially.

use crate::prism::Engine;
use crate::prism::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
#[derive(Clone)]
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Entries from this test module only (other tests log concurrently)
    fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.source == "prism::test")
            .cloned()
            .collect()
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn setup() -> TestLogger {
    Engine::set_min_severity(LogSeverity::Trace);
    let logger = TestLogger::new();
    Engine::set_logger(logger.clone());
    logger
}

fn teardown() {
    Engine::set_min_severity(LogSeverity::Trace);
    Engine::reset_logger();
}

// ============================================================================
// LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_custom_logger_receives_entries() {
    let logger = setup();

    Engine::log(LogSeverity::Info, "prism::test", "hello".to_string());

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, "prism::test");
    assert_eq!(entries[0].message, "hello");
    assert!(entries[0].file.is_none());
    teardown();
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    let logger = setup();

    Engine::log_detailed(LogSeverity::Error, "prism::test", "bad".to_string(), "x.rs", 7);

    let entries = logger.entries();
    assert_eq!(entries[0].file, Some("x.rs"));
    assert_eq!(entries[0].line, Some(7));
    teardown();
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let logger = setup();
    Engine::set_min_severity(LogSeverity::Warn);
    assert_eq!(Engine::min_severity(), LogSeverity::Warn);

    Engine::log(LogSeverity::Debug, "prism::test", "dropped".to_string());
    Engine::log(LogSeverity::Warn, "prism::test", "kept".to_string());
    Engine::log_detailed(LogSeverity::Error, "prism::test", "kept too".to_string(), "x.rs", 1);

    let messages: Vec<String> = logger.entries().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["kept".to_string(), "kept too".to_string()]);
    teardown();
}

#[test]
#[serial]
fn test_engine_err_macro_logs_and_builds_backend_error() {
    let logger = setup();

    let err = crate::engine_err!("prism::test", "failed with code {}", -3);

    assert_eq!(err, crate::prism::Error::BackendError("failed with code -3".to_string()));
    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert!(entries[0].line.is_some());
    teardown();
}

#[test]
#[serial]
fn test_engine_bail_macro_returns_early() {
    let _logger = setup();

    fn bails() -> crate::prism::Result<u32> {
        crate::engine_bail!("prism::test", "nope");
    }

    assert!(matches!(bails(), Err(crate::prism::Error::BackendError(_))));
    teardown();
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let logger = setup();
    Engine::reset_logger();

    Engine::log(LogSeverity::Info, "prism::test", "to console".to_string());

    assert!(logger.entries().is_empty());
    teardown();
}
