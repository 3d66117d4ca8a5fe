//! Unit tests for log.rs
//!
//! Tests LogSeverity ordering, LogEntry construction and DefaultLogger formatting.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::time::SystemTime;

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_are_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5, "{:?}", severity);
    }
    assert_eq!(LogSeverity::Error.label(), "ERROR");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_new_has_no_location() {
    let entry = LogEntry::new(LogSeverity::Info, "prism::buffer", "created".to_string());

    assert_eq!(entry.severity, LogSeverity::Info);
    assert_eq!(entry.source, "prism::buffer");
    assert_eq!(entry.message, "created");
    assert!(entry.file.is_none());
    assert!(entry.line.is_none());
}

#[test]
fn test_log_entry_with_location() {
    let entry = LogEntry::new(LogSeverity::Error, "prism::vulkan", "map failed".to_string())
        .with_location("vulkan_buffer.rs", 42);

    assert_eq!(entry.file, Some("vulkan_buffer.rs"));
    assert_eq!(entry.line, Some(42));
}

#[test]
fn test_log_entry_timestamps_increase() {
    let first = LogEntry::new(LogSeverity::Info, "test", "first".to_string());
    std::thread::sleep(std::time::Duration::from_millis(10));
    let second = LogEntry::new(LogSeverity::Info, "test", "second".to_string());
    assert!(second.timestamp > first.timestamp);
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let entry = LogEntry {
        severity: LogSeverity::Warn,
        timestamp: SystemTime::now(),
        source: "prism::software".to_string(),
        message: "skipping native cleanup".to_string(),
        file: None,
        line: None,
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[WARN ]"));
    assert!(line.contains("[prism::software]"));
    assert!(line.ends_with("skipping native cleanup"));
}

#[test]
fn test_format_plain_with_location() {
    let entry = LogEntry::new(LogSeverity::Error, "prism::vulkan", "boom".to_string())
        .with_location("vulkan.rs", 123);

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("boom (vulkan.rs:123)"));
}

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Just verify it doesn't panic, with and without location
        logger.log(&LogEntry::new(severity, "test", format!("{:?}", severity)));
        logger.log(&LogEntry::new(severity, "test", format!("{:?}", severity)).with_location("t.rs", 1));
    }
}

// ============================================================================
// LOGGER TRAIT TESTS
// ============================================================================

struct CountingLogger {
    count: std::sync::Mutex<usize>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.count.lock().unwrap() += 1;
    }
}

#[test]
fn test_custom_logger_implementation() {
    let logger = CountingLogger { count: std::sync::Mutex::new(0) };
    let entry = LogEntry::new(LogSeverity::Info, "test", "test".to_string());

    logger.log(&entry);
    logger.log(&entry);
    assert_eq!(*logger.count.lock().unwrap(), 2);
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}
