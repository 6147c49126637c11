//! Integration tests for the sink multiplexer
//!
//! These tests verify:
//! - Per-sink threshold routing across console, file and notification sinks
//! - Context binding as seen in the written files
//! - Failure isolation between sinks
//! - Serialized file output
//! - Log injection prevention

use parking_lot::Mutex;
use session_logger::appenders::{
    ConsoleAppender, Notification, NotificationAppender, NotificationTransport,
    RotatingFileAppender,
};
use session_logger::core::{Appender, LogEntry, LoggerError, Result};
use session_logger::{info, ColumnLayout, Formatter, LogContext, LogLevel, Logger, SessionId};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct DownTransport {
    attempts: Arc<AtomicUsize>,
}

impl NotificationTransport for DownTransport {
    fn deliver(&mut self, _notification: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LoggerError::notification("down", "mail relay unreachable"))
    }

    fn endpoint(&self) -> String {
        "down".to_string()
    }
}

struct BrokenAppender;

impl Appender for BrokenAppender {
    fn write(&mut self, _entry: &LogEntry, _rendered: &str) -> Result<()> {
        Err(LoggerError::writer("device gone"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn layout() -> Arc<ColumnLayout> {
    Arc::new(ColumnLayout::default())
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read log file")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_debug_record_reaches_only_debug_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let debug_path = temp_dir.path().join("debug.log");
    let console = SharedBuf::default();

    let logger = Logger::builder()
        .appender(
            LogLevel::Info,
            Formatter::console(layout(), false),
            ConsoleAppender::with_writer(Box::new(console.clone())),
        )
        .appender(
            LogLevel::Debug,
            Formatter::file(layout()),
            RotatingFileAppender::new(&debug_path).expect("Failed to create appender"),
        )
        .build();

    logger.debug("cache warmed");

    let lines = read_lines(&debug_path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("| DEBUG    |"));
    assert!(lines[0].ends_with("| cache warmed"));
    assert!(console.contents().is_empty());
}

#[test]
fn test_per_level_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let paths: Vec<_> = [LogLevel::Debug, LogLevel::Warning, LogLevel::Error]
        .iter()
        .map(|level| temp_dir.path().join(format!("{}.log", level.to_str().to_lowercase())))
        .collect();

    let mut builder = Logger::builder();
    for (level, path) in [LogLevel::Debug, LogLevel::Warning, LogLevel::Error]
        .into_iter()
        .zip(&paths)
    {
        builder = builder.appender(
            level,
            Formatter::file(layout()),
            RotatingFileAppender::new(path).expect("Failed to create appender"),
        );
    }
    let logger = builder.build();

    logger.debug("d");
    logger.success("s");
    logger.warning("w");
    logger.critical("c");

    assert_eq!(read_lines(&paths[0]).len(), 4);
    assert_eq!(read_lines(&paths[1]).len(), 2);
    assert_eq!(read_lines(&paths[2]).len(), 1);
    assert!(read_lines(&paths[2])[0].contains("CRITICAL"));
}

#[test]
fn test_bound_context_written_to_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("info.log");

    let logger = Logger::builder()
        .session(SessionId::from_token("0badcafe"))
        .appender(
            LogLevel::Info,
            Formatter::file(layout()),
            RotatingFileAppender::new(&path).expect("Failed to create appender"),
        )
        .build();

    let request = logger.bind_field("request_id", "abc123");
    request.info("handling");
    info!(request, { user_id = 42 }, "user loaded");
    logger.info("unbound");

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("| handling | request_id=abc123"));
    assert!(lines[1].ends_with("| user loaded | request_id=abc123 user_id=42"));
    assert!(lines[2].ends_with("| unbound"));
    assert!(lines.iter().all(|line| line.contains("| 0badcafe |")));
}

#[test]
fn test_critical_escalates_with_transport_down() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("error.log");
    let attempts = Arc::new(AtomicUsize::new(0));

    let notifier = NotificationAppender::new(
        DownTransport {
            attempts: Arc::clone(&attempts),
        },
        "service alert",
        8,
    )
    .expect("Failed to start notifier");
    let stats = notifier.stats();

    let logger = Logger::builder()
        .appender(
            LogLevel::Error,
            Formatter::file(layout()),
            RotatingFileAppender::new(&path).expect("Failed to create appender"),
        )
        .appender(LogLevel::Critical, Formatter::notification(layout()), notifier)
        .build();

    logger.error("recoverable");
    logger.critical("database unreachable");
    // Dropping the logger joins the notification worker
    drop(logger);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].ends_with("| database unreachable"));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(stats.failed(), 1);
    assert_eq!(stats.delivered(), 0);
}

#[test]
fn test_failing_sink_does_not_block_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("info.log");

    let logger = Logger::builder()
        .appender(LogLevel::Trace, Formatter::file(layout()), BrokenAppender)
        .appender(
            LogLevel::Info,
            Formatter::file(layout()),
            RotatingFileAppender::new(&path).expect("Failed to create appender"),
        )
        .build();

    for i in 0..5 {
        logger.info(format!("message {}", i));
    }

    assert_eq!(read_lines(&path).len(), 5);
    assert_eq!(logger.metrics().sink_failures(), 5);
    assert_eq!(logger.metrics().sink_writes(), 5);
    assert!(logger.sinks()[0].is_failing());
}

#[test]
fn test_serialized_file_lines_are_json() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("info.log");

    let logger = Logger::builder()
        .session(SessionId::from_token("5e551011"))
        .appender(
            LogLevel::Info,
            Formatter::serialized(layout()),
            RotatingFileAppender::new(&path).expect("Failed to create appender"),
        )
        .build();

    logger.info_with_context("order placed", LogContext::new().with_field("order", 991));

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&lines[0]).expect("line is JSON");
    assert_eq!(value["record"]["message"], "order placed");
    assert_eq!(value["record"]["level"], "INFO");
    assert_eq!(value["record"]["session_id"], "5e551011");
    assert_eq!(value["record"]["extra"]["order"], 991);
    assert!(value["text"]
        .as_str()
        .expect("text is a string")
        .contains("order placed"));
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("info.log");

    let logger = Logger::builder()
        .appender(
            LogLevel::Info,
            Formatter::file(layout()),
            RotatingFileAppender::new(&path).expect("Failed to create appender"),
        )
        .build();

    logger.info("User login\nERROR fake entry\nINFO continuation");

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1, "Log should be a single line, not multiple");
    assert!(lines[0].contains("User login\\nERROR fake entry"));
}

#[test]
fn test_extra_field_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("info.log");

    let logger = Logger::builder()
        .appender(
            LogLevel::Info,
            Formatter::file(layout()),
            RotatingFileAppender::new(&path).expect("Failed to create appender"),
        )
        .build();

    let forged = "bob\n2099-01-01_00:00:00 | CRITICAL | 00000000 | auth | login | 1 | forged";
    logger.info_with_context(
        "login attempt",
        LogContext::new().with_field("user", forged),
    );
    logger
        .bind_field("note\r\nkey", "x")
        .info("bound field");

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2, "Extras must not start new lines");
    assert!(lines[0].ends_with(r#"user="bob\n2099-01-01_00:00:00 | CRITICAL | 00000000 | auth | login | 1 | forged""#));
    assert!(lines[1].contains(r#""note\r\nkey"=x"#));
}

#[test]
fn test_exception_trace_follows_record() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("error.log");

    let logger = Logger::builder()
        .appender(
            LogLevel::Error,
            Formatter::file(layout()),
            RotatingFileAppender::new(&path).expect("Failed to create appender"),
        )
        .build();

    let err = io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume");
    logger.exception(&err, "snapshot failed");

    let content = fs::read_to_string(&path).expect("Failed to read log file");
    let mut lines = content.lines();
    assert!(lines.next().expect("record line").ends_with("| snapshot failed"));
    let exception = lines.next().expect("exception line");
    assert!(exception.starts_with("    "));
    assert!(exception.ends_with("Error: read-only volume"));
}
