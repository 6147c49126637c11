//! Bridge from the `log` facade
//!
//! Libraries that log through `log::info!` and friends reach the same sinks
//! as native calls. The facade already records file, line and module path at
//! the macro site, so bridged records keep their true call site.

use crate::core::log_entry::display_or;
use crate::core::{
    CallSite, FieldValue, LogContext, LogEntry, LogLevel, Logger, LoggerError, Result,
};
use log::kv::{self, Key, Value, VisitSource};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Targets under this prefix are the crate's own and never bridged back.
const OWN_TARGET: &str = module_path!();

thread_local! {
    static IN_BRIDGE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside the bridge until dropped.
struct BridgeGuard;

impl BridgeGuard {
    /// `None` when the thread is already inside the bridge.
    fn enter() -> Option<Self> {
        if IN_BRIDGE.with(|flag| flag.replace(true)) {
            None
        } else {
            Some(BridgeGuard)
        }
    }
}

impl Drop for BridgeGuard {
    fn drop(&mut self) {
        IN_BRIDGE.with(|flag| flag.set(false));
    }
}

/// Which facade targets are bridged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    allowed: Vec<String>,
}

impl TargetFilter {
    /// Empty `allowed` admits every target.
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn admits(&self, target: &str) -> bool {
        if is_own_target(target) {
            return false;
        }
        self.allowed.is_empty()
            || self
                .allowed
                .iter()
                .any(|name| is_same_or_child(target, name))
    }
}

fn is_same_or_child(target: &str, name: &str) -> bool {
    target
        .strip_prefix(name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn is_own_target(target: &str) -> bool {
    let crate_name = OWN_TARGET.split("::").next().unwrap_or(OWN_TARGET);
    is_same_or_child(target, crate_name)
}

/// `log::Log` adapter that re-emits facade records through a [`Logger`].
pub struct LogBridge {
    logger: &'static Logger,
    filter: TargetFilter,
}

impl LogBridge {
    pub fn new(logger: &'static Logger, filter: TargetFilter) -> Self {
        Self { logger, filter }
    }

    /// Build the structured record for a facade record.
    pub fn translate(&self, record: &log::Record<'_>) -> LogEntry {
        let level = LogLevel::from(record.level());

        let call_site = call_site_of(record);

        let mut extra = LogContext::new();
        let _ = record.key_values().visit(&mut FieldCollector(&mut extra));

        let mut entry = LogEntry::new(level, render_args(record))
            .with_session(self.logger.session_id())
            .with_logger_name(record.target())
            .with_call_site(call_site)
            .with_context(extra);
        if entry.logger_name.is_empty() {
            entry.logger_name = self.logger.name().to_string();
        }
        entry
    }
}

fn call_site_of(record: &log::Record<'_>) -> CallSite {
    CallSite {
        file: record.file().map(str::to_string),
        line: record.line(),
        module_path: record.module_path().map(str::to_string),
        function: None,
    }
}

fn render_args(record: &log::Record<'_>) -> String {
    catch_unwind(AssertUnwindSafe(|| record.args().to_string()))
        .unwrap_or_else(|_| "<message formatting panicked>".to_string())
}

/// Stand-in record when translation itself panics.
fn untranslatable(logger: &Logger, record: &log::Record<'_>) -> LogEntry {
    LogEntry::new(
        LogLevel::from(record.level()),
        "<record translation panicked>".to_string(),
    )
    .with_session(logger.session_id())
    .with_logger_name(logger.name())
    .with_call_site(call_site_of(record))
}

struct FieldCollector<'a>(&'a mut LogContext);

impl<'kvs> VisitSource<'kvs> for FieldCollector<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> std::result::Result<(), kv::Error> {
        self.0.add_field(key.as_str(), field_value(&value));
        Ok(())
    }
}

fn field_value(value: &Value<'_>) -> FieldValue {
    if let Some(b) = value.to_bool() {
        FieldValue::Bool(b)
    } else if let Some(i) = value.to_i64() {
        FieldValue::Int(i)
    } else if let Some(u) = value.to_u64() {
        FieldValue::from(u)
    } else if let Some(f) = value.to_f64() {
        FieldValue::Float(f)
    } else {
        FieldValue::String(display_or(value, "<value formatting panicked>"))
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.logger.enabled(LogLevel::from(metadata.level())) && self.filter.admits(metadata.target())
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // A sink that logs through the facade would otherwise recurse forever
        let Some(_guard) = BridgeGuard::enter() else {
            return;
        };
        let entry = catch_unwind(AssertUnwindSafe(|| self.translate(record)))
            .unwrap_or_else(|_| untranslatable(self.logger, record));
        self.logger.dispatch(&entry);
    }

    fn flush(&self) {
        let _ = self.logger.flush();
    }
}

/// Register `logger` as the process-wide `log` backend.
///
/// The facade's max level is set to the lowest sink threshold so filtered
/// records are rejected before formatting.
///
/// # Errors
///
/// Returns error if another `log` backend is already installed
pub fn install(logger: &'static Logger, specific_loggers: Vec<String>) -> Result<()> {
    let bridge = LogBridge::new(logger, TargetFilter::new(specific_loggers));
    log::set_boxed_logger(Box::new(bridge)).map_err(|e| LoggerError::BridgeInstall(e.to_string()))?;
    log::set_max_level(
        logger
            .min_level()
            .map_or(log::LevelFilter::Off, LogLevel::to_level_filter),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Appender, ColumnLayout, Formatter, SessionId};
    use log::Log;
    use parking_lot::Mutex;
    use std::fmt;
    use std::sync::Arc;

    struct Explosive;

    impl fmt::Display for Explosive {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("display exploded")
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<LogEntry>>>);

    struct CaptureAppender(Captured);

    impl Appender for CaptureAppender {
        fn write(&mut self, entry: &LogEntry, _rendered: &str) -> Result<()> {
            self.0 .0.lock().push(entry.clone());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    fn leaked_logger(min_level: LogLevel) -> (&'static Logger, Captured) {
        let captured = Captured::default();
        let logger = Logger::builder()
            .session(SessionId::from_token("b1d9e000"))
            .appender(
                min_level,
                Formatter::file(Arc::new(ColumnLayout::default())),
                CaptureAppender(captured.clone()),
            )
            .build();
        (Box::leak(Box::new(logger)), captured)
    }

    #[test]
    fn test_target_filter() {
        let all = TargetFilter::default();
        assert!(all.admits("hyper::client"));
        assert!(!all.admits("session_logger::core"));

        let some = TargetFilter::new(vec!["sqlx".to_string()]);
        assert!(some.admits("sqlx"));
        assert!(some.admits("sqlx::query"));
        assert!(!some.admits("sqlx_core"));
        assert!(!some.admits("hyper"));
    }

    #[test]
    fn test_translate_keeps_call_site_and_fields() {
        let (logger, captured) = leaked_logger(LogLevel::Trace);
        let bridge = LogBridge::new(logger, TargetFilter::default());
        let kvs: &[(&str, i64)] = &[("user_id", 7)];

        bridge.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .target("api::users")
                .file(Some("src/api/users.rs"))
                .line(Some(42))
                .module_path(Some("api::users"))
                .key_values(&kvs)
                .args(format_args!("slow query {}", 3))
                .build(),
        );

        let entries = captured.0.lock();
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "slow query 3");
        assert_eq!(entry.logger_name, "api::users");
        assert_eq!(entry.session_id, "b1d9e000");
        assert_eq!(entry.call_site.file.as_deref(), Some("src/api/users.rs"));
        assert_eq!(entry.call_site.line, Some(42));
        assert_eq!(entry.extra.get("user_id"), Some(&FieldValue::Int(7)));
    }

    #[test]
    fn test_panicking_field_value_is_contained() {
        let (logger, captured) = leaked_logger(LogLevel::Trace);
        let bridge = LogBridge::new(logger, TargetFilter::default());
        let kvs: &[(&str, Value<'_>)] = &[
            ("payload", Value::from_display(&Explosive)),
            ("attempt", Value::from(2i64)),
        ];

        bridge.log(
            &log::Record::builder()
                .level(log::Level::Info)
                .target("api::upload")
                .key_values(&kvs)
                .args(format_args!("upload received"))
                .build(),
        );
        assert!(!IN_BRIDGE.with(Cell::get));

        bridge.log(
            &log::Record::builder()
                .level(log::Level::Info)
                .target("api::upload")
                .args(format_args!("next record"))
                .build(),
        );

        let entries = captured.0.lock();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "upload received");
        assert_eq!(
            entries[0].extra.get("payload"),
            Some(&FieldValue::String("<value formatting panicked>".to_string()))
        );
        assert_eq!(entries[0].extra.get("attempt"), Some(&FieldValue::Int(2)));
        assert_eq!(entries[1].message, "next record");
    }

    #[test]
    fn test_guard_released_on_unwind() {
        let result = std::panic::catch_unwind(|| {
            let _guard = BridgeGuard::enter().expect("not yet inside the bridge");
            assert!(BridgeGuard::enter().is_none());
            panic!("unwind through the guard");
        });
        assert!(result.is_err());
        assert!(!IN_BRIDGE.with(Cell::get));
        assert!(BridgeGuard::enter().is_some());
    }

    #[test]
    fn test_threshold_and_filter_respected() {
        let (logger, captured) = leaked_logger(LogLevel::Info);
        let bridge = LogBridge::new(logger, TargetFilter::new(vec!["db".to_string()]));

        bridge.log(
            &log::Record::builder()
                .level(log::Level::Debug)
                .target("db")
                .args(format_args!("below threshold"))
                .build(),
        );
        bridge.log(
            &log::Record::builder()
                .level(log::Level::Error)
                .target("web")
                .args(format_args!("filtered target"))
                .build(),
        );
        bridge.log(
            &log::Record::builder()
                .level(log::Level::Error)
                .target("db::pool")
                .args(format_args!("kept"))
                .build(),
        );

        let entries = captured.0.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");
        assert_eq!(entries[0].level, LogLevel::Error);
    }
}
