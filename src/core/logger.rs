//! Main logger implementation

use super::{
    appender::{Appender, Sink},
    error::{LoggerError, Result},
    layout::{FormatKind, Formatter},
    log_context::{FieldValue, LogContext},
    log_entry::{CallSite, ExceptionInfo, LogEntry},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    session::SessionId,
};
use std::any::Any;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Name stamped on records that carry no module path.
pub const DEFAULT_LOGGER_NAME: &str = "app";

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// The sink multiplexer.
///
/// The sink list is fixed at construction. Each sink serializes its own
/// writes, so two sinks never wait on each other.
pub struct Logger {
    name: String,
    session: SessionId,
    sinks: Vec<Sink>,
    lowest: Option<LogLevel>,
    metrics: LoggerMetrics,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    /// Lowest threshold over all sinks, `None` when there are no sinks.
    pub fn min_level(&self) -> Option<LogLevel> {
        self.lowest
    }

    /// Whether any sink would receive a record at `level`.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.lowest.is_some_and(|lowest| level >= lowest)
    }

    /// Get the logger metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use session_logger::Logger;
    ///
    /// let logger = Logger::builder().build();
    /// logger.info("nobody listens");
    ///
    /// let metrics = logger.metrics();
    /// assert_eq!(metrics.dispatched(), 0);
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Stamp a new record with this logger's session and name.
    pub fn entry(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        call_site: CallSite,
        context: LogContext,
    ) -> LogEntry {
        let entry = LogEntry::new(level, message.into())
            .with_session(&self.session)
            .with_call_site(call_site)
            .with_context(context);
        if entry.logger_name.is_empty() {
            entry.with_logger_name(self.name.clone())
        } else {
            entry
        }
    }

    /// Route a record to every sink whose threshold admits it.
    ///
    /// **Per-Sink Isolation**: each write is wrapped in catch_unwind. An error
    /// or panic in one sink is reported on stderr and the remaining sinks
    /// still receive the record.
    pub fn dispatch(&self, entry: &LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }
        self.metrics.record_dispatched();

        for (idx, sink) in self.sinks.iter().enumerate() {
            if !sink.accepts(entry.level) {
                continue;
            }

            let rendered = sink.formatter().render(entry);
            if rendered.degraded {
                self.metrics.record_format_fallback();
            }

            let result = catch_unwind(AssertUnwindSafe(|| {
                sink.lock().write(entry, &rendered.text)
            }));

            match result {
                Ok(Ok(())) => {
                    self.metrics.record_write();
                    sink.mark_healthy();
                }
                Ok(Err(e)) => self.report_failure(idx, sink, "failed", &e.to_string()),
                Err(panic_info) => {
                    self.report_failure(idx, sink, "panicked", &panic_message(&*panic_info))
                }
            }
        }
    }

    fn report_failure(&self, idx: usize, sink: &Sink, what: &str, reason: &str) {
        self.metrics.record_sink_failure();
        if sink.mark_failing() {
            eprintln!(
                "[LOGGER ERROR] Sink #{} '{}' {}: {}. \
                 Other sinks continue to function; repeated failures are suppressed.",
                idx,
                sink.name(),
                what,
                reason
            );
        }
    }

    /// Create a record at the caller's location and dispatch it.
    pub fn emit(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        call_site: CallSite,
        context: LogContext,
    ) {
        if !self.enabled(level) {
            return;
        }
        let entry = self.entry(level, message, call_site, context);
        self.dispatch(&entry);
    }

    /// Log at the caller's file and line.
    ///
    /// A plain method call cannot see the caller's module path, so the name
    /// column shows this logger's name and the function column the module
    /// the calling file defines. The `log_*!` macros and bridged `log`
    /// records carry the full module path and function.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(level, message, CallSite::caller(), LogContext::new());
    }

    #[inline]
    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Alias of [`Logger::warning`].
    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    /// Log with structured context fields
    #[track_caller]
    pub fn log_with_context(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: LogContext,
    ) {
        self.emit(level, message, CallSite::caller(), context);
    }

    /// Helper for structured info logging
    #[track_caller]
    pub fn info_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Info, message, context);
    }

    /// Helper for structured error logging
    #[track_caller]
    pub fn error_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Error, message, context);
    }

    /// Log at ERROR with the error, its `source()` chain and a backtrace when
    /// `RUST_BACKTRACE` enables one.
    #[track_caller]
    pub fn exception<E: Error + ?Sized>(&self, error: &E, message: impl Into<String>) {
        let call_site = CallSite::caller();
        if !self.enabled(LogLevel::Error) {
            return;
        }
        let entry = self
            .entry(LogLevel::Error, message, call_site, LogContext::new())
            .with_exception(ExceptionInfo::from_error(error));
        self.dispatch(&entry);
    }

    /// A view that adds `context` to every record it emits.
    pub fn bind(&self, context: LogContext) -> BoundLogger<'_> {
        BoundLogger {
            logger: self,
            context,
        }
    }

    pub fn bind_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> BoundLogger<'_> {
        self.bind(LogContext::new().with_field(key, value))
    }

    /// Print the column banner on every console sink.
    pub fn print_header(&self) {
        for (idx, sink) in self.sinks.iter().enumerate() {
            if !matches!(sink.formatter().kind(), FormatKind::Console { .. }) {
                continue;
            }
            let header = sink.formatter().header();
            let result = catch_unwind(AssertUnwindSafe(|| sink.lock().write_banner(&header)));
            match result {
                Ok(Ok(())) => {
                    self.metrics.record_banner();
                }
                Ok(Err(e)) => self.report_failure(idx, sink, "failed", &e.to_string()),
                Err(panic_info) => {
                    self.report_failure(idx, sink, "panicked", &panic_message(&*panic_info))
                }
            }
        }
    }

    /// Flush every sink. All sinks are attempted; the first error is returned.
    pub fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            let result = catch_unwind(AssertUnwindSafe(|| sink.lock().flush()));
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic_info) => LoggerError::writer(format!(
                    "sink '{}' panicked during flush: {}",
                    sink.name(),
                    panic_message(&*panic_info)
                )),
            };
            eprintln!("[LOGGER ERROR] Sink '{}' flush failed: {}", sink.name(), error);
            first_error.get_or_insert(error);
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.flush();

        let failures = self.metrics.sink_failures();
        if failures > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} failed sink writes",
                failures
            );
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("session", &self.session)
            .field("sinks", &self.sinks)
            .finish()
    }
}

/// Builder for [`Logger`]
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use session_logger::{ColumnLayout, ConsoleAppender, Formatter, Logger, LogLevel, SessionId};
///
/// let layout = Arc::new(ColumnLayout::default());
/// let logger = Logger::builder()
///     .session(SessionId::from_token("a1b2c3d4"))
///     .appender(LogLevel::Info, Formatter::console(layout, false), ConsoleAppender::new())
///     .build();
///
/// assert_eq!(logger.session_id().as_str(), "a1b2c3d4");
/// assert_eq!(logger.min_level(), Some(LogLevel::Info));
/// ```
pub struct LoggerBuilder {
    name: String,
    session: Option<SessionId>,
    sinks: Vec<Sink>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_LOGGER_NAME.to_string(),
            session: None,
            sinks: Vec::new(),
        }
    }

    /// Name used when a record has no module path.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Use a fixed session token instead of the process token.
    #[must_use]
    pub fn session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Sink) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn appender<A: Appender + 'static>(
        self,
        min_level: LogLevel,
        formatter: Formatter,
        appender: A,
    ) -> Self {
        self.sink(Sink::new(min_level, formatter, appender))
    }

    #[must_use]
    pub fn build(self) -> Logger {
        let lowest = self.sinks.iter().map(Sink::min_level).min();
        Logger {
            name: self.name,
            session: self.session.unwrap_or_else(|| SessionId::current().clone()),
            sinks: self.sinks,
            lowest,
            metrics: LoggerMetrics::new(),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A logger view carrying bound context.
///
/// Binding never mutates the logger or other views. Keys bound later
/// override earlier ones, and per-call context overrides bound context.
#[derive(Debug, Clone)]
pub struct BoundLogger<'a> {
    logger: &'a Logger,
    context: LogContext,
}

impl<'a> BoundLogger<'a> {
    pub fn context(&self) -> &LogContext {
        &self.context
    }

    pub fn logger(&self) -> &'a Logger {
        self.logger
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.logger.enabled(level)
    }

    #[must_use]
    pub fn bind(&self, context: LogContext) -> BoundLogger<'a> {
        BoundLogger {
            logger: self.logger,
            context: self.context.merged(&context),
        }
    }

    #[must_use]
    pub fn bind_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> BoundLogger<'a> {
        self.bind(LogContext::new().with_field(key, value))
    }

    pub fn emit(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        call_site: CallSite,
        context: LogContext,
    ) {
        if !self.logger.enabled(level) {
            return;
        }
        let context = self.context.merged(&context);
        self.logger.emit(level, message, call_site, context);
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(level, message, CallSite::caller(), LogContext::new());
    }

    #[track_caller]
    pub fn log_with_context(&self, level: LogLevel, message: impl Into<String>, context: LogContext) {
        self.emit(level, message, CallSite::caller(), context);
    }

    #[inline]
    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    #[track_caller]
    pub fn exception<E: Error + ?Sized>(&self, error: &E, message: impl Into<String>) {
        let call_site = CallSite::caller();
        if !self.logger.enabled(LogLevel::Error) {
            return;
        }
        let entry = self
            .logger
            .entry(LogLevel::Error, message, call_site, self.context.clone())
            .with_exception(ExceptionInfo::from_error(error));
        self.logger.dispatch(&entry);
    }
}
