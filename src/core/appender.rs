//! Appender trait and the sink wrapper the logger routes through

use super::{error::Result, layout::Formatter, log_entry::LogEntry, log_level::LogLevel};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

/// A log output destination.
///
/// Appenders receive the record together with the text its sink's formatter
/// produced. They are always called under their sink's mutex, so an
/// implementation never sees two writers at once.
pub trait Appender: Send {
    fn write(&mut self, entry: &LogEntry, rendered: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;

    /// Write a line that is not a record, such as the column banner.
    fn write_banner(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// An appender with its threshold and formatter.
pub struct Sink {
    name: String,
    min_level: LogLevel,
    formatter: Formatter,
    appender: Mutex<Box<dyn Appender>>,
    failing: AtomicBool,
}

impl Sink {
    pub fn new<A: Appender + 'static>(min_level: LogLevel, formatter: Formatter, appender: A) -> Self {
        Self::from_boxed(min_level, formatter, Box::new(appender))
    }

    pub fn from_boxed(min_level: LogLevel, formatter: Formatter, appender: Box<dyn Appender>) -> Self {
        Self {
            name: appender.name().to_string(),
            min_level,
            formatter,
            appender: Mutex::new(appender),
            failing: AtomicBool::new(false),
        }
    }

    /// Override the display name used in diagnostics.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    #[inline]
    pub fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Box<dyn Appender>> {
        self.appender.lock()
    }

    /// Flag the sink as failing. Returns true on the first failure of a streak.
    pub(crate) fn mark_failing(&self) -> bool {
        !self.failing.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_healthy(&self) {
        self.failing.store(false, Ordering::Release);
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("name", &self.name)
            .field("min_level", &self.min_level)
            .field("formatter", &self.formatter.kind())
            .field("failing", &self.is_failing())
            .finish()
    }
}
