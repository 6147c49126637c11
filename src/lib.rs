//! # Session Logger
//!
//! A process-wide structured logger. Every record carries a per-process
//! session token and its call site, and is multiplexed to independently
//! filtered sinks: a colored console, one rotating file per configured level
//! and an optional critical escalation channel.
//!
//! ## Features
//!
//! - **Seven levels**: `TRACE < DEBUG < INFO < SUCCESS < WARNING < ERROR < CRITICAL`
//! - **Aligned columns**: fixed-width time, level, session, name, function and line
//! - **Rotation**: time or size based, gzip compression, age or count retention
//! - **Facade bridge**: records from the `log` crate keep their original call site
//! - **Context binding**: attach request-scoped fields without touching the logger
//!
//! ## Example
//!
//! ```no_run
//! use session_logger::{get_logger, info};
//!
//! let logger = get_logger();
//! logger.info("service started");
//!
//! let request = logger.bind_field("request_id", "abc123");
//! info!(request, { user_id = 7 }, "user loaded");
//! ```

pub mod appenders;
pub mod bridge;
pub mod config;
pub mod core;
pub mod macros;
pub mod registry;

pub mod prelude {
    pub use crate::appenders::{ConsoleAppender, RotatingFileAppender};
    pub use crate::config::LoggerConfig;
    pub use crate::core::{
        Appender, BoundLogger, CallSite, FieldValue, LogContext, LogEntry, LogLevel, Logger,
        LoggerBuilder, LoggerError, LoggerMetrics, Result, SessionId,
    };
    pub use crate::registry::{get_logger, init};
}

pub use appenders::{ConsoleAppender, NotificationAppender, RotatingFileAppender};
pub use config::LoggerConfig;
pub use core::{
    Appender, BoundLogger, CallSite, ColumnLayout, ExceptionInfo, FieldValue, FormatKind,
    Formatter, LogContext, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerError, LoggerMetrics,
    Result, SessionId, Sink, TimestampFormat,
};
pub use registry::{get_logger, init, is_initialized, try_get_logger};
