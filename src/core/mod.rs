//! Core logger types and traits

pub mod appender;
pub mod error;
pub mod layout;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod session;
pub mod timestamp;

pub use appender::{Appender, Sink};
pub use error::{LoggerError, Result};
pub use layout::{fit, Align, ColumnLayout, FormatKind, Formatter, Rendered, COLUMN_SEPARATOR};
pub use log_context::{FieldValue, LogContext};
pub use log_entry::{CallSite, ExceptionInfo, LogEntry};
pub use log_level::LogLevel;
pub use logger::{BoundLogger, Logger, LoggerBuilder, DEFAULT_LOGGER_NAME};
pub use metrics::LoggerMetrics;
pub use session::{SessionId, SESSION_ID_LEN};
pub use timestamp::TimestampFormat;
