//! Log entry structure

use super::log_context::LogContext;
use super::log_level::LogLevel;
use super::session::SessionId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Source location a record was issued from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub module_path: Option<String>,
    /// Enclosing function; only the crate's macros can recover it.
    pub function: Option<String>,
}

impl CallSite {
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: Some(file.to_string()),
            line: Some(line),
            module_path: None,
            function: None,
        }
    }

    /// Location of the caller of a `#[track_caller]` function.
    ///
    /// Only file and line are known here. Module path and function name
    /// come from the `log_*!` macros or from a bridged `log` record.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }

    #[must_use]
    pub fn with_module_path(mut self, module_path: impl Into<String>) -> Self {
        self.module_path = Some(module_path.into());
        self
    }

    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Name shown in the function column: the function when known, else the
    /// last module path segment, else the module the file defines.
    pub fn display_function(&self) -> &str {
        if let Some(function) = self.function.as_deref() {
            return function;
        }
        if let Some(module) = self.module_path.as_deref() {
            return module.rsplit("::").next().unwrap_or(module);
        }
        self.file
            .as_deref()
            .and_then(module_of_file)
            .unwrap_or("?")
    }
}

/// `src/api/users.rs` defines `users`; `src/api/mod.rs` defines `api`.
fn module_of_file(file: &str) -> Option<&str> {
    let path = std::path::Path::new(file);
    let stem = path.file_stem()?.to_str()?;
    if stem == "mod" {
        return path.parent()?.file_name()?.to_str();
    }
    Some(stem)
}

/// `to_string()` that survives a panicking `Display` impl.
pub(crate) fn display_or<T: fmt::Display + ?Sized>(value: &T, placeholder: &str) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| value.to_string()))
        .unwrap_or_else(|_| placeholder.to_string())
}

/// An error captured against a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    /// `source()` chain, outermost cause first
    pub causes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
}

impl ExceptionInfo {
    /// Capture `error` and its `source()` chain.
    ///
    /// For a type-erased `&dyn Error` the recorded type name is the trait
    /// object's, not the concrete error's. A `Display` or `source()` that
    /// panics yields a placeholder instead of unwinding into the caller.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let type_name = std::any::type_name::<E>();
        let message = display_or(error, "<error message unavailable>");
        let causes = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut causes = Vec::new();
            let mut source = error.source();
            while let Some(cause) = source {
                causes.push(display_or(cause, "<cause message unavailable>"));
                source = cause.source();
            }
            causes
        }))
        .unwrap_or_else(|_| vec!["<cause chain unavailable>".to_string()]);

        let backtrace = Backtrace::capture();
        let backtrace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self {
            type_name: type_name.to_string(),
            message,
            causes,
            backtrace,
        }
    }

    /// Multi-line rendering used below a formatted record.
    pub fn render(&self) -> String {
        let mut out = format!("{}: {}", self.type_name, self.message);
        for cause in &self.causes {
            out.push_str("\nCaused by: ");
            out.push_str(cause);
        }
        if let Some(ref backtrace) = self.backtrace {
            out.push_str("\nBacktrace:\n");
            out.push_str(backtrace.trim_end());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Process-wide issue order; timestamps alone can tie or step backwards
    pub sequence: u64,
    pub session_id: String,
    pub logger_name: String,
    pub call_site: CallSite,
    pub thread_id: String,
    pub thread_name: Option<String>,
    #[serde(skip_serializing_if = "LogContext::is_empty")]
    pub extra: LogContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
}

impl LogEntry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, message: String) -> Self {
        Self {
            level,
            message: Self::sanitize_message(&message),
            timestamp: Utc::now(),
            sequence: SEQUENCE.fetch_add(1, Ordering::Relaxed),
            session_id: SessionId::current().as_str().to_string(),
            logger_name: String::new(),
            call_site: CallSite::default(),
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            extra: LogContext::new(),
            exception: None,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session: &SessionId) -> Self {
        self.session_id = session.as_str().to_string();
        self
    }

    #[must_use]
    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = name.into();
        self
    }

    #[must_use]
    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        if self.logger_name.is_empty() {
            if let Some(ref module) = call_site.module_path {
                self.logger_name = module.clone();
            }
        }
        self.call_site = call_site;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.extra = context;
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
}
