//! Logging macros for ergonomic log message formatting.
//!
//! Unlike the plain methods, the macros also record the module path and the
//! enclosing function name, and accept structured fields in braces before the
//! message.
//!
//! # Examples
//!
//! ```
//! use session_logger::{info, Logger};
//!
//! let logger = Logger::builder().build();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // With structured fields
//! let user_id = 42;
//! info!(logger, { user_id = user_id, action = "login" }, "User signed in");
//! ```

/// Name of the function the macro is expanded in.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = __type_name_of(__here);
        let path = path.strip_suffix("::__here").unwrap_or(path);
        let path = path.trim_end_matches("::{{closure}}");
        match path.rfind("::") {
            ::std::option::Option::Some(pos) => &path[pos + 2..],
            ::std::option::Option::None => path,
        }
    }};
}

/// Call site of the macro invocation.
#[doc(hidden)]
#[macro_export]
macro_rules! __call_site {
    () => {
        $crate::CallSite::new(::std::file!(), ::std::line!())
            .with_module_path(::std::module_path!())
            .with_function($crate::__function_name!())
    };
}

/// Log a message with automatic formatting.
///
/// The first argument is anything with `enabled` and `emit` methods: a
/// [`Logger`](crate::Logger), a reference to one, or a
/// [`BoundLogger`](crate::BoundLogger).
///
/// # Examples
///
/// ```
/// # use session_logger::{Logger, LogLevel};
/// # let logger = Logger::builder().build();
/// use session_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warning, { retry = 3 }, "Retrying");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, { $($key:ident = $value:expr),* $(,)? }, $($arg:tt)+) => {{
        let __logger = &$logger;
        let __level: $crate::LogLevel = $level;
        if __logger.enabled(__level) {
            __logger.emit(
                __level,
                ::std::format!($($arg)+),
                $crate::__call_site!(),
                $crate::LogContext::new()$(.with_field(::std::stringify!($key), $value))*,
            );
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $crate::log!($logger, $level, {}, $($arg)+)
    };
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # let logger = session_logger::Logger::builder().build();
/// use session_logger::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # let logger = session_logger::Logger::builder().build();
/// use session_logger::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # let logger = session_logger::Logger::builder().build();
/// use session_logger::info;
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a success-level message.
///
/// # Examples
///
/// ```
/// # let logger = session_logger::Logger::builder().build();
/// use session_logger::success;
/// success!(logger, "Migration finished");
/// ```
#[macro_export]
macro_rules! success {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Success, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # let logger = session_logger::Logger::builder().build();
/// use session_logger::warning;
/// warning!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # let logger = session_logger::Logger::builder().build();
/// use session_logger::error;
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// # Examples
///
/// ```
/// # let logger = session_logger::Logger::builder().build();
/// use session_logger::critical;
/// critical!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}
