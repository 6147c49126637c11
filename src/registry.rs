//! Process-wide logger
//!
//! The logger is built once, on the first call to [`get_logger`] or
//! [`init`], and lives until the process exits.

use crate::bridge;
use crate::config::LoggerConfig;
use crate::core::{Logger, Result};
use parking_lot::{const_mutex, Mutex};
use std::sync::OnceLock;

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Serializes construction so the build side effects run once.
static INIT_LOCK: Mutex<()> = const_mutex(());

/// The process-wide logger, built from [`LoggerConfig::load`] on first use.
///
/// # Panics
///
/// Panics if the logger cannot be constructed, e.g. when the log directory
/// is not writable. Startup should not continue without logging.
pub fn get_logger() -> &'static Logger {
    if let Some(logger) = LOGGER.get() {
        return logger;
    }
    match LoggerConfig::load().and_then(init) {
        Ok(logger) => logger,
        Err(e) => panic!("failed to initialize logger: {}", e),
    }
}

/// Build the process-wide logger from `config`.
///
/// If the logger already exists it is returned unchanged and `config` is
/// ignored. Construction opens every sink, installs the `log` bridge when
/// `intercept` is set and prints the column banner when
/// `console.show_categories` is set.
///
/// # Errors
///
/// Returns error if the configuration is invalid or a sink cannot be opened
pub fn init(config: LoggerConfig) -> Result<&'static Logger> {
    if let Some(logger) = LOGGER.get() {
        return Ok(logger);
    }

    let _guard = INIT_LOCK.lock();
    if let Some(logger) = LOGGER.get() {
        return Ok(logger);
    }

    let built = config.build()?;
    let logger = LOGGER.get_or_init(|| built);

    if config.intercept {
        if let Err(e) = bridge::install(logger, config.specific_loggers.clone()) {
            eprintln!(
                "[LOGGER WARNING] {}. Records from the log facade will not reach this logger.",
                e
            );
        }
    }
    if config.console.show_categories {
        logger.print_header();
    }
    Ok(logger)
}

/// Whether the process-wide logger has been built.
pub fn is_initialized() -> bool {
    LOGGER.get().is_some()
}

/// The process-wide logger if it has been built.
pub fn try_get_logger() -> Option<&'static Logger> {
    LOGGER.get()
}
