//! Logger configuration
//!
//! Loaded from TOML. Every key is optional; missing keys take the defaults
//! below.
//!
//! ```toml
//! time_fmt = "%Y-%m-%d_%H:%M:%S"
//! intercept = true
//!
//! [console]
//! level = "INFO"
//!
//! [file]
//! levels = ["TRACE", "ERROR"]
//! path = "logs"
//! rotation = "1 days"
//! retention = "30 days"
//! compression = "gz"
//!
//! [notification]
//! enabled = true
//! host = "smtp.prod.local"
//! to = ["ops@example.com"]
//! ```

use crate::appenders::{
    Compression, ConsoleAppender, NotificationAppender, Retention, RotatingFileAppender,
    RotationPolicy, RotationStrategy, SmtpSettings, SmtpTransport,
};
use crate::core::{
    ColumnLayout, Formatter, LogLevel, Logger, LoggerError, Result, Sink, TimestampFormat,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "SESSION_LOGGER_CONFIG";

/// Config file looked up in the working directory when the variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "logging.toml";

/// Root logger configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub console: ConsoleConfig,
    pub file: FileConfig,
    pub notification: NotificationConfig,

    /// `iso8601`, `rfc3339`, `unix_millis` or a strftime pattern
    pub time_fmt: String,

    pub level_len: usize,
    pub session_len: usize,
    pub name_len: usize,
    pub function_len: usize,
    pub line_len: usize,

    /// Route records from the `log` facade into this logger.
    pub intercept: bool,

    /// When non-empty, only these facade targets (and their children) are bridged.
    pub specific_loggers: Vec<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let layout = ColumnLayout::default();
        Self {
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
            notification: NotificationConfig::default(),
            time_fmt: "%Y-%m-%d_%H:%M:%S".to_string(),
            level_len: layout.level_len,
            session_len: layout.session_len,
            name_len: layout.name_len,
            function_len: layout.function_len,
            line_len: layout.line_len,
            intercept: true,
            specific_loggers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub level: LogLevel,
    /// Print the column banner once at startup.
    pub show_categories: bool,
    pub colorize: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Trace,
            show_categories: false,
            colorize: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    /// One `<level>.log` file per entry, receiving that level and above.
    pub levels: Vec<LogLevel>,
    pub path: PathBuf,
    /// `"1 days"`, `"12 hours"`, `"daily"`, `"hourly"`, `"10 MB"` or `"never"`
    pub rotation: String,
    /// `"30 days"`, `"10 files"` or `"forever"`
    pub retention: String,
    /// `"gz"` or `"none"`
    pub compression: String,
    /// Write one JSON object per line instead of columns.
    pub serialize: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            levels: vec![LogLevel::Trace, LogLevel::Error],
            path: PathBuf::from("logs"),
            rotation: "1 days".to_string(),
            retention: "30 days".to_string(),
            compression: "gz".to_string(),
            serialize: false,
        }
    }
}

impl FileConfig {
    /// Rotation policy described by the string settings.
    ///
    /// # Errors
    ///
    /// Returns error if rotation, retention or compression cannot be parsed
    pub fn policy(&self) -> Result<RotationPolicy> {
        Ok(RotationPolicy::new()
            .with_strategy(parse_rotation(&self.rotation)?)
            .with_retention(parse_retention(&self.retention)?)
            .with_compression(parse_compression(&self.compression)?))
    }

    pub fn file_for(&self, level: LogLevel) -> PathBuf {
        self.path.join(format!("{}.log", level.to_str().to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub level: LogLevel,
    pub host: String,
    pub port: u16,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub queue_size: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: LogLevel::Critical,
            host: "localhost".to_string(),
            port: 25,
            from: "logger@localhost".to_string(),
            to: Vec::new(),
            subject: "Critical Error".to_string(),
            username: None,
            password: None,
            timeout_secs: 5,
            queue_size: crate::appenders::notification::DEFAULT_QUEUE_SIZE,
        }
    }
}

impl NotificationConfig {
    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.host.clone(),
            port: self.port,
            from: self.from.clone(),
            to: self.to.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl LoggerConfig {
    /// Load from the file named by `SESSION_LOGGER_CONFIG`, else from
    /// `logging.toml` in the working directory, else use defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read, parsed or validated
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "read logger config",
                format!("Failed to read '{}'", path.display()),
                e,
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// # Errors
    ///
    /// Returns error if the text is not valid TOML or fails validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoggerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting that can be wrong without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found
    pub fn validate(&self) -> Result<()> {
        TimestampFormat::parse(&self.time_fmt).map_err(|e| LoggerError::config("time_fmt", e))?;

        for (key, width) in [
            ("level_len", self.level_len),
            ("session_len", self.session_len),
            ("name_len", self.name_len),
            ("function_len", self.function_len),
            ("line_len", self.line_len),
        ] {
            if width == 0 {
                return Err(LoggerError::config(key, "column width must be at least 1"));
            }
        }

        if self.file.enabled {
            if self.file.levels.is_empty() {
                return Err(LoggerError::config("file.levels", "at least one level is required"));
            }
            self.file.policy()?;
        }

        if self.notification.enabled {
            if self.notification.host.trim().is_empty() {
                return Err(LoggerError::config("notification.host", "host is empty"));
            }
            if self.notification.to.is_empty() {
                return Err(LoggerError::config("notification.to", "no recipients"));
            }
            if self.notification.queue_size == 0 {
                return Err(LoggerError::config("notification.queue_size", "must be at least 1"));
            }
        }

        if self.specific_loggers.iter().any(|name| name.trim().is_empty()) {
            return Err(LoggerError::config("specific_loggers", "empty logger name"));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if `time_fmt` is invalid
    pub fn layout(&self) -> Result<ColumnLayout> {
        Ok(ColumnLayout {
            time_format: TimestampFormat::parse(&self.time_fmt)
                .map_err(|e| LoggerError::config("time_fmt", e))?,
            level_len: self.level_len,
            session_len: self.session_len,
            name_len: self.name_len,
            function_len: self.function_len,
            line_len: self.line_len,
        })
    }

    /// Open every configured sink and assemble the logger.
    ///
    /// Creates the log directory and starts the notification worker. Bridge
    /// installation is left to the registry.
    ///
    /// # Errors
    ///
    /// Returns error if the config is invalid or a sink cannot be opened
    pub fn build(&self) -> Result<Logger> {
        self.validate()?;
        let layout = Arc::new(self.layout()?);
        let mut builder = Logger::builder();

        if self.console.enabled {
            builder = builder.sink(
                Sink::new(
                    self.console.level,
                    Formatter::console(Arc::clone(&layout), self.console.colorize),
                    ConsoleAppender::new(),
                )
                .named("console"),
            );
        }

        if self.file.enabled {
            let policy = self.file.policy()?;
            let formatter = if self.file.serialize {
                Formatter::serialized(Arc::clone(&layout))
            } else {
                Formatter::file(Arc::clone(&layout))
            };

            let mut levels = self.file.levels.clone();
            levels.sort();
            levels.dedup();
            for level in levels {
                let appender =
                    RotatingFileAppender::with_policy(self.file.file_for(level), policy.clone())?;
                builder = builder.appender(level, formatter.clone(), appender);
            }
        }

        if self.notification.enabled {
            let transport = SmtpTransport::new(self.notification.smtp_settings());
            let appender = NotificationAppender::new(
                transport,
                self.notification.subject.clone(),
                self.notification.queue_size,
            )?;
            builder = builder.appender(
                self.notification.level,
                Formatter::notification(Arc::clone(&layout)),
                appender,
            );
        }

        Ok(builder.build())
    }
}

fn split_amount(text: &str) -> Option<(f64, String)> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (amount, unit) = text.split_at(split);
    let amount: f64 = amount.parse().ok()?;
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }
    Some((amount, unit.trim().to_lowercase()))
}

/// Parse a time span such as `"1 days"`, `"12 hours"`, `"30m"` or `"1.5 weeks"`.
pub fn parse_span(text: &str) -> Option<Duration> {
    let (amount, unit) = split_amount(text)?;
    let seconds = match unit.as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hour" | "hours" => 3600.0,
        "d" | "day" | "days" => 86_400.0,
        "w" | "week" | "weeks" => 604_800.0,
        _ => return None,
    };
    Duration::try_from_secs_f64(amount * seconds).ok()
}

/// Parse a size such as `"10 MB"` or `"500 KB"`. Units are powers of 1024.
pub fn parse_size(text: &str) -> Option<u64> {
    let (amount, unit) = split_amount(text)?;
    let factor: u64 = match unit.as_str() {
        "b" | "byte" | "bytes" => 1,
        "kb" | "k" | "kib" => 1024,
        "mb" | "m" | "mib" => 1024 * 1024,
        "gb" | "g" | "gib" => 1024 * 1024 * 1024,
        _ => return None,
    };
    Some((amount * factor as f64) as u64)
}

/// # Errors
///
/// Returns error if the setting is neither a keyword, a span nor a size
pub fn parse_rotation(text: &str) -> Result<RotationStrategy> {
    let normalized = text.trim().to_lowercase();
    match normalized.as_str() {
        "never" | "none" => return Ok(RotationStrategy::Never),
        "daily" | "midnight" => return RotationStrategy::daily(0),
        "hourly" => return Ok(RotationStrategy::Hourly),
        _ => {}
    }
    // "m" alone reads as minutes; sizes need an explicit byte unit
    if let Some(interval) = parse_span(&normalized) {
        if interval.is_zero() {
            return Err(LoggerError::config("file.rotation", "interval must be positive"));
        }
        return Ok(RotationStrategy::time(interval));
    }
    if let Some(max_bytes) = parse_size(&normalized) {
        if max_bytes == 0 {
            return Err(LoggerError::config("file.rotation", "size must be positive"));
        }
        return Ok(RotationStrategy::size(max_bytes));
    }
    Err(LoggerError::config(
        "file.rotation",
        format!("cannot parse '{}'", text),
    ))
}

/// # Errors
///
/// Returns error if the setting is neither a file count nor a span
pub fn parse_retention(text: &str) -> Result<Retention> {
    let normalized = text.trim().to_lowercase();
    if matches!(normalized.as_str(), "forever" | "none" | "") {
        return Ok(Retention::KeepAll);
    }
    if let Some((count, unit)) = split_amount(&normalized) {
        if matches!(unit.as_str(), "file" | "files") && count.fract() == 0.0 {
            return Ok(Retention::MaxFiles(count as usize));
        }
    }
    parse_span(&normalized)
        .map(Retention::MaxAge)
        .ok_or_else(|| LoggerError::config("file.retention", format!("cannot parse '{}'", text)))
}

/// # Errors
///
/// Returns error for unknown or unsupported formats
pub fn parse_compression(text: &str) -> Result<Compression> {
    match text.trim().to_lowercase().as_str() {
        "gz" | "gzip" => Ok(Compression::Gzip),
        "none" | "" => Ok(Compression::None),
        "zip" => Err(LoggerError::config(
            "file.compression",
            "zip archives are not supported, use \"gz\"",
        )),
        other => Err(LoggerError::config(
            "file.compression",
            format!("unknown compression '{}'", other),
        )),
    }
}
