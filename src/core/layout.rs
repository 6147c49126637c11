//! Column layout and record formatters
//!
//! Console and file lines share one column layout:
//!
//! ```text
//! 2025-01-08_10:30:45 | INFO     | 3fa9c2d1 | api::users       | create_user      |   42 | created | user_id=7
//! ```
//!
//! Every column except the message is padded or truncated to exactly its
//! configured width, so lines stay table-aligned whatever the message length.
//! Formatters never fail: a panic or `fmt::Error` while rendering degrades to
//! the bare message.

use super::log_entry::LogEntry;
use super::timestamp::TimestampFormat;
use chrono::{TimeZone, Utc};
use std::fmt::{self, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

#[cfg(feature = "console")]
use colored::Colorize;

pub const COLUMN_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Pad or truncate `value` to exactly `width` characters.
pub fn fit(value: &str, width: usize, align: Align) -> String {
    let len = value.chars().count();
    if len > width {
        return value.chars().take(width).collect();
    }
    let padding = " ".repeat(width - len);
    match align {
        Align::Left => format!("{}{}", value, padding),
        Align::Right => format!("{}{}", padding, value),
    }
}

/// Immutable column configuration shared by the formatters of one logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub time_format: TimestampFormat,
    pub level_len: usize,
    pub session_len: usize,
    pub name_len: usize,
    pub function_len: usize,
    pub line_len: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            time_format: TimestampFormat::Custom("%Y-%m-%d_%H:%M:%S".to_string()),
            level_len: 8,
            session_len: 8,
            name_len: 16,
            function_len: 16,
            line_len: 4,
        }
    }
}

impl ColumnLayout {
    /// Width of the rendered time column, measured on a fixed instant.
    pub fn time_len(&self) -> usize {
        let sample = Utc
            .with_ymd_and_hms(2000, 12, 31, 23, 59, 59)
            .single()
            .unwrap_or_else(Utc::now);
        self.time_format.format(&sample).chars().count()
    }
}

/// The padded columns of one record, before any coloring.
struct Columns {
    time: String,
    level: String,
    session: String,
    name: String,
    function: String,
    line: String,
}

impl Columns {
    fn padded(entry: &LogEntry, layout: &ColumnLayout) -> Result<Self, fmt::Error> {
        let line = entry.call_site.line.map(|l| l.to_string()).unwrap_or_default();
        Ok(Self {
            time: layout.time_format.try_format(&entry.timestamp)?,
            level: fit(entry.level.to_str(), layout.level_len, Align::Left),
            session: fit(&entry.session_id, layout.session_len, Align::Left),
            name: fit(&entry.logger_name, layout.name_len, Align::Left),
            function: fit(entry.call_site.display_function(), layout.function_len, Align::Left),
            line: fit(&line, layout.line_len, Align::Right),
        })
    }

    fn bare(entry: &LogEntry, layout: &ColumnLayout) -> Result<Self, fmt::Error> {
        Ok(Self {
            time: layout.time_format.try_format(&entry.timestamp)?,
            level: entry.level.to_str().to_string(),
            session: entry.session_id.clone(),
            name: entry.logger_name.clone(),
            function: entry.call_site.display_function().to_string(),
            line: entry.call_site.line.map(|l| l.to_string()).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Columns with level colors
    Console { colorize: bool },
    /// Columns without colors
    File,
    /// One JSON object per record
    Serialized,
    /// Unpadded columns for notification bodies
    Notification,
}

/// Result of rendering one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// True when rendering failed and `text` is the bare message
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct Formatter {
    kind: FormatKind,
    layout: Arc<ColumnLayout>,
}

impl Formatter {
    pub fn new(kind: FormatKind, layout: Arc<ColumnLayout>) -> Self {
        Self { kind, layout }
    }

    pub fn console(layout: Arc<ColumnLayout>, colorize: bool) -> Self {
        Self::new(FormatKind::Console { colorize }, layout)
    }

    pub fn file(layout: Arc<ColumnLayout>) -> Self {
        Self::new(FormatKind::File, layout)
    }

    pub fn serialized(layout: Arc<ColumnLayout>) -> Self {
        Self::new(FormatKind::Serialized, layout)
    }

    pub fn notification(layout: Arc<ColumnLayout>) -> Self {
        Self::new(FormatKind::Notification, layout)
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Render a record. Never panics.
    pub fn format(&self, entry: &LogEntry) -> String {
        self.render(entry).text
    }

    /// Render a record and report whether the fallback was used.
    pub fn render(&self, entry: &LogEntry) -> Rendered {
        match catch_unwind(AssertUnwindSafe(|| self.try_render(entry))) {
            Ok(Ok(text)) => Rendered {
                text,
                degraded: false,
            },
            _ => Rendered {
                text: entry.message.clone(),
                degraded: true,
            },
        }
    }

    fn try_render(&self, entry: &LogEntry) -> Result<String, fmt::Error> {
        match self.kind {
            FormatKind::Console { colorize } => {
                let columns = Columns::padded(entry, &self.layout)?;
                if colorize {
                    self.colored_line(entry, columns)
                } else {
                    Self::plain_line(entry, columns)
                }
            }
            FormatKind::File => Self::plain_line(entry, Columns::padded(entry, &self.layout)?),
            FormatKind::Notification => {
                Self::plain_line(entry, Columns::bare(entry, &self.layout)?)
            }
            FormatKind::Serialized => self.json_line(entry),
        }
    }

    fn plain_line(entry: &LogEntry, columns: Columns) -> Result<String, fmt::Error> {
        let mut out = String::with_capacity(128 + entry.message.len());
        write!(
            out,
            "{time}{sep}{level}{sep}{session}{sep}{name}{sep}{function}{sep}{line}{sep}{message}",
            sep = COLUMN_SEPARATOR,
            time = columns.time,
            level = columns.level,
            session = columns.session,
            name = columns.name,
            function = columns.function,
            line = columns.line,
            message = entry.message,
        )?;
        Self::append_tail(&mut out, entry)?;
        Ok(out)
    }

    #[cfg(feature = "console")]
    fn colored_line(&self, entry: &LogEntry, columns: Columns) -> Result<String, fmt::Error> {
        let color = entry.level.color();
        let mut out = String::with_capacity(192 + entry.message.len());
        write!(
            out,
            "{time}{sep}{level}{sep}{session}{sep}{name}{sep}{function}{sep}{line}{sep}{message}",
            sep = COLUMN_SEPARATOR,
            time = columns.time.green(),
            level = columns.level.color(color).bold(),
            session = columns.session.magenta(),
            name = columns.name.cyan(),
            function = columns.function.color(color),
            line = columns.line.color(color),
            message = entry.message.as_str().color(color),
        )?;
        Self::append_tail(&mut out, entry)?;
        Ok(out)
    }

    #[cfg(not(feature = "console"))]
    fn colored_line(&self, entry: &LogEntry, columns: Columns) -> Result<String, fmt::Error> {
        Self::plain_line(entry, columns)
    }

    /// Extra fields after the message, exception trace on following lines.
    fn append_tail(out: &mut String, entry: &LogEntry) -> fmt::Result {
        if !entry.extra.is_empty() {
            write!(out, "{}{}", COLUMN_SEPARATOR, entry.extra)?;
        }
        if let Some(ref exception) = entry.exception {
            for line in exception.render().lines() {
                write!(out, "\n    {}", line)?;
            }
        }
        Ok(())
    }

    fn json_line(&self, entry: &LogEntry) -> Result<String, fmt::Error> {
        let text = Self::plain_line(entry, Columns::bare(entry, &self.layout)?)?;
        let mut record = serde_json::to_value(entry).map_err(|_| fmt::Error)?;
        if let serde_json::Value::Object(ref mut map) = record {
            map.insert(
                "time".to_string(),
                serde_json::Value::String(self.layout.time_format.try_format(&entry.timestamp)?),
            );
            map.insert(
                "function".to_string(),
                serde_json::Value::String(entry.call_site.display_function().to_string()),
            );
        }
        let envelope = serde_json::json!({ "text": text, "record": record });
        serde_json::to_string(&envelope).map_err(|_| fmt::Error)
    }

    /// Column banner aligned with this formatter's lines.
    pub fn header(&self) -> String {
        let layout = &self.layout;
        let columns = [
            fit("TIME", layout.time_len(), Align::Left),
            fit("LEVEL", layout.level_len, Align::Left),
            fit("SESSION", layout.session_len, Align::Left),
            fit("NAME", layout.name_len, Align::Left),
            fit("FUNCTION", layout.function_len, Align::Left),
            fit("LINE", layout.line_len, Align::Right),
            "MESSAGE".to_string(),
        ];
        columns.join(COLUMN_SEPARATOR)
    }
}
