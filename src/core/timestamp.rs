//! Timestamp formatting utilities
//!
//! Provides the time column formats accepted by the `time_fmt` setting.
//!
//! Custom patterns render in local time, the clock file rotation and
//! segment names use. The named machine formats stay in UTC.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use std::fmt::{self, Write};

/// Standardized timestamp format options
///
/// # Examples
///
/// ```
/// use session_logger::core::TimestampFormat;
/// use chrono::Utc;
///
/// let format = TimestampFormat::parse("iso8601").unwrap();
/// let timestamp = format.format(&Utc::now());
/// // Output: "2025-01-08T10:30:45.123Z"
/// assert!(timestamp.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// RFC 3339 format: `2025-01-08T10:30:45+00:00`
    Rfc3339,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Custom strftime format in local time, e.g. `%Y-%m-%d_%H:%M:%S`
    Custom(String),
}

impl TimestampFormat {
    /// Parse a `time_fmt` setting.
    ///
    /// Named formats are matched case-insensitively; anything else is treated
    /// as a strftime pattern and rejected if chrono cannot interpret it.
    pub fn parse(text: &str) -> Result<Self, String> {
        match text.trim().to_lowercase().as_str() {
            "iso8601" | "iso" => return Ok(TimestampFormat::Iso8601),
            "rfc3339" => return Ok(TimestampFormat::Rfc3339),
            "unix_millis" | "unix-millis" => return Ok(TimestampFormat::UnixMillis),
            _ => {}
        }
        if text.is_empty() {
            return Err("empty time format".to_string());
        }
        if StrftimeItems::new(text).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid strftime pattern '{}'", text));
        }
        Ok(TimestampFormat::Custom(text.to_string()))
    }

    /// Format a `DateTime<Utc>`, reporting an unusable pattern as an error
    /// instead of panicking.
    pub fn try_format(&self, datetime: &DateTime<Utc>) -> Result<String, fmt::Error> {
        let mut out = String::with_capacity(32);
        match self {
            TimestampFormat::Iso8601 => write!(out, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ"))?,
            TimestampFormat::Rfc3339 => out.push_str(&datetime.to_rfc3339()),
            TimestampFormat::UnixMillis => write!(out, "{}", datetime.timestamp_millis())?,
            TimestampFormat::Custom(pattern) => {
                write!(out, "{}", datetime.with_timezone(&Local).format(pattern))?
            }
        }
        Ok(out)
    }

    /// Format a `DateTime<Utc>`, falling back to ISO 8601 on a broken pattern.
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        self.try_format(datetime)
            .unwrap_or_else(|_| datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_datetime() -> DateTime<Utc> {
        // 2025-01-08 10:30:45.123456 UTC
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::microseconds(123456)
    }

    #[test]
    fn test_iso8601_format() {
        let result = TimestampFormat::Iso8601.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123Z");
    }

    #[test]
    fn test_rfc3339_format() {
        let result = TimestampFormat::Rfc3339.format(&fixed_datetime());
        assert!(result.starts_with("2025-01-08T10:30:45"));
        assert!(result.contains("+00:00") || result.ends_with('Z'));
    }

    #[test]
    fn test_unix_millis_format() {
        let result = TimestampFormat::UnixMillis.format(&fixed_datetime());
        assert_eq!(result, "1736332245123");
    }

    #[test]
    fn test_custom_format_uses_local_clock() {
        let format = TimestampFormat::parse("%Y-%m-%d_%H:%M:%S").unwrap();
        let local = fixed_datetime().with_timezone(&Local);
        assert_eq!(
            format.format(&fixed_datetime()),
            local.format("%Y-%m-%d_%H:%M:%S").to_string()
        );

        // Same clock as rotating file segment names
        let offset = TimestampFormat::parse("%z").unwrap();
        assert_eq!(offset.format(&fixed_datetime()), local.format("%z").to_string());
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(TimestampFormat::parse("ISO8601"), Ok(TimestampFormat::Iso8601));
        assert_eq!(TimestampFormat::parse("rfc3339"), Ok(TimestampFormat::Rfc3339));
        assert_eq!(TimestampFormat::parse("unix_millis"), Ok(TimestampFormat::UnixMillis));
    }

    #[test]
    fn test_parse_rejects_bad_pattern() {
        assert!(TimestampFormat::parse("%Y-%Q").is_err());
        assert!(TimestampFormat::parse("").is_err());
    }

    #[test]
    fn test_broken_custom_pattern_does_not_panic() {
        let format = TimestampFormat::Custom("%Y-%Q".to_string());
        assert!(format.try_format(&fixed_datetime()).is_err());
        assert_eq!(format.format(&fixed_datetime()), "2025-01-08T10:30:45.123Z");
    }
}
