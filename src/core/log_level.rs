//! Log level definitions
//!
//! Severities carry an integer rank. `TRACE` sits below the facade's debug tier
//! and `SUCCESS` sits between info and warning.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace = 5,
    Debug = 10,
    #[default]
    Info = 20,
    Success = 25,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl LogLevel {
    /// Every level, least severe first.
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Success,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    #[inline]
    pub const fn rank(self) -> u32 {
        self as u32
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Round an arbitrary numeric rank to the closest named level.
    ///
    /// Ties resolve to the more severe level. Ranks outside the scale clamp
    /// to `Trace` or `Critical`.
    pub fn nearest(rank: u32) -> LogLevel {
        let mut best = LogLevel::Trace;
        let mut best_distance = u32::MAX;
        for level in LogLevel::ALL {
            let distance = level.rank().abs_diff(rank);
            if distance <= best_distance {
                best = level;
                best_distance = distance;
            }
        }
        best
    }

    /// Translate a level coming from another logging API.
    ///
    /// The name wins when it is known; otherwise the numeric rank is rounded
    /// to the nearest named level.
    pub fn resolve(name: &str, rank: u32) -> LogLevel {
        name.parse().unwrap_or_else(|_| LogLevel::nearest(rank))
    }

    /// Numeric rank used by the `log` facade levels on this scale.
    pub fn facade_rank(level: log::Level) -> u32 {
        match level {
            log::Level::Trace => 5,
            log::Level::Debug => 10,
            log::Level::Info => 20,
            log::Level::Warn => 30,
            log::Level::Error => 40,
        }
    }

    /// The most permissive facade filter that still lets this level through.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info | LogLevel::Success => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error | LogLevel::Critical => log::LevelFilter::Error,
        }
    }

    #[cfg(feature = "console")]
    pub fn color(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Trace => Cyan,
            LogLevel::Debug => Blue,
            LogLevel::Info => White,
            LogLevel::Success => Green,
            LogLevel::Warning => Yellow,
            LogLevel::Error => Red,
            LogLevel::Critical => BrightRed,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        LogLevel::resolve(level.as_str(), LogLevel::facade_rank(level))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "SUCCESS" => Ok(LogLevel::Success),
            "WARN" | "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

/// Accepts the same spellings as [`FromStr`], so config files may say
/// `"warn"` or `"Info"`.
impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order_matches_declaration() {
        for pair in LogLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn test_nearest() {
        assert_eq!(LogLevel::nearest(0), LogLevel::Trace);
        assert_eq!(LogLevel::nearest(10), LogLevel::Debug);
        assert_eq!(LogLevel::nearest(22), LogLevel::Info);
        assert_eq!(LogLevel::nearest(24), LogLevel::Success);
        // 35 is equidistant from WARNING and ERROR
        assert_eq!(LogLevel::nearest(35), LogLevel::Error);
        assert_eq!(LogLevel::nearest(1000), LogLevel::Critical);
    }

    #[test]
    fn test_resolve_prefers_name() {
        assert_eq!(LogLevel::resolve("warn", 0), LogLevel::Warning);
        assert_eq!(LogLevel::resolve("NOTICE", 27), LogLevel::Success);
        assert_eq!(LogLevel::resolve("", 45), LogLevel::Critical);
    }

    #[test]
    fn test_from_facade_level() {
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warning);
        assert_eq!(LogLevel::from(log::Level::Error), LogLevel::Error);
    }

    #[test]
    fn test_level_filter_admits_level() {
        for level in LogLevel::ALL {
            let filter = level.to_level_filter();
            let facade = match filter.to_level() {
                Some(l) => l,
                None => panic!("filter for {} is Off", level),
            };
            assert!(LogLevel::from(facade) <= level);
        }
    }

    #[test]
    fn test_deserialize_any_case() {
        let level: LogLevel = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(level, LogLevel::Warning);
        assert_eq!(serde_json::to_string(&LogLevel::Success).unwrap(), "\"SUCCESS\"");
        assert!(serde_json::from_str::<LogLevel>("\"LOUD\"").is_err());
    }

    #[test]
    fn test_display_padding() {
        assert_eq!(format!("{:<8}", LogLevel::Info), "INFO    ");
        assert_eq!(LogLevel::Critical.to_string(), "CRITICAL");
    }
}
