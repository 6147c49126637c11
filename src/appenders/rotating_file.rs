//! Rotating file appender with automatic log rotation
//!
//! The active file keeps its configured name. When the rotation strategy
//! fires, the file is renamed to `<stem>.<YYYY-MM-DD_HH-MM-SS>.log`,
//! optionally gzip-compressed, and the retention rule prunes old segments.

use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use crate::core::log_entry::LogEntry;
use chrono::{DateTime, Local, Timelike};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const SEGMENT_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const SEGMENT_TIME_LEN: usize = 19;

/// Rotation strategy defining when to rotate log files
///
/// # Examples
///
/// ```
/// use session_logger::appenders::RotationStrategy;
/// use std::time::Duration;
///
/// // Rotate when file exceeds 100 MB
/// let size_strategy = RotationStrategy::Size { max_bytes: 100 * 1024 * 1024 };
///
/// // Rotate once a day after the file was opened
/// let time_strategy = RotationStrategy::Time { interval: Duration::from_secs(86_400) };
///
/// // Rotate daily at midnight
/// let daily_strategy = RotationStrategy::Daily { hour: 0 };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RotationStrategy {
    /// Rotate when file exceeds size in bytes
    Size { max_bytes: u64 },

    /// Rotate once the interval has elapsed since the last rotation
    Time { interval: Duration },

    /// Rotate daily at specified hour (0-23)
    Daily { hour: u8 },

    /// Rotate hourly
    Hourly,

    /// No rotation (useful for testing or when external rotation is used)
    Never,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        RotationStrategy::Time {
            interval: Duration::from_secs(24 * 3600),
        }
    }
}

impl RotationStrategy {
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        RotationStrategy::Size { max_bytes }
    }

    #[must_use]
    pub fn time(interval: Duration) -> Self {
        RotationStrategy::Time { interval }
    }

    /// Create a daily rotation strategy
    ///
    /// # Errors
    ///
    /// Returns an error if hour is greater than 23
    pub fn daily(hour: u8) -> Result<Self> {
        if hour > 23 {
            return Err(LoggerError::config(
                "rotation",
                format!("hour must be between 0 and 23, got {}", hour),
            ));
        }
        Ok(RotationStrategy::Daily { hour })
    }
}

/// What happens to a segment once it has been rotated out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    None,
    #[default]
    Gzip,
}

/// Which rotated segments are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retention {
    /// Delete segments last modified longer ago than this
    MaxAge(Duration),
    /// Keep only the newest n segments
    MaxFiles(usize),
    KeepAll,
}

impl Default for Retention {
    fn default() -> Self {
        Retention::MaxAge(Duration::from_secs(30 * 24 * 3600))
    }
}

/// Configuration for rotating file appender
///
/// # Examples
///
/// ```
/// use session_logger::appenders::{Compression, Retention, RotationPolicy, RotationStrategy};
///
/// let policy = RotationPolicy::new()
///     .with_strategy(RotationStrategy::size(50 * 1024 * 1024))
///     .with_retention(Retention::MaxFiles(7))
///     .with_compression(Compression::None);
/// assert_eq!(policy.retention, Retention::MaxFiles(7));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotationPolicy {
    pub strategy: RotationStrategy,
    pub retention: Retention,
    pub compression: Compression,
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_strategy(mut self, strategy: RotationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// Rotating file appender
///
/// # Examples
///
/// ```no_run
/// use session_logger::appenders::{RotatingFileAppender, RotationPolicy, RotationStrategy};
///
/// let policy = RotationPolicy::new().with_strategy(RotationStrategy::Hourly);
/// let appender = RotatingFileAppender::with_policy("logs/trace.log", policy).unwrap();
/// ```
pub struct RotatingFileAppender {
    base_path: PathBuf,
    name: String,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Timestamp of the last rotation (used for time-based strategies)
    last_rotation: SystemTime,
}

impl RotatingFileAppender {
    /// Create a rotating file appender with the default policy
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Create a rotating file appender with custom policy
    ///
    /// Missing parent directories are created and retention is applied once
    /// to segments left by earlier runs.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "create log directory",
                        format!("Failed to create directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let (file, current_size, last_rotation) = Self::open_file(&base_path)?;

        let appender = Self {
            name: format!("file:{}", base_path.display()),
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
            last_rotation,
        };
        appender.apply_retention();
        Ok(appender)
    }

    fn open_file(path: &Path) -> Result<(File, u64, SystemTime)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_appender(path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_appender(
                path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;
        let opened = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or_else(|_| SystemTime::now());
        Ok((file, metadata.len(), opened))
    }

    /// Check if rotation is needed based on the configured strategy
    fn should_rotate(&self) -> bool {
        let elapsed = || {
            SystemTime::now()
                .duration_since(self.last_rotation)
                .unwrap_or(Duration::ZERO)
        };

        match &self.policy.strategy {
            RotationStrategy::Never => false,

            RotationStrategy::Size { max_bytes } => self.current_size >= *max_bytes,

            RotationStrategy::Time { interval } => elapsed() >= *interval,

            RotationStrategy::Daily { hour } => {
                let now: DateTime<Local> = SystemTime::now().into();
                let last: DateTime<Local> = self.last_rotation.into();

                // Rotate if we're on a different day and past the target hour
                now.date_naive() != last.date_naive() && now.hour() >= u32::from(*hour)
            }

            RotationStrategy::Hourly => elapsed() >= Duration::from_secs(3600),
        }
    }

    /// Perform log rotation
    fn rotate(&mut self) -> Result<()> {
        // Explicitly drop writer to release file handle before the rename
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        let has_content = fs::metadata(&self.base_path).map(|m| m.len() > 0).unwrap_or(false);
        if has_content {
            let segment = self.next_segment_path(Local::now());
            fs::rename(&self.base_path, &segment).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;

            if self.policy.compression == Compression::Gzip {
                if let Err(e) = compress_file(&segment) {
                    eprintln!(
                        "[LOGGER WARNING] Compression of {} failed: {}. Segment kept uncompressed.",
                        segment.display(),
                        e
                    );
                }
            }
        }

        let (file, size, _) = Self::open_file(&self.base_path).map_err(|e| {
            LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;

        self.writer = Some(BufWriter::new(file));
        self.current_size = size;
        self.last_rotation = SystemTime::now();

        self.apply_retention();
        Ok(())
    }

    fn stem(&self) -> String {
        self.base_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("app")
            .to_string()
    }

    /// Path for a segment rotated at `when`. Segments sharing a second get
    /// `-N` suffixes above any suffix already on disk, so name order stays
    /// rotation order even after retention removed the earlier ones.
    fn next_segment_path(&self, when: DateTime<Local>) -> PathBuf {
        let stem = self.stem();
        let stamp = when.format(SEGMENT_TIME_FORMAT).to_string();
        let prefix = format!("{}.", stem);

        let taken = self
            .segments()
            .iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                segment_key(name.strip_prefix(&prefix)?)
            })
            .filter(|(seg_stamp, _)| *seg_stamp == stamp)
            .map(|(_, suffix)| suffix)
            .max();

        let mut suffix = taken.map_or(0, |max| max + 1);
        loop {
            let name = if suffix == 0 {
                format!("{}.{}.log", stem, stamp)
            } else {
                format!("{}.{}-{}.log", stem, stamp, suffix)
            };
            let candidate = self.base_path.with_file_name(name);
            if !candidate.exists() && !gz_path(&candidate).exists() {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Rotated segments of this file, oldest first.
    pub fn segments(&self) -> Vec<PathBuf> {
        let dir = match self.base_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = format!("{}.", self.stem());

        let Ok(read_dir) = fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut segments: Vec<((String, u32), PathBuf)> = read_dir
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let key = segment_key(name.strip_prefix(&prefix)?)?;
                Some((key, entry.path()))
            })
            .collect();
        segments.sort();
        segments.into_iter().map(|(_, path)| path).collect()
    }

    /// Apply the retention rule. Failures are reported, never returned.
    fn apply_retention(&self) {
        let doomed: Vec<PathBuf> = match self.policy.retention {
            Retention::KeepAll => return,
            Retention::MaxFiles(keep) => {
                let segments = self.segments();
                let excess = segments.len().saturating_sub(keep);
                segments.into_iter().take(excess).collect()
            }
            Retention::MaxAge(max_age) => {
                let now = SystemTime::now();
                self.segments()
                    .into_iter()
                    .filter(|path| {
                        fs::metadata(path)
                            .and_then(|m| m.modified())
                            .map(|modified| {
                                now.duration_since(modified).unwrap_or(Duration::ZERO) >= max_age
                            })
                            .unwrap_or(false)
                    })
                    .collect()
            }
        };

        for path in doomed {
            if let Err(e) = fs::remove_file(&path) {
                eprintln!(
                    "[LOGGER WARNING] Failed to remove expired log segment {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn last_rotation(&self) -> SystemTime {
        self.last_rotation
    }
}

/// Sort key of a segment file name with the `<stem>.` prefix removed,
/// or `None` if the name is not a rotated segment.
fn segment_key(rest: &str) -> Option<(String, u32)> {
    let body = rest
        .strip_suffix(".log.gz")
        .or_else(|| rest.strip_suffix(".log"))?;
    let stamp = body.get(..SEGMENT_TIME_LEN)?;
    chrono::NaiveDateTime::parse_from_str(stamp, SEGMENT_TIME_FORMAT).ok()?;

    let suffix = match &body[SEGMENT_TIME_LEN..] {
        "" => 0,
        tail => tail.strip_prefix('-')?.parse().ok()?,
    };
    Some((stamp.to_string(), suffix))
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".gz");
    PathBuf::from(name)
}

/// Compress a rotated segment, removing the original only after the
/// compressed copy is complete.
///
/// Uses streaming compression to avoid loading entire file into memory.
fn compress_file(path: &Path) -> Result<()> {
    use std::io::BufReader;

    let gz = gz_path(path);
    let mut temp = OsString::from(gz.as_os_str());
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary compressed file: {}", temp.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let streamed = std::io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut out| out.flush());
    if let Err(e) = streamed {
        let _ = fs::remove_file(&temp);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    fs::rename(&temp, &gz).map_err(|e| {
        let _ = fs::remove_file(&temp);
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to rename compressed file to: {}", gz.display()),
            e,
        )
    })?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compression succeeded but failed to remove original file {}: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

impl Appender for RotatingFileAppender {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, _entry: &LogEntry, rendered: &str) -> Result<()> {
        if self.should_rotate() {
            if let Err(e) = self.rotate() {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );

                if self.writer.is_none() {
                    let (file, size, _) = Self::open_file(&self.base_path)?;
                    self.writer = Some(BufWriter::new(file));
                    self.current_size = size;
                }

                // Back off until the next period instead of retrying every write
                self.current_size = 0;
                self.last_rotation = SystemTime::now();
            }
        }

        let Some(ref mut writer) = self.writer else {
            return Err(LoggerError::writer("Writer not initialized"));
        };

        writer
            .write_all(rendered.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .map_err(|e| {
                LoggerError::file_appender(
                    self.base_path.display().to_string(),
                    format!("Failed to write log entry: {}", e),
                )
            })?;
        self.current_size += rendered.len() as u64 + 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_appender(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }
}

impl Drop for RotatingFileAppender {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
