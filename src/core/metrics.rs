//! Logger metrics for observability
//!
//! Counters describing how records moved through the sink multiplexer.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use session_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dispatched();
/// metrics.record_write();
/// metrics.record_sink_failure();
///
/// assert_eq!(metrics.dispatched(), 1);
/// assert_eq!(metrics.sink_writes(), 1);
/// assert_eq!(metrics.sink_failures(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records handed to the multiplexer
    dispatched: AtomicU64,

    /// Successful sink writes
    sink_writes: AtomicU64,

    /// Sink writes that returned an error or panicked
    sink_failures: AtomicU64,

    /// Records rendered through the bare-message fallback
    format_fallbacks: AtomicU64,

    /// Column banners written to console sinks
    banners: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            sink_writes: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            format_fallbacks: AtomicU64::new(0),
            banners: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_writes(&self) -> u64 {
        self.sink_writes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn format_fallbacks(&self) -> u64 {
        self.format_fallbacks.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn banners(&self) -> u64 {
        self.banners.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write(&self) -> u64 {
        self.sink_writes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_format_fallback(&self) -> u64 {
        self.format_fallbacks.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_banner(&self) -> u64 {
        self.banners.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of sink writes that failed, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no writes have been attempted.
    pub fn failure_rate(&self) -> f64 {
        let failures = self.sink_failures();
        let attempts = failures + self.sink_writes();
        if attempts == 0 {
            return 0.0;
        }
        (failures as f64 / attempts as f64) * 100.0
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
