//! Timing helpers for the expensive parts of a sample evaluation.
//!
//! ```rust
//! use sigma_tracing::performance::{record_kernel_call, PerformanceSpan};
//!
//! let span = PerformanceSpan::new("sigma_kernel", Some(100));
//! // ... native call ...
//! drop(span); // logged only if it took at least 100μs
//!
//! record_kernel_call(50, 10, 0, 1_250);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::Level;

static ENABLED: AtomicBool = AtomicBool::new(true);

// u64::MAX means "no threshold".
static DEFAULT_THRESHOLD_US: AtomicU64 = AtomicU64::new(u64::MAX);

/// Turn performance spans on or off process-wide.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Threshold applied to spans created without an explicit one.
pub fn set_default_threshold_us(threshold_us: Option<u64>) {
    DEFAULT_THRESHOLD_US.store(threshold_us.unwrap_or(u64::MAX), Ordering::Relaxed);
}

fn default_threshold_us() -> Option<u64> {
    match DEFAULT_THRESHOLD_US.load(Ordering::Relaxed) {
        u64::MAX => None,
        t => Some(t),
    }
}

/// RAII guard that measures its own lifetime and logs the duration on drop.
///
/// Nothing is logged when performance tracing is disabled or when the
/// duration stays under the threshold.
pub struct PerformanceSpan {
    threshold_us: Option<u64>,
    start_time: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// Create a debug-level span. `threshold_us = None` falls back to the
    /// process-wide default threshold.
    pub fn new(span_name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        Self::with_level(Level::DEBUG, span_name, threshold_us)
    }

    pub fn with_level(level: Level, span_name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let span_name = span_name.into();
        let span = match level {
            Level::TRACE => tracing::trace_span!("perf", name = %span_name),
            Level::DEBUG => tracing::debug_span!("perf", name = %span_name),
            Level::INFO => tracing::info_span!("perf", name = %span_name),
            Level::WARN => tracing::warn_span!("perf", name = %span_name),
            Level::ERROR => tracing::error_span!("perf", name = %span_name),
        };

        Self::from_span(span, threshold_us)
    }

    /// Time an existing span, typically one carrying the call's fields.
    pub fn from_span(span: tracing::Span, threshold_us: Option<u64>) -> Self {
        Self {
            threshold_us: threshold_us.or_else(default_threshold_us),
            start_time: Instant::now(),
            span,
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_us = self.elapsed_us();
        if self.threshold_us.is_none_or(|t| elapsed_us >= t) {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

/// Record one native sigma² evaluation.
///
/// `cells` throughput is the number of (m, z) output cells per second.
pub fn record_kernel_call(n_m: usize, n_z: usize, status: i32, duration_us: u64) {
    let cells = n_m * n_z;
    let cells_per_sec = if duration_us > 0 {
        (cells as f64 / duration_us as f64) * 1_000_000.0
    } else {
        0.0
    };

    tracing::debug!(
        event = "kernel_call",
        n_m = n_m,
        n_z = n_z,
        cells = cells,
        status = status,
        duration_us = duration_us,
        cells_per_sec = cells_per_sec,
        "sigma_kernel_call"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn elapsed_grows() {
        let span = PerformanceSpan::new("sleep", None);
        thread::sleep(Duration::from_millis(2));
        assert!(span.elapsed_us() >= 2_000);
    }

    #[test]
    #[serial]
    fn default_threshold_round_trips() {
        set_default_threshold_us(Some(500));
        assert_eq!(default_threshold_us(), Some(500));
        let span = PerformanceSpan::new("thresholded", None);
        assert_eq!(span.threshold_us, Some(500));

        set_default_threshold_us(None);
        assert_eq!(default_threshold_us(), None);
    }

    #[test]
    #[serial]
    fn explicit_threshold_wins_over_default() {
        set_default_threshold_us(Some(10));
        let span = PerformanceSpan::new("explicit", Some(99));
        assert_eq!(span.threshold_us, Some(99));
        set_default_threshold_us(None);
    }

    #[test]
    #[serial]
    fn disabled_spans_drop_quietly() {
        set_enabled(false);
        {
            let _span = PerformanceSpan::with_level(Level::INFO, "quiet", None);
        }
        set_enabled(true);
        assert!(is_enabled());
    }

    #[test]
    fn from_span_keeps_the_given_span() {
        let span = tracing::debug_span!("perf", name = "sigma_kernel", n_m = 4);
        let id = span.id();
        let perf = PerformanceSpan::from_span(span, Some(1));
        assert_eq!(perf.span.id(), id);
    }

    #[test]
    fn record_kernel_call_handles_zero_duration() {
        record_kernel_call(4, 3, 0, 0);
    }
}
