//! Instrumentation macros.

/// Create a [`crate::performance::PerformanceSpan`] guard. Extra fields are
/// recorded on the guard's own span, so events emitted while it is entered
/// carry them.
///
/// ```rust
/// use sigma_tracing::perf_span;
///
/// let span = perf_span!("sigma_kernel", n_m = 40, n_z = 8);
/// {
///     let _entered = span.enter();
///     // ... native call ...
/// }
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        $crate::performance::PerformanceSpan::from_span(
            $crate::__tracing::debug_span!("perf", name = $name, $($field = $value),+),
            None,
        )
    }};
}

/// Run a block and return `(result, duration_in_microseconds)`.
///
/// ```rust
/// use sigma_tracing::timed_block;
///
/// let (sum, duration_us) = timed_block!("sum", { (1..=10).sum::<i32>() });
/// assert_eq!(sum, 55);
/// let _ = duration_us;
/// ```
#[macro_export]
macro_rules! timed_block {
    ($name:expr, $block:block) => {{
        let start = ::std::time::Instant::now();
        let result = $block;
        let duration_us = start.elapsed().as_micros() as u64;
        $crate::__tracing::debug!(
            operation = $name,
            duration_us = duration_us,
            duration_ms = duration_us as f64 / 1000.0,
            "timed_block_complete"
        );
        (result, duration_us)
    }};
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    #[test]
    fn perf_span_with_fields_can_be_entered() {
        let span = perf_span!("sigma_kernel", n_m = 2, n_z = 3);
        let _entered = span.enter();
        assert!(span.elapsed_us() < 60_000_000);
    }

    #[test]
    fn timed_block_reports_duration() {
        let (result, duration_us) = timed_block!("sleep", {
            thread::sleep(Duration::from_millis(5));
            7
        });
        assert_eq!(result, 7);
        assert!(duration_us >= 5_000);
    }

    #[test]
    fn timed_block_passes_errors_through() {
        let (result, _) = timed_block!("fails", { Result::<i32, &str>::Err("boom") });
        assert_eq!(result, Err("boom"));
    }
}
