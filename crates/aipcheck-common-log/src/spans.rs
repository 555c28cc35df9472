//! Validation spans and timing.

use tracing::{debug_span, Span};

/// Span for checking one input of the given kind (`status`, `revision`, ...).
pub fn check_span(kind: &'static str) -> Span {
    debug_span!("check", kind = kind)
}

/// Span for one entry of a batch.
pub fn batch_item_span(index: usize, kind: &'static str) -> Span {
    debug_span!(
        "batch_item",
        index = index,
        kind = kind,
        error = tracing::field::Empty
    )
}

/// Record an error on the current span.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", tracing::field::display(error));
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Operation name this timer was started for.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Complete the timer and record duration.
    pub fn finish(self) -> std::time::Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_us = %duration.as_micros(),
            "operation completed"
        );
        duration
    }
}

/// Time an expression with a [`Timer`], yielding its value.
#[macro_export]
macro_rules! timed {
    ($name:expr, $body:expr) => {{
        let _timer = $crate::spans::Timer::start($name);
        let result = $body;
        _timer.finish();
        result
    }};
}
