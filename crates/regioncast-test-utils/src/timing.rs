//! Wall-clock timing helpers
//!
//! For tests that exercise real hardware (live display capture, a real
//! ffmpeg). Scripted sessions run on a manual clock and should assert on
//! that clock instead.

use std::time::{Duration, Instant};

/// Runs `f` and returns its result with the wall-clock time it took.
///
/// The timing is printed so `--nocapture` runs show where live tests spend
/// their time.
pub fn measure_sync<F, T>(name: &str, f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    println!("[TIMING] {}: {:.2}ms", name, elapsed.as_secs_f64() * 1000.0);
    (result, elapsed)
}

/// Asserts that `actual` is at most `budget`.
///
/// # Example
///
/// ```
/// use regioncast_test_utils::timing::assert_duration_below;
/// use std::time::Duration;
///
/// assert_duration_below(Duration::from_millis(20), Duration::from_millis(33), "sample");
/// ```
///
/// # Panics
///
/// If `actual` exceeds `budget`, with the overrun in the message.
pub fn assert_duration_below(actual: Duration, budget: Duration, operation: &str) {
    assert!(
        actual <= budget,
        "{} took {:.1}ms, over its {:.1}ms budget by {:.1}ms",
        operation,
        actual.as_secs_f64() * 1000.0,
        budget.as_secs_f64() * 1000.0,
        actual.saturating_sub(budget).as_secs_f64() * 1000.0,
    );
}
