use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Host time source exposed to the guest through `clock_time_get`.
///
/// Readings are float milliseconds (sub-millisecond precision), the unit browser hosts report
/// for both `Date.now()`-style wall time and `performance.now()`-style monotonic time.
pub trait HostClock {
    /// Milliseconds since the Unix epoch.
    fn wall_ms(&self) -> f64;

    /// Milliseconds since an arbitrary fixed origin; never decreases.
    fn monotonic_ms(&self) -> f64;
}

/// [`HostClock`] backed by the operating system clocks.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    fn wall_ms(&self) -> f64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs_f64() * 1_000.0,
            // Clock set before 1970.
            Err(_) => 0.0,
        }
    }

    fn monotonic_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1_000.0
    }
}

/// Convert a float millisecond reading to whole nanoseconds.
///
/// Negative and non-finite readings clamp to 0; `as` saturates at `u64::MAX`.
pub fn ms_to_ns(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 1_000_000.0).round() as u64
    } else {
        0
    }
}
