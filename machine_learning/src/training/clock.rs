use std::time::{Duration, Instant};

/// A monotonic time source, only read for throughput diagnostics.
pub trait Clock {
    /// Time passed since the clock was created.
    fn elapsed(&self) -> Duration;
}

/// Wall-clock time.
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

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Examples processed per second, `0` when no time could be measured.
pub(crate) fn throughput(examples: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();

    if secs > 0. {
        examples as f64 / secs
    } else {
        0.
    }
}
