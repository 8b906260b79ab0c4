//! Wall-clock timing for whole runs

use std::time::{Duration, Instant};
use tracing::debug;

/// Labelled wall-clock timer; the label shows up in the debug log on stop
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Consume the timer, logging and returning the elapsed time
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        debug!(timer = %self.label, elapsed_ms = elapsed.as_millis() as u64, "stopped");
        elapsed
    }

    /// [`Timer::stop`] in whole milliseconds, as reported in run stats
    pub fn stop_ms(self) -> u64 {
        self.stop().as_millis() as u64
    }
}
