use crate::error::DisciplineError;
use crossbeam_channel::Receiver;

use std::time::{Duration, Instant};

/// Timeout inaccuracy in percent used when none is configured.
pub const DEFAULT_TIMEOUT_INACCURACY: u32 = 25;

/// Approximates batch timeout expiry with a fixed-period wake-up instead of a resettable timer.
///
/// The wake-up period is `timeout / (100 / inaccuracy)`. On every wake-up the time elapsed
/// since the last flush is compared with `timeout`, so expiry is detected at most one period late.
#[derive(Debug, Clone)]
pub struct TimeoutDetector {
    // None when timeout based flushing is disabled
    detection: Option<Detection>,
    last_flush: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Detection {
    timeout: Duration,
    interval: Duration,
    steps: u32,
}

impl TimeoutDetector {
    /// Validates `timeout` and `inaccuracy` (percent) and starts counting from now.
    ///
    /// A zero `timeout` disables detection; `inaccuracy` is still validated.
    pub fn new(timeout: Duration, inaccuracy: u32) -> Result<TimeoutDetector, DisciplineError> {
        if inaccuracy == 0 || inaccuracy > 100 {
            return Err(DisciplineError::InvalidTimeoutInaccuracy(inaccuracy));
        }
        let steps = 100 / inaccuracy;

        let detection = if timeout.is_zero() {
            None
        } else {
            let interval = timeout / steps;
            if interval.is_zero() {
                return Err(DisciplineError::TimeoutTooSmall {
                    timeout,
                    inaccuracy,
                });
            }
            Some(Detection {
                timeout,
                interval,
                steps,
            })
        };

        Ok(TimeoutDetector {
            detection,
            last_flush: Instant::now(),
        })
    }

    /// Detector that never expires.
    pub fn disabled() -> TimeoutDetector {
        TimeoutDetector {
            detection: None,
            last_flush: Instant::now(),
        }
    }

    /// Checks if timeout based flushing is on.
    pub fn is_enabled(&self) -> bool {
        self.detection.is_some()
    }

    /// Configured timeout; `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        self.detection.map(|d| d.timeout)
    }

    /// Period of the wake-up source.
    pub fn interval(&self) -> Option<Duration> {
        self.detection.map(|d| d.interval)
    }

    /// Worst case overshoot of the timeout in percent of the timeout
    /// (`100 / floor(100 / inaccuracy)`).
    pub fn max_overshoot_percent(&self) -> Option<u32> {
        self.detection.map(|d| 100 / d.steps)
    }

    /// Creates the periodic wake-up source; never ticks when detection is disabled.
    pub fn ticker(&self) -> Receiver<Instant> {
        match self.detection {
            Some(detection) => crossbeam_channel::tick(detection.interval),
            None => crossbeam_channel::never(),
        }
    }

    /// Checks if `timeout` has elapsed at `now` since last flush.
    pub fn expired_at(&self, now: Instant) -> bool {
        match self.detection {
            Some(detection) => now.saturating_duration_since(self.last_flush) >= detection.timeout,
            None => false,
        }
    }

    pub fn expired(&self) -> bool {
        self.expired_at(Instant::now())
    }

    /// Starts new timeout window.
    pub fn reset(&mut self) {
        self.last_flush = Instant::now();
    }

    pub fn last_flush(&self) -> Instant {
        self.last_flush
    }
}
