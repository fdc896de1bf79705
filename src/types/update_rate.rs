//! Delivery rate control for timing subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants timing frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every frame the poller produces
    Native,

    /// At most this many frames per second.
    /// Requests at or above the poll rate collapse to `Native`.
    Max(u32),
}

impl UpdateRate {
    /// Normalize against the poll frequency of the source.
    pub fn normalize(self, source_hz: f64) -> Self {
        match self {
            UpdateRate::Native => UpdateRate::Native,
            UpdateRate::Max(0) => UpdateRate::Native,
            UpdateRate::Max(hz) if f64::from(hz) >= source_hz => UpdateRate::Native,
            UpdateRate::Max(hz) => UpdateRate::Max(hz),
        }
    }

    /// Sampling period to apply, if any.
    pub fn sample_interval(self, source_hz: f64) -> Option<Duration> {
        match self.normalize(source_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

/// Poll frequency in Hz for a poll period in milliseconds.
pub fn poll_hz(poll_ms: u64) -> f64 {
    1000.0 / poll_ms.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_requests_collapse_to_native() {
        assert_eq!(UpdateRate::Max(10).normalize(4.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(4).normalize(4.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(0).normalize(4.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(2).normalize(4.0), UpdateRate::Max(2));
    }

    #[test]
    fn sample_interval_for_slow_requests() {
        assert_eq!(UpdateRate::Native.sample_interval(4.0), None);
        assert_eq!(UpdateRate::Max(2).sample_interval(4.0), Some(Duration::from_millis(500)));
    }

    #[test]
    fn poll_hz_from_period() {
        assert_eq!(poll_hz(250), 4.0);
        assert_eq!(poll_hz(0), 1000.0);
    }
}
