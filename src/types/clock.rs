//! Wrapping lap clock arithmetic
//!
//! The game stamps lap boundaries with a free-running 32-bit millisecond
//! counter. Differences between two stamps must be taken modulo 2^32 and read
//! back as the shortest signed distance.

use serde::{Deserialize, Serialize};

/// Largest difference that is still read as "ahead" (2^31 - 1).
const HALF_RANGE: u32 = 0x7FFF_FFFF;

/// A lap boundary stamp on the game's 32-bit millisecond counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LapClock(pub u32);

impl LapClock {
    /// Create a new clock stamp.
    pub fn new(ms: u32) -> Self {
        Self(ms)
    }

    /// Raw counter value in milliseconds.
    pub fn millis(self) -> u32 {
        self.0
    }

    /// Signed milliseconds from `earlier` to `self`. See [`clock_diff_ms`].
    pub fn since(self, earlier: LapClock) -> i64 {
        clock_diff_ms(self.0, earlier.0)
    }
}

impl From<u32> for LapClock {
    fn from(ms: u32) -> Self {
        Self(ms)
    }
}

/// Shortest signed difference `a - b` between two wrapping 32-bit stamps.
///
/// The raw difference is taken modulo 2^32; anything above 2^31 - 1 is read as
/// negative. The result lies in `-2^31..=2^31 - 1`.
pub fn clock_diff_ms(a: u32, b: u32) -> i64 {
    let raw = a.wrapping_sub(b);
    if raw > HALF_RANGE { i64::from(raw) - (1i64 << 32) } else { i64::from(raw) }
}

/// Unsigned wrapping duration from `start` to `end`.
pub fn lap_duration_ms(start: LapClock, end: LapClock) -> u32 {
    end.0.wrapping_sub(start.0)
}

/// Half-range rule: true if `a` is newer than `b`.
pub fn clock_after(a: u32, b: u32) -> bool {
    if a == b {
        return false;
    }
    a.wrapping_sub(b) <= HALF_RANGE
}
