//! Timing frames published to subscribers

use std::collections::BTreeMap;

use crate::gap::{GapDisplay, GapReport};
use crate::types::{CarIdx, RaceState};

/// One processed snapshot: the race state plus its derived columns.
///
/// This is the unit that flows from the driver task to every subscriber.
#[derive(Debug, Clone)]
pub struct TimingFrame {
    /// Monotonic frame counter, starting at 1
    pub tick: u64,
    pub state: RaceState,
    pub gaps: GapReport,
    /// Last lap column, one entry per car
    pub last_laps: BTreeMap<CarIdx, GapDisplay>,
    /// The player's car, when it is in the snapshot
    pub player: Option<CarIdx>,
}

impl TimingFrame {
    /// Gap text for a car, if the car is in the snapshot.
    pub fn gap_text(&self, idx: CarIdx) -> Option<&str> {
        self.gaps.text(idx)
    }

    /// Last lap text for a car, if the car is in the snapshot.
    pub fn last_lap_text(&self, idx: CarIdx) -> Option<&str> {
        self.last_laps.get(&idx).map(|cell| cell.text.as_str())
    }

    pub fn is_player(&self, idx: CarIdx) -> bool {
        self.player == Some(idx)
    }

    /// Running order joined with gap cells, front to back.
    pub fn rows(&self) -> impl Iterator<Item = (CarIdx, &GapDisplay)> + '_ {
        self.state.order.iter().flatten().filter_map(|&idx| self.gaps.get(idx).map(|g| (idx, g)))
    }
}
