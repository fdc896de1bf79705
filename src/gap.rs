//! Gap column computation
//!
//! Turns one [`RaceState`] into the text shown in the gap column of the running
//! order, one entry per car: time behind the leader, laps down, or a pit /
//! retirement status.
//!
//! The computation is pure and never fails. Cars are identified by their key in
//! `car_states` only, and the first running car in `order` leads even if it is
//! listed again further down. Without a leader every car gets a blank cell,
//! flagged as [`GapStatus::NoLeader`] so callers can tell it apart from a
//! normal result.
//!
//! ## Usage Example
//!
//! ```rust
//! use icr2_timing::gap::{GapColors, compute_gaps};
//! use icr2_timing::types::{CarState, LapClock, RaceState};
//!
//! let mut state = RaceState::default();
//! for (idx, end) in [(1, 90_000), (2, 92_345)] {
//!     let mut car = CarState::new(idx);
//!     car.laps_completed = 5;
//!     car.lap_end_clock = Some(LapClock(end));
//!     state.car_states.insert(idx, Some(car));
//!     state.order.push(Some(idx));
//! }
//!
//! let report = compute_gaps(&state, &GapColors::default());
//! assert_eq!(report.text(1), Some(""));
//! assert_eq!(report.text(2), Some("+2.345"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

use crate::config::ColorSettings;
use crate::types::{CarIdx, CarState, RaceState};

/// Text and colour hint for one gap cell.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapDisplay {
    pub text: String,
    /// `None` lets the presentation layer use its default colour
    pub color: Option<String>,
}

impl GapDisplay {
    /// Empty cell, default colour.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Text in the default colour.
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), color: None }
    }

    /// Text with a colour hint.
    pub fn colored(text: impl Into<String>, color: &str) -> Self {
        Self { text: text.into(), color: Some(color.to_string()) }
    }
}

/// Colour hints for the two highlighted states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapColors {
    pub pitting: String,
    pub retired: String,
}

impl Default for GapColors {
    fn default() -> Self {
        Self::from(&ColorSettings::default())
    }
}

impl From<&ColorSettings> for GapColors {
    fn from(colors: &ColorSettings) -> Self {
        Self { pitting: colors.pitting.clone(), retired: colors.retired.clone() }
    }
}

/// How a [`GapReport`] was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapStatus {
    /// Normal computation against a leader
    Computed,
    /// No running car in the order; every cell is blank
    NoLeader,
}

/// Gap cells for every car in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    /// One entry per key of `RaceState::car_states`
    pub gaps: BTreeMap<CarIdx, GapDisplay>,
    pub status: GapStatus,
}

impl GapReport {
    /// Blank cells for every car in the snapshot.
    pub fn blank(state: &RaceState, status: GapStatus) -> Self {
        let gaps = state.car_states.keys().map(|&idx| (idx, GapDisplay::blank())).collect();
        Self { gaps, status }
    }

    pub fn get(&self, idx: CarIdx) -> Option<&GapDisplay> {
        self.gaps.get(&idx)
    }

    /// Cell text for a car.
    pub fn text(&self, idx: CarIdx) -> Option<&str> {
        self.get(idx).map(|g| g.text.as_str())
    }
}

/// The race leader: first car in running order with state and `car_status == 0`.
pub fn select_leader(state: &RaceState) -> Option<(CarIdx, &CarState)> {
    state.leader()
}

/// Gap cell for one car, relative to the selected leader.
///
/// Rules are applied in order and the first match wins:
/// missing data, pitting, retired, leader, lapped, same lap, one lap down, blank.
pub fn classify_car(
    idx: CarIdx,
    car: Option<&CarState>,
    leader: (CarIdx, &CarState),
    colors: &GapColors,
) -> GapDisplay {
    let Some(car) = car else {
        return GapDisplay::blank();
    };

    if car.is_pitting() {
        return GapDisplay::colored("Pitting", &colors.pitting);
    }

    if let Some(reason) = car.retirement() {
        return GapDisplay::colored(reason.label(), &colors.retired);
    }

    let (leader_idx, leader) = leader;
    if idx == leader_idx {
        return GapDisplay::blank();
    }

    if car.laps_down > 0 {
        return GapDisplay::plain(format!("-{}L", car.laps_down));
    }

    let reference = if car.laps_completed == leader.laps_completed {
        leader.lap_end_clock
    } else if leader.laps_completed.checked_sub(1) == Some(car.laps_completed) {
        leader.lap_start_clock
    } else {
        return GapDisplay::blank();
    };

    match (car.lap_end_clock, reference) {
        (Some(end), Some(reference)) => GapDisplay::plain(format_time_diff(end.since(reference))),
        _ => GapDisplay::blank(),
    }
}

/// Compute the gap cell of every car in the snapshot.
///
/// The returned map always has exactly the keys of `state.car_states`.
pub fn compute_gaps(state: &RaceState, colors: &GapColors) -> GapReport {
    let Some(leader) = select_leader(state) else {
        trace!("No running leader, blanking gap column");
        return GapReport::blank(state, GapStatus::NoLeader);
    };

    let gaps = state
        .car_states
        .iter()
        .map(|(&idx, car)| (idx, classify_car(idx, car.as_ref(), leader, colors)))
        .collect();

    GapReport { gaps, status: GapStatus::Computed }
}

/// Format a signed millisecond difference for the gap column.
///
/// `0` is blank. Under a minute: `+12.345`. Otherwise: `+1:05.250`.
pub fn format_time_diff(diff_ms: i64) -> String {
    if diff_ms == 0 {
        return String::new();
    }
    let sign = if diff_ms > 0 { '+' } else { '-' };
    let ms = diff_ms.unsigned_abs();
    if ms < 60_000 {
        format!("{sign}{}.{:03}", ms / 1000, ms % 1000)
    } else {
        let rem = ms % 60_000;
        format!("{sign}{}:{:02}.{:03}", ms / 60_000, rem / 1000, rem % 1000)
    }
}
