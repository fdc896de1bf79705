//! Core types for race snapshots.
//!
//! ## Architecture
//!
//! - [`RaceState`] is one snapshot of the race, built once per poll
//! - [`CarState`] holds the decoded per-car counters, [`Driver`] the identity
//! - [`LapClock`] wraps the game's 32-bit millisecond counter
//! - [`RetirementReason`] decodes non-zero car status codes
//! - [`UpdateRate`] controls how often subscribers see timing frames
//!
//! ## Usage Example
//!
//! ```rust
//! use icr2_timing::types::{CarState, LapClock, RaceState};
//!
//! let mut state = RaceState::default();
//! let mut leader = CarState::new(3);
//! leader.lap_end_clock = Some(LapClock(90_000));
//! state.car_states.insert(3, Some(leader));
//! state.order = vec![Some(3), None];
//!
//! let (idx, _) = state.leader().expect("car 3 is running");
//! assert_eq!(idx, 3);
//! ```

mod car;
mod clock;
mod race;
mod retirement;
mod update_rate;

pub use car::{CarIdx, CarState, Driver, PIT_LANE_PHASE};
pub use clock::{LapClock, clock_after, clock_diff_ms, lap_duration_ms};
pub use race::RaceState;
pub use retirement::RetirementReason;
pub use update_rate::{UpdateRate, poll_hz};
