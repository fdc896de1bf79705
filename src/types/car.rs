//! Per-car runtime state and driver identity

use serde::{Deserialize, Serialize};

use super::{LapClock, RetirementReason};

/// Struct index of a car in the game's car tables. Index 0 is the pace car.
pub type CarIdx = usize;

/// Lap phase value the game uses while a car is in the pit lane.
pub const PIT_LANE_PHASE: u32 = 3;

/// Runtime state of one car, refreshed every poll.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarState {
    /// Struct index this block was read from
    pub struct_index: CarIdx,
    /// Laps left to run as reported by the game
    pub laps_left: u32,
    /// Laps completed
    pub laps_completed: u32,
    /// Last lap time in milliseconds (0 when unknown)
    pub last_lap_ms: u32,
    /// Whether `last_lap_ms` came from two valid clock stamps
    pub last_lap_valid: bool,
    /// Full laps behind the leader (0 on the lead lap)
    pub laps_down: u32,
    /// Clock stamp at the end of the last completed lap
    pub lap_end_clock: Option<LapClock>,
    /// Clock stamp at the start of the current lap
    pub lap_start_clock: Option<LapClock>,
    /// Retirement status code (0 = running)
    pub car_status: u32,
    /// Lap phase indicator
    pub current_lp: u32,
    pub fuel_laps_remaining: u32,
    /// Lateral track position
    pub dlat: i32,
    /// Longitudinal track position
    pub dlong: i32,
    /// The whole car block as signed 32-bit words
    pub values: Vec<i32>,
}

impl CarState {
    /// Create an empty running state for a struct index.
    pub fn new(struct_index: CarIdx) -> Self {
        Self { struct_index, ..Self::default() }
    }

    /// True while the car is running.
    pub fn is_running(&self) -> bool {
        self.car_status == 0
    }

    /// True while a running car is in the pit lane.
    pub fn is_pitting(&self) -> bool {
        self.current_lp == PIT_LANE_PHASE && self.is_running()
    }

    /// Retirement reason, if the status code names one.
    pub fn retirement(&self) -> Option<RetirementReason> {
        RetirementReason::from_code(i64::from(self.car_status))
    }
}

/// Driver identity for one struct index.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Driver {
    pub struct_index: CarIdx,
    /// Display name, may be empty
    pub name: String,
    pub car_number: Option<u32>,
}
