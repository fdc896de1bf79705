//! Whole-race snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CarIdx, CarState, Driver};

/// Snapshot of the race taken once per poll.
///
/// Owned by whoever built it; consumers only read it.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceState {
    /// Car slots present in memory, pace car included
    pub raw_count: usize,
    /// Racing cars shown in the running order (`raw_count - 1`)
    pub display_count: usize,
    /// Scheduled race distance in laps
    pub total_laps: u32,
    /// Running order front to back; `None` marks an unoccupied slot
    pub order: Vec<Option<CarIdx>>,
    pub drivers: BTreeMap<CarIdx, Driver>,
    /// Per-car state; a `None` value means no data has been read yet
    pub car_states: BTreeMap<CarIdx, Option<CarState>>,
    /// Track length in miles
    pub track_length: f64,
    /// Track folder name, e.g. `INDY500`
    pub track_name: String,
}

impl RaceState {
    /// State of a car, if the snapshot has data for it.
    pub fn car(&self, idx: CarIdx) -> Option<&CarState> {
        self.car_states.get(&idx).and_then(Option::as_ref)
    }

    /// The race leader: the first car in running order that has state and is running.
    pub fn leader(&self) -> Option<(CarIdx, &CarState)> {
        self.order
            .iter()
            .flatten()
            .find_map(|&idx| self.car(idx).filter(|car| car.is_running()).map(|car| (idx, car)))
    }

    /// Stamp each car and driver with the struct index it is stored under,
    /// where the index was left unset (zero).
    ///
    /// Snapshots written by hand usually omit `struct_index`.
    pub fn fill_struct_indices(&mut self) {
        for (&idx, car) in self.car_states.iter_mut() {
            if let Some(car) = car
                && car.struct_index == 0
            {
                car.struct_index = idx;
            }
        }
        for (&idx, driver) in self.drivers.iter_mut() {
            if driver.struct_index == 0 {
                driver.struct_index = idx;
            }
        }
    }

    /// Car number for a struct index, if known.
    pub fn car_number(&self, idx: CarIdx) -> Option<u32> {
        self.drivers.get(&idx).and_then(|d| d.car_number)
    }
}
