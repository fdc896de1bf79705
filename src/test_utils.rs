//! Test utilities: snapshot builders and an in-memory game image
//!
//! Shared by unit tests and benchmarks so fixtures read the same everywhere.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::BTreeMap;

use crate::memory::layout::{CAR_STATE_SIZE, MemoryOffsets, MemoryVersion, NAME_SLOT_SIZE};
use crate::memory::ProcessMemory;
use crate::types::{CarIdx, CarState, Driver, LapClock, RaceState};
use crate::{Result, TimingError};

/// Highest readable offset of a [`GameImage`].
pub const IMAGE_SIZE: u32 = 0x0060_0000;

/// A running car with both lap clocks stamped.
pub fn timed_car(idx: CarIdx, laps_completed: u32, start_ms: u32, end_ms: u32) -> CarState {
    CarState {
        laps_completed,
        lap_start_clock: Some(LapClock(start_ms)),
        lap_end_clock: Some(LapClock(end_ms)),
        last_lap_ms: end_ms.wrapping_sub(start_ms),
        last_lap_valid: true,
        ..CarState::new(idx)
    }
}

/// Builder for [`RaceState`] fixtures.
#[derive(Debug, Default, Clone)]
pub struct RaceBuilder {
    state: RaceState,
}

impl RaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a car at the back of the running order.
    pub fn car(mut self, car: CarState) -> Self {
        let idx = car.struct_index;
        self.state.order.push(Some(idx));
        self.state.car_states.insert(idx, Some(car));
        self
    }

    /// Add a car that has state but is not listed in the running order.
    pub fn unlisted(mut self, car: CarState) -> Self {
        self.state.car_states.insert(car.struct_index, Some(car));
        self
    }

    /// Add an order slot whose car has no data yet.
    pub fn missing(mut self, idx: CarIdx) -> Self {
        self.state.order.push(Some(idx));
        self.state.car_states.insert(idx, None);
        self
    }

    /// Add an unoccupied order slot.
    pub fn empty_slot(mut self) -> Self {
        self.state.order.push(None);
        self
    }

    pub fn driver(mut self, idx: CarIdx, name: &str, number: u32) -> Self {
        self.state.drivers.insert(
            idx,
            Driver { struct_index: idx, name: name.to_string(), car_number: Some(number) },
        );
        self
    }

    pub fn track_length(mut self, miles: f64) -> Self {
        self.state.track_length = miles;
        self
    }

    pub fn build(mut self) -> RaceState {
        self.state.display_count = self.state.order.len();
        self.state.raw_count = self.state.car_states.len() + 1;
        self.state
    }
}

/// A sparse little-endian image of the game's executable, zero everywhere
/// that was not written.
#[derive(Debug, Clone)]
pub struct GameImage {
    offsets: MemoryOffsets,
    bytes: BTreeMap<u32, u8>,
}

impl GameImage {
    pub fn new(version: MemoryVersion) -> Self {
        Self { offsets: version.offsets(), bytes: BTreeMap::new() }
    }

    fn write(&mut self, offset: u32, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.bytes.insert(offset + i as u32, *byte);
        }
    }

    fn write_i32(&mut self, offset: u32, value: i32) {
        self.write(offset, &value.to_le_bytes());
    }

    pub fn with_cars(mut self, raw_count: i32) -> Self {
        self.write_i32(self.offsets.cars_addr, raw_count);
        self
    }

    pub fn with_total_laps(mut self, laps: i32) -> Self {
        self.write_i32(self.offsets.laps_addr, laps);
        self
    }

    pub fn with_order(mut self, order: &[i32]) -> Self {
        for (i, idx) in order.iter().enumerate() {
            self.write_i32(self.offsets.run_order_base + 4 * i as u32, *idx);
        }
        self
    }

    /// Name for a struct index, using the default slot shift of -1.
    pub fn with_name(mut self, idx: usize, name: &str) -> Self {
        let slot = (idx - 1) * NAME_SLOT_SIZE;
        let mut bytes = name.as_bytes().to_vec();
        bytes.resize(NAME_SLOT_SIZE, 0);
        self.write(self.offsets.driver_names_base + slot as u32, &bytes);
        self
    }

    /// Car number for a struct index, using the default slot shift of -1.
    pub fn with_number(mut self, idx: usize, number: i32) -> Self {
        self.write_i32(self.offsets.car_numbers_base + 4 * (idx as u32 - 1), number);
        self
    }

    /// Write one word of a car's state block.
    pub fn with_car_word(mut self, idx: usize, word: usize, value: u32) -> Self {
        let offset = self.offsets.car_state_base + (idx * CAR_STATE_SIZE + word * 4) as u32;
        self.write(offset, &value.to_le_bytes());
        self
    }

    pub fn with_track_name(mut self, name: &str) -> Self {
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        self.write(self.offsets.current_track_addr, &bytes);
        self
    }

    pub fn with_track_index(mut self, index: i32) -> Self {
        self.write_i32(self.offsets.current_track_addr, index);
        self
    }

    pub fn with_track_length_units(mut self, units: i32) -> Self {
        self.write_i32(self.offsets.track_length_addr, units);
        self
    }
}

impl ProcessMemory for GameImage {
    fn read_bytes(&self, offset: u32, len: usize) -> Result<Vec<u8>> {
        let end = u64::from(offset) + len as u64;
        if end > u64::from(IMAGE_SIZE) {
            return Err(TimingError::memory_read_failed(offset, len));
        }
        Ok((0..len as u32).map(|i| self.bytes.get(&(offset + i)).copied().unwrap_or(0)).collect())
    }
}
