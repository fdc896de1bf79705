//! Memory layout of the game's timing tables
//!
//! Base offsets differ per executable build; the per-car block layout is
//! shared by all builds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TimingError;

/// Size of one per-car state block in bytes.
pub const CAR_STATE_SIZE: usize = 0x214;
/// Number of 32-bit words in a car state block.
pub const CAR_STATE_WORDS: usize = CAR_STATE_SIZE / 4;
/// Size of one driver name slot in bytes.
pub const NAME_SLOT_SIZE: usize = 26;
/// Longest track name stored by the DOS builds.
pub const TRACK_NAME_MAX_LEN: usize = 256;
/// Value the game writes into a lap clock that has not been stamped yet.
pub const CLOCK_SENTINEL: u32 = 0xFF00_0000;
/// Track length units per inch.
pub const TRACK_UNITS_PER_INCH: f64 = 500.0;

/// Word indices inside a car state block.
pub mod field {
    pub const DLAT: usize = 11;
    pub const LAP_END_CLOCK: usize = 22;
    pub const LAP_START_CLOCK: usize = 23;
    pub const LAPS_DOWN: usize = 24;
    pub const DLONG: usize = 31;
    pub const LAPS_LEFT: usize = 32;
    pub const FUEL_LAPS_REMAINING: usize = 35;
    pub const CAR_STATUS: usize = 37;
    pub const CURRENT_LAP: usize = 38;
    pub const CURRENT_LP: usize = 52;
}

/// Values above these are treated as garbage and read as 0.
pub const MAX_LAPS_DOWN: u32 = 100;
pub const MAX_CAR_STATUS: u32 = 16;

/// Supported executable builds.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MemoryVersion {
    /// Rendition (3D accelerated) DOS build
    #[default]
    Rend32a,
    /// Original DOS build
    Dos,
    /// Windows build
    Windy,
}

/// Base offsets of the timing tables, relative to the executable base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOffsets {
    pub run_order_base: u32,
    pub car_numbers_base: u32,
    pub driver_names_base: u32,
    pub cars_addr: u32,
    pub laps_addr: u32,
    pub car_state_base: u32,
    pub track_length_addr: u32,
    pub current_track_addr: u32,
}

/// How table slots map onto struct indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMapping {
    /// 1 if the running order stores 1-based struct indices
    pub order_index_base: usize,
    pub names_index_base: isize,
    pub names_shift: isize,
    pub numbers_index_base: isize,
    pub numbers_shift: isize,
}

impl Default for SlotMapping {
    fn default() -> Self {
        Self {
            order_index_base: 0,
            names_index_base: 0,
            names_shift: -1,
            numbers_index_base: 0,
            numbers_shift: -1,
        }
    }
}

impl MemoryVersion {
    /// Table offsets for this build.
    pub fn offsets(self) -> MemoryOffsets {
        match self {
            MemoryVersion::Rend32a => MemoryOffsets {
                run_order_base: 0x000E_F638,
                car_numbers_base: 0x000E_DE88,
                driver_names_base: 0x000E_DF3E,
                cars_addr: 0x000E_71A8,
                laps_addr: 0x000B_8C98,
                car_state_base: 0x000E_1DC4,
                track_length_addr: 0x000F_15BC,
                current_track_addr: 0x000F_823D,
            },
            MemoryVersion::Dos => MemoryOffsets {
                run_order_base: 0x000D_AA1C,
                car_numbers_base: 0x000C_B700,
                driver_names_base: 0x000C_AD8E,
                cars_addr: 0x000D_AA18,
                laps_addr: 0x000A_D578,
                car_state_base: 0x000D_5638,
                track_length_addr: 0x000D_FFB4,
                current_track_addr: 0x000E_2EE9,
            },
            MemoryVersion::Windy => MemoryOffsets {
                run_order_base: 0x0050_FD64,
                car_numbers_base: 0x0051_5120,
                driver_names_base: 0x0051_53B6,
                cars_addr: 0x0052_4664,
                laps_addr: 0x004F_1DBC,
                car_state_base: 0x0051_DC5C,
                track_length_addr: 0x0052_7C00,
                current_track_addr: 0x0052_7D58,
            },
        }
    }

    /// Canonical name as written in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryVersion::Rend32a => "REND32A",
            MemoryVersion::Dos => "DOS",
            MemoryVersion::Windy => "WINDY",
        }
    }

    /// WINDY stores a track index instead of the folder name.
    pub fn stores_track_index(self) -> bool {
        matches!(self, MemoryVersion::Windy)
    }
}

impl fmt::Display for MemoryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryVersion {
    type Err = TimingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REND32A" => Ok(MemoryVersion::Rend32a),
            "DOS" => Ok(MemoryVersion::Dos),
            "WINDY" => Ok(MemoryVersion::Windy),
            _ => Err(TimingError::UnsupportedVersion { version: s.to_string() }),
        }
    }
}

impl TryFrom<String> for MemoryVersion {
    type Error = TimingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MemoryVersion> for String {
    fn from(version: MemoryVersion) -> Self {
        version.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parsing_is_case_insensitive() {
        assert_eq!("rend32a".parse::<MemoryVersion>().unwrap(), MemoryVersion::Rend32a);
        assert_eq!(" Dos ".parse::<MemoryVersion>().unwrap(), MemoryVersion::Dos);
        assert_eq!("WINDY".parse::<MemoryVersion>().unwrap(), MemoryVersion::Windy);
        assert!(matches!(
            "N64".parse::<MemoryVersion>(),
            Err(TimingError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn car_block_fields_fit_in_block() {
        assert_eq!(CAR_STATE_WORDS, 133);
        for word in [
            field::DLAT,
            field::LAP_END_CLOCK,
            field::LAP_START_CLOCK,
            field::LAPS_DOWN,
            field::DLONG,
            field::LAPS_LEFT,
            field::FUEL_LAPS_REMAINING,
            field::CAR_STATUS,
            field::CURRENT_LAP,
            field::CURRENT_LP,
        ] {
            assert!(word < CAR_STATE_WORDS);
        }
    }

    #[test]
    fn each_build_has_distinct_car_tables() {
        let rend = MemoryVersion::Rend32a.offsets();
        let dos = MemoryVersion::Dos.offsets();
        let windy = MemoryVersion::Windy.offsets();
        assert_ne!(rend.car_state_base, dos.car_state_base);
        assert_ne!(dos.car_state_base, windy.car_state_base);
        assert!(MemoryVersion::Windy.stores_track_index());
        assert!(!MemoryVersion::Dos.stores_track_index());
    }

    #[test]
    fn version_serializes_as_canonical_name() {
        let yaml = serde_yaml_ng::to_string(&MemoryVersion::Windy).unwrap();
        assert_eq!(yaml.trim(), "WINDY");
    }
}
