//! Snapshot reader over an attached game image
//!
//! [`SnapshotReader`] turns the game's timing tables into a [`RaceState`]. The
//! OS-level attach is behind [`ProcessMemory`] so the decoding logic can run
//! against any byte source.
//!
//! ## Usage Example
//!
//! ```rust
//! use icr2_timing::memory::{ProcessMemory, SnapshotReader};
//! use icr2_timing::{Result, TimingConfig, TimingError};
//!
//! struct Detached;
//!
//! impl ProcessMemory for Detached {
//!     fn read_bytes(&self, offset: u32, len: usize) -> Result<Vec<u8>> {
//!         Err(TimingError::memory_read_failed(offset, len))
//!     }
//! }
//!
//! let mut reader = SnapshotReader::new(Detached, &TimingConfig::default());
//! assert!(reader.read_race_state().is_err());
//! ```

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::decode::{
    decode_car_states, decode_names, decode_numbers, decode_order, decode_track_name,
    read_i32_le, track_length_miles, words_le,
};
use super::layout::{
    CAR_STATE_SIZE, MemoryOffsets, MemoryVersion, NAME_SLOT_SIZE, SlotMapping,
    TRACK_NAME_MAX_LEN,
};
use crate::config::{Limits, TimingConfig};
use crate::types::{Driver, RaceState};
use crate::{Result, TimingError};

/// Byte-level access to the game's executable image.
///
/// Offsets are relative to the executable base. Implementations return
/// [`TimingError::Memory`] when a range cannot be read.
pub trait ProcessMemory {
    fn read_bytes(&self, offset: u32, len: usize) -> Result<Vec<u8>>;

    /// Read one little-endian signed word.
    fn read_i32(&self, offset: u32) -> Result<i32> {
        let bytes = self.read_bytes(offset, 4)?;
        read_i32_le(&bytes, 0).ok_or_else(|| TimingError::memory_read_failed(offset, 4))
    }

    /// Read `count` little-endian signed words. May return fewer on a short read.
    fn read_i32_list(&self, offset: u32, count: usize) -> Result<Vec<i32>> {
        Ok(words_le(&self.read_bytes(offset, count * 4)?))
    }
}

impl<M: ProcessMemory + ?Sized> ProcessMemory for &M {
    fn read_bytes(&self, offset: u32, len: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(offset, len)
    }
}

/// Reads complete race snapshots.
pub struct SnapshotReader<M> {
    memory: M,
    version: MemoryVersion,
    offsets: MemoryOffsets,
    mapping: SlotMapping,
    limits: Limits,
    tracks: Option<TrackDirectory>,
    game_exe: Option<PathBuf>,
    last_read_error: Option<String>,
    read_error_count: u32,
}

impl<M: ProcessMemory> SnapshotReader<M> {
    /// Create a reader for the build named in the configuration.
    pub fn new(memory: M, config: &TimingConfig) -> Self {
        let version = config.memory.version;
        info!(%version, "Initializing snapshot reader");
        Self {
            memory,
            version,
            offsets: version.offsets(),
            mapping: SlotMapping::default(),
            limits: config.limits.clone(),
            tracks: None,
            game_exe: config.memory.game_exe.clone(),
            last_read_error: None,
            read_error_count: 0,
        }
    }

    /// Override how table slots map onto struct indices.
    pub fn with_slot_mapping(mut self, mapping: SlotMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// The build this reader decodes.
    pub fn version(&self) -> MemoryVersion {
        self.version
    }

    /// Consecutive failed reads with the same error message.
    pub fn read_error_count(&self) -> u32 {
        self.read_error_count
    }

    /// Car slots present in memory, pace car included.
    pub fn read_raw_car_count(&self) -> Result<usize> {
        let value = self.memory.read_i32(self.offsets.cars_addr)?;
        match usize::try_from(value) {
            Ok(count) if count > 0 && count <= self.limits.max_cars => Ok(count),
            _ => Err(TimingError::invalid_value("car count", i64::from(value))),
        }
    }

    /// Scheduled race distance in laps.
    pub fn read_total_laps(&self) -> Result<u32> {
        let value = self.memory.read_i32(self.offsets.laps_addr)?;
        match u32::try_from(value) {
            Ok(laps) if laps > 0 && laps <= self.limits.max_laps => Ok(laps),
            _ => Err(TimingError::invalid_value("total laps", i64::from(value))),
        }
    }

    /// Track length in miles, 0 when unknown.
    pub fn read_track_length_miles(&self) -> f64 {
        self.memory.read_i32(self.offsets.track_length_addr).map(track_length_miles).unwrap_or(0.0)
    }

    /// Folder name of the current track.
    pub fn read_current_track(&mut self) -> Result<String> {
        if !self.version.stores_track_index() {
            let bytes =
                self.memory.read_bytes(self.offsets.current_track_addr, TRACK_NAME_MAX_LEN)?;
            return Ok(decode_track_name(&bytes));
        }

        let index = self.memory.read_i32(self.offsets.current_track_addr)?;
        if self.tracks.is_none() {
            let exe = self.game_exe.as_deref().ok_or_else(|| TimingError::Config {
                reason: "memory.game_exe must be set to resolve WINDY track names".into(),
            })?;
            let root = exe.parent().unwrap_or_else(|| Path::new(".")).join("TRACKS");
            self.tracks = Some(TrackDirectory::scan(&root)?);
        }

        let tracks = self.tracks.as_ref().ok_or_else(|| TimingError::Config {
            reason: "track directory unavailable".into(),
        })?;
        usize::try_from(index)
            .ok()
            .and_then(|i| tracks.folder(i))
            .map(str::to_string)
            .ok_or_else(|| TimingError::invalid_value("track index", i64::from(index)))
    }

    /// Read the full race snapshot.
    ///
    /// A failure is logged once per distinct message; repeats are only counted.
    pub fn read_race_state(&mut self) -> Result<RaceState> {
        match self.read_race_state_inner() {
            Ok(state) => {
                if self.last_read_error.take().is_some() {
                    info!("Memory read recovered after {} failures", self.read_error_count);
                    self.read_error_count = 0;
                }
                Ok(state)
            }
            Err(e) => {
                let message = e.to_string();
                if self.last_read_error.as_deref() != Some(message.as_str()) {
                    warn!("Memory read failed: {}", message);
                    self.last_read_error = Some(message);
                    self.read_error_count = 1;
                } else {
                    self.read_error_count += 1;
                }
                Err(e)
            }
        }
    }

    fn read_race_state_inner(&mut self) -> Result<RaceState> {
        let raw_count = self.read_raw_car_count()?;
        if raw_count <= 1 {
            return Err(TimingError::invalid_value("car count", raw_count as i64));
        }
        let display_count = raw_count - 1;
        let total_laps = self.read_total_laps()?;

        let names_blob =
            self.memory.read_bytes(self.offsets.driver_names_base, raw_count * NAME_SLOT_SIZE)?;
        let names = decode_names(&names_blob, raw_count, &self.mapping);

        let number_words = self.memory.read_i32_list(
            self.offsets.car_numbers_base,
            raw_count + self.mapping.numbers_shift.unsigned_abs() + 4,
        )?;
        let numbers = decode_numbers(&number_words, raw_count, &self.mapping);

        let car_blob =
            self.memory.read_bytes(self.offsets.car_state_base, raw_count * CAR_STATE_SIZE)?;
        let car_states = decode_car_states(&car_blob, raw_count);

        let drivers = (0..raw_count)
            .map(|idx| {
                let driver = Driver {
                    struct_index: idx,
                    name: names.get(&idx).cloned().unwrap_or_default(),
                    car_number: numbers.get(&idx).copied().flatten(),
                };
                (idx, driver)
            })
            .collect();

        let order_words = self.memory.read_i32_list(self.offsets.run_order_base, raw_count)?;
        let order =
            decode_order(&order_words, raw_count, display_count, self.mapping.order_index_base);

        let track_length = self.read_track_length_miles();
        let track_name = self.read_current_track()?;

        debug!(raw_count, total_laps, track = %track_name, "Read race state");

        Ok(RaceState {
            raw_count,
            display_count,
            total_laps,
            order,
            drivers,
            car_states,
            track_length,
            track_name,
        })
    }
}

/// Track folders under the game's TRACKS directory, sorted by display name.
///
/// WINDY stores the current track as an index into this list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDirectory {
    /// (folder name, display name)
    entries: Vec<(String, String)>,
}

impl TrackDirectory {
    /// Scan `root` for `<FOLDER>/<FOLDER>.TXT` files carrying a `TNAME` line.
    pub fn scan(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(TimingError::file_error(
                root.to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "TRACKS folder not found"),
            ));
        }

        let dir = std::fs::read_dir(root).map_err(|e| TimingError::file_error(root.into(), e))?;
        let mut entries = Vec::new();
        for entry in dir.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(folder) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };
            let Ok(bytes) = std::fs::read(path.join(format!("{folder}.TXT"))) else {
                continue;
            };
            if let Some(display) = parse_tname(&String::from_utf8_lossy(&bytes)) {
                entries.push((folder, display));
            }
        }

        if entries.is_empty() {
            return Err(TimingError::Parse {
                context: format!("track directory {}", root.display()),
                details: "no valid tracks found".into(),
            });
        }

        Ok(Self::from_entries(entries))
    }

    /// Build from (folder, display name) pairs.
    pub fn from_entries(mut entries: Vec<(String, String)>) -> Self {
        entries.sort_by_key(|(_, display)| display.to_lowercase());
        Self { entries }
    }

    /// Folder name at a track index.
    pub fn folder(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(folder, _)| folder.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extract the value of the first `TNAME` line.
fn parse_tname(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let line = line.trim_start();
        let key = line.get(..5)?;
        if !key.eq_ignore_ascii_case("TNAME") {
            return None;
        }
        let rest = &line[5..];
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let value = rest.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
