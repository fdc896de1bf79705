//! Last lap column and lap log
//!
//! [`BestLapTracker`] remembers personal and overall best laps across snapshots
//! and classifies each car's last lap for display. [`LapLogger`] appends one CSV
//! row per completed lap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ColorSettings;
use crate::gap::GapDisplay;
use crate::types::{CarIdx, LapClock, RaceState};
use crate::{Result, TimingError};

/// What the last lap column shows.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LapDisplayMode {
    /// Lap time as `M:SS.mmm`
    #[default]
    Time,
    /// Average lap speed in mph
    Speed,
}

/// Format a lap time as `M:SS.mmm`.
pub fn format_lap_time(ms: u32) -> String {
    let rem = ms % 60_000;
    format!("{}:{:02}.{:03}", ms / 60_000, rem / 1000, rem % 1000)
}

/// Average speed in mph over one lap, with three decimals.
fn format_lap_speed(track_length_miles: f64, ms: u32) -> String {
    format!("{:.3}", track_length_miles * 3_600_000.0 / f64::from(ms))
}

/// Colour hints for best laps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestLapColors {
    pub global: String,
    pub personal: String,
}

impl Default for BestLapColors {
    fn default() -> Self {
        Self::from(&ColorSettings::default())
    }
}

impl From<&ColorSettings> for BestLapColors {
    fn from(colors: &ColorSettings) -> Self {
        Self { global: colors.best_global.clone(), personal: colors.best_personal.clone() }
    }
}

/// Personal and overall best lap times seen so far.
#[derive(Default, Debug, Clone)]
pub struct BestLapTracker {
    personal_bests: HashMap<CarIdx, u32>,
    global_best: Option<u32>,
    colors: BestLapColors,
}

impl BestLapTracker {
    pub fn new(colors: BestLapColors) -> Self {
        Self { personal_bests: HashMap::new(), global_best: None, colors }
    }

    /// Forget every best lap, e.g. when a new session starts.
    pub fn reset(&mut self) {
        self.personal_bests.clear();
        self.global_best = None;
    }

    /// Fold the valid last laps of a snapshot into the bests.
    pub fn update_from_snapshot(&mut self, state: &RaceState) {
        for (&idx, car) in &state.car_states {
            let Some(car) = car else { continue };
            if !car.last_lap_valid || car.last_lap_ms == 0 {
                continue;
            }
            let ms = car.last_lap_ms;

            let best = self.personal_bests.entry(idx).or_insert(ms);
            *best = (*best).min(ms);

            if self.global_best.is_none_or(|global| ms < global) {
                self.global_best = Some(ms);
            }
        }
    }

    pub fn personal_best_ms(&self, idx: CarIdx) -> Option<u32> {
        self.personal_bests.get(&idx).copied()
    }

    pub fn global_best_ms(&self) -> Option<u32> {
        self.global_best
    }

    /// Text and colour of a car's last lap.
    ///
    /// A lap matching the overall best is coloured as such only when it is also
    /// that car's personal best.
    pub fn classify_last_lap(
        &self,
        idx: CarIdx,
        last_ms: u32,
        valid: bool,
        mode: LapDisplayMode,
        track_length: Option<f64>,
    ) -> GapDisplay {
        if !valid || last_ms == 0 {
            return GapDisplay::blank();
        }

        let text = match (mode, track_length) {
            (LapDisplayMode::Speed, Some(miles)) if miles > 0.0 => format_lap_speed(miles, last_ms),
            _ => format_lap_time(last_ms),
        };

        if self.personal_best_ms(idx) != Some(last_ms) {
            return GapDisplay::plain(text);
        }
        if self.global_best == Some(last_ms) {
            GapDisplay::colored(text, &self.colors.global)
        } else {
            GapDisplay::colored(text, &self.colors.personal)
        }
    }

    /// Last lap cell for every car in the snapshot.
    pub fn last_laps(&self, state: &RaceState, mode: LapDisplayMode) -> Vec<(CarIdx, GapDisplay)> {
        let track_length = Some(state.track_length).filter(|miles| *miles > 0.0);
        state
            .car_states
            .iter()
            .map(|(&idx, car)| {
                let cell = match car {
                    Some(car) => self.classify_last_lap(
                        idx,
                        car.last_lap_ms,
                        car.last_lap_valid,
                        mode,
                        track_length,
                    ),
                    None => GapDisplay::blank(),
                };
                (idx, cell)
            })
            .collect()
    }
}

/// One row of the lap log.
#[derive(Debug, Serialize)]
struct LapRow {
    timestamp_s: f64,
    car_number: Option<u32>,
    lap: u32,
    /// Seconds, despite the column name
    last_lap_ms: f64,
}

const LAP_LOG_HEADER: [&str; 4] = ["timestamp_s", "car_number", "lap", "last_lap_ms"];

/// CSV lap log, one row each time a car completes a valid lap.
pub struct LapLogger<W: io::Write> {
    writer: csv::Writer<W>,
    last_end_clock: HashMap<CarIdx, Option<LapClock>>,
}

/// Log file for a session started at `started`: `<stem>_<YYYY-mm-dd_HH-MM-SS>.<ext>`
/// next to `base`. The extension defaults to `csv`.
pub fn session_log_path(base: &Path, started: chrono::NaiveDateTime) -> PathBuf {
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("telemetry_laps");
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    let name = format!("{}_{}.{}", stem, started.format("%Y-%m-%d_%H-%M-%S"), ext);
    base.with_file_name(name)
}

impl LapLogger<File> {
    /// Start a new session log next to `base`, named after the local time.
    pub fn create<P: AsRef<Path>>(base: P) -> Result<Self> {
        let path = session_log_path(base.as_ref(), chrono::Local::now().naive_local());
        Self::create_at(&path)
    }

    /// Create a log file, and its parent directories, truncating any existing file.
    pub fn create_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| TimingError::file_error(parent.to_path_buf(), e))?;
        }
        let file = File::create(path).map_err(|e| TimingError::file_error(path.to_path_buf(), e))?;
        info!("Logging laps to {}", path.display());
        Self::new(file)
    }
}

impl<W: io::Write> LapLogger<W> {
    /// Wrap a writer and emit the header row.
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(LAP_LOG_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, last_end_clock: HashMap::new() })
    }

    /// Log the laps completed since the previous snapshot. Returns the rows written.
    pub fn on_snapshot(&mut self, state: &RaceState) -> Result<usize> {
        let mut written = 0;
        for (&idx, car) in &state.car_states {
            let Some(car) = car else { continue };
            if !car.last_lap_valid {
                continue;
            }
            if self.last_end_clock.get(&idx) == Some(&car.lap_end_clock) {
                continue;
            }
            self.last_end_clock.insert(idx, car.lap_end_clock);

            if car.last_lap_ms == 0 {
                continue;
            }

            let row = LapRow {
                timestamp_s: f64::from(car.lap_end_clock.map_or(0, LapClock::millis)) / 1000.0,
                car_number: state.car_number(idx),
                lap: car.laps_completed,
                last_lap_ms: f64::from(car.last_lap_ms) / 1000.0,
            };
            debug!(car = idx, lap = row.lap, "Lap logged");
            self.writer.serialize(row)?;
            written += 1;
        }

        if written > 0 {
            self.writer.flush()?;
        }
        Ok(written)
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| TimingError::from(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RaceBuilder, timed_car};
    use proptest::prelude::*;

    fn tracker() -> BestLapTracker {
        BestLapTracker::new(BestLapColors { global: "purple".into(), personal: "green".into() })
    }

    #[test]
    fn lap_time_format() {
        assert_eq!(format_lap_time(0), "0:00.000");
        assert_eq!(format_lap_time(41_003), "0:41.003");
        assert_eq!(format_lap_time(65_250), "1:05.250");
        assert_eq!(format_lap_time(600_000), "10:00.000");
    }

    #[test]
    fn bests_track_minimum_valid_laps() {
        let mut tracker = tracker();
        let state = RaceBuilder::new()
            .car(timed_car(1, 3, 0, 40_000))
            .car(timed_car(2, 3, 0, 41_000))
            .build();
        tracker.update_from_snapshot(&state);

        let mut invalid = timed_car(1, 4, 40_000, 70_000);
        invalid.last_lap_valid = false;
        let state = RaceBuilder::new()
            .car(invalid)
            .car(timed_car(2, 4, 41_000, 80_500))
            .missing(3)
            .build();
        tracker.update_from_snapshot(&state);

        assert_eq!(tracker.personal_best_ms(1), Some(40_000));
        assert_eq!(tracker.personal_best_ms(2), Some(39_500));
        assert_eq!(tracker.personal_best_ms(3), None);
        assert_eq!(tracker.global_best_ms(), Some(39_500));

        tracker.reset();
        assert_eq!(tracker.global_best_ms(), None);
        assert_eq!(tracker.personal_best_ms(2), None);
    }

    #[test]
    fn classify_colors_bests() {
        let mut tracker = tracker();
        let state = RaceBuilder::new()
            .car(timed_car(1, 3, 0, 40_000))
            .car(timed_car(2, 3, 0, 41_000))
            .build();
        tracker.update_from_snapshot(&state);

        let global = tracker.classify_last_lap(1, 40_000, true, LapDisplayMode::Time, None);
        assert_eq!(global, GapDisplay::colored("0:40.000", "purple"));

        let personal = tracker.classify_last_lap(2, 41_000, true, LapDisplayMode::Time, None);
        assert_eq!(personal, GapDisplay::colored("0:41.000", "green"));

        let slower = tracker.classify_last_lap(2, 42_000, true, LapDisplayMode::Time, None);
        assert_eq!(slower, GapDisplay::plain("0:42.000"));

        // equal to the overall best but never recorded for this car
        let unknown = tracker.classify_last_lap(7, 40_000, true, LapDisplayMode::Time, None);
        assert_eq!(unknown, GapDisplay::plain("0:40.000"));
    }

    #[test]
    fn classify_blank_and_speed() {
        let tracker = tracker();
        assert_eq!(
            tracker.classify_last_lap(1, 40_000, false, LapDisplayMode::Time, None),
            GapDisplay::blank()
        );
        assert_eq!(
            tracker.classify_last_lap(1, 0, true, LapDisplayMode::Time, None),
            GapDisplay::blank()
        );
        assert_eq!(
            tracker.classify_last_lap(1, 40_000, true, LapDisplayMode::Speed, Some(2.5)),
            GapDisplay::plain("225.000")
        );
        assert_eq!(
            tracker.classify_last_lap(1, 40_000, true, LapDisplayMode::Speed, None),
            GapDisplay::plain("0:40.000")
        );
    }

    #[test]
    fn last_laps_covers_every_car() {
        let mut tracker = tracker();
        let state = RaceBuilder::new()
            .car(timed_car(1, 3, 0, 40_000))
            .missing(2)
            .track_length(2.5)
            .build();
        tracker.update_from_snapshot(&state);
        let cells = tracker.last_laps(&state, LapDisplayMode::Speed);
        assert_eq!(
            cells,
            vec![(1, GapDisplay::colored("225.000", "purple")), (2, GapDisplay::blank())]
        );
    }

    fn logged(logger: LapLogger<Vec<u8>>) -> String {
        String::from_utf8(logger.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn logger_writes_header_and_new_laps_only() {
        let mut logger = LapLogger::new(Vec::new()).unwrap();
        let state = RaceBuilder::new()
            .car(timed_car(1, 5, 100_000, 141_250))
            .driver(1, "Al Unser", 2)
            .build();

        assert_eq!(logger.on_snapshot(&state).unwrap(), 1);
        assert_eq!(logger.on_snapshot(&state).unwrap(), 0);

        let state = RaceBuilder::new()
            .car(timed_car(1, 6, 141_250, 182_000))
            .car(timed_car(4, 6, 141_000, 183_001))
            .build();
        assert_eq!(logger.on_snapshot(&state).unwrap(), 2);

        assert_eq!(
            logged(logger),
            "timestamp_s,car_number,lap,last_lap_ms\n\
             141.25,2,5,41.25\n\
             182.0,,6,40.75\n\
             183.001,,6,42.001\n"
        );
    }

    #[test]
    fn logger_skips_invalid_and_zero_laps() {
        let mut logger = LapLogger::new(Vec::new()).unwrap();
        let mut invalid = timed_car(1, 5, 0, 41_000);
        invalid.last_lap_valid = false;
        let zero = timed_car(2, 5, 41_000, 41_000);
        let state = RaceBuilder::new().car(invalid).car(zero).missing(3).build();
        assert_eq!(logger.on_snapshot(&state).unwrap(), 0);

        // the zero lap consumed its clock; the invalid one did not
        let state = RaceBuilder::new()
            .car(timed_car(1, 5, 0, 41_000))
            .car(timed_car(2, 5, 0, 41_000))
            .build();
        assert_eq!(logger.on_snapshot(&state).unwrap(), 1);
        assert_eq!(logged(logger), "timestamp_s,car_number,lap,last_lap_ms\n41.0,,5,41.0\n");
    }

    #[test]
    fn create_makes_parent_directories() {
        let dir = std::env::temp_dir().join(format!("icr2-laps-{}", std::process::id()));
        let path = dir.join("nested").join("laps.csv");
        let logger = LapLogger::create_at(&path).unwrap();
        drop(logger);
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(text, "timestamp_s,car_number,lap,last_lap_ms\n");
    }

    fn started(h: u32, m: u32, s: u32) -> chrono::NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 5, 26).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn session_paths_carry_start_time() {
        let base = Path::new("logs").join("laps.csv");
        assert_eq!(
            session_log_path(&base, started(13, 5, 9)),
            Path::new("logs").join("laps_2024-05-26_13-05-09.csv")
        );
        assert_eq!(
            session_log_path(Path::new("telemetry"), started(0, 0, 0)),
            Path::new("telemetry_2024-05-26_00-00-00.csv")
        );
    }

    #[test]
    fn sessions_do_not_overwrite_each_other() {
        let dir = std::env::temp_dir().join(format!("icr2-sessions-{}", std::process::id()));
        let base = dir.join("laps.csv");

        let first = session_log_path(&base, started(10, 0, 0));
        let mut logger = LapLogger::create_at(&first).unwrap();
        let state = RaceBuilder::new().car(timed_car(1, 3, 0, 40_000)).build();
        assert_eq!(logger.on_snapshot(&state).unwrap(), 1);
        drop(logger);

        let second = session_log_path(&base, started(10, 30, 0));
        drop(LapLogger::create_at(&second).unwrap());

        let first_text = std::fs::read_to_string(&first).unwrap();
        let second_text = std::fs::read_to_string(&second).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(first_text.lines().count(), 2);
        assert_eq!(second_text.lines().count(), 1);
    }

    proptest! {
        #[test]
        fn global_best_is_minimum_of_personal_bests(
            laps in prop::collection::vec((1usize..6, 1u32..200_000, any::<bool>()), 0..40)
        ) {
            let mut tracker = BestLapTracker::default();
            for (idx, ms, valid) in &laps {
                let mut car = timed_car(*idx, 1, 0, *ms);
                car.last_lap_valid = *valid;
                tracker.update_from_snapshot(&RaceBuilder::new().car(car).build());
            }
            let min_personal = (1..6).filter_map(|idx| tracker.personal_best_ms(idx)).min();
            prop_assert_eq!(tracker.global_best_ms(), min_personal);
            let expected = laps.iter().filter(|(_, _, valid)| *valid).map(|(_, ms, _)| *ms).min();
            prop_assert_eq!(tracker.global_best_ms(), expected);
        }
    }
}
