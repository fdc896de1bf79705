//! Replay provider for recorded snapshots

use std::collections::VecDeque;
use std::path::Path;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::provider::Provider;
use crate::types::{RaceState, poll_hz};
use crate::{Result, TimingError};

/// Replay provider playing a YAML list of [`RaceState`] snapshots
///
/// ```yaml
/// - total_laps: 50
///   order: [2, 1]
///   car_states:
///     1: { laps_completed: 3, lap_end_clock: 120000 }
///     2: { laps_completed: 3, lap_end_clock: 118500 }
/// ```
pub struct ReplayProvider {
    snapshots: VecDeque<RaceState>,
    total: usize,
    poll_ms: u64,
    speed: f64,
    /// Created on first use so providers can be built outside a runtime
    interval: Option<Interval>,
}

impl ReplayProvider {
    /// Play snapshots in order, one every `poll_ms`.
    pub fn new(snapshots: Vec<RaceState>, poll_ms: u64) -> Self {
        let poll_ms = poll_ms.max(1);
        let snapshots: VecDeque<RaceState> = snapshots
            .into_iter()
            .map(|mut state| {
                state.fill_struct_indices();
                state
            })
            .collect();
        let total = snapshots.len();
        Self { snapshots, total, poll_ms, speed: 1.0, interval: None }
    }

    /// Parse a YAML list of snapshots.
    pub fn from_yaml_str(yaml: &str, poll_ms: u64) -> Result<Self> {
        let snapshots: Vec<RaceState> = serde_yaml_ng::from_str(yaml).map_err(|e| {
            TimingError::Parse { context: "replay snapshots".to_string(), details: e.to_string() }
        })?;
        Ok(Self::new(snapshots, poll_ms))
    }

    /// Load a YAML replay file.
    pub fn open<P: AsRef<Path>>(path: P, poll_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TimingError::file_error(path.to_path_buf(), e))?;
        let provider = Self::from_yaml_str(&text, poll_ms)?;
        info!("Opened replay {}: {} snapshots", path.display(), provider.total);
        Ok(provider)
    }

    /// Set playback speed
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 10.0);
        self.interval = None;
        debug!("Playback speed set to {}x", self.speed);
    }

    /// Snapshots not yet played
    pub fn remaining(&self) -> usize {
        self.snapshots.len()
    }

    /// Total snapshots in the replay
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

fn pacing(poll_ms: u64, speed: f64) -> Interval {
    let mut interval = interval(Duration::from_secs_f64(poll_ms as f64 / 1000.0 / speed));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[async_trait::async_trait]
impl Provider for ReplayProvider {
    async fn next_snapshot(&mut self) -> Result<Option<RaceState>> {
        if self.snapshots.is_empty() {
            debug!("Reached end of replay");
            return Ok(None);
        }

        let (poll_ms, speed) = (self.poll_ms, self.speed);
        self.interval.get_or_insert_with(|| pacing(poll_ms, speed)).tick().await;

        let state = self.snapshots.pop_front();
        trace!("Snapshot {}/{}", self.total - self.snapshots.len(), self.total);
        Ok(state)
    }

    fn poll_hz(&self) -> f64 {
        poll_hz(self.poll_ms) * self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLAY: &str = "\
- total_laps: 50
  order: [2, 1]
  car_states:
    1: { laps_completed: 3, lap_end_clock: 120000 }
    2: { laps_completed: 3, lap_end_clock: 118500 }
- total_laps: 50
  order: [2, 1]
  car_states:
    1: { laps_completed: 4, lap_end_clock: 160000 }
    2: { laps_completed: 4, lap_end_clock: 158000 }
";

    #[tokio::test(start_paused = true)]
    async fn plays_snapshots_in_order_then_ends() {
        let mut provider = ReplayProvider::from_yaml_str(REPLAY, 100).unwrap();
        assert_eq!(provider.len(), 2);
        assert_eq!(provider.poll_hz(), 10.0);

        let first = provider.next_snapshot().await.unwrap().expect("first snapshot");
        assert_eq!(first.car(1).map(|c| c.struct_index), Some(1));
        assert_eq!(first.car(2).map(|c| c.laps_completed), Some(3));

        let second = provider.next_snapshot().await.unwrap().expect("second snapshot");
        assert_eq!(second.car(1).map(|c| c.laps_completed), Some(4));

        assert_eq!(provider.remaining(), 0);
        assert!(provider.next_snapshot().await.unwrap().is_none());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = ReplayProvider::from_yaml_str("- order: nope", 100).err().expect("parse error");
        assert!(matches!(err, TimingError::Parse { .. }), "{err:?}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let err = ReplayProvider::open("/no/such/replay.yaml", 100).err().expect("file error");
        assert!(matches!(err, TimingError::File { .. }));
    }

    #[test]
    fn speed_is_clamped() {
        let mut provider = ReplayProvider::new(Vec::new(), 250);
        assert!(provider.is_empty());
        provider.set_speed(50.0);
        assert_eq!(provider.poll_hz(), 40.0);
        provider.set_speed(0.0);
        assert_eq!(provider.poll_hz(), 0.4);
    }
}
