//! Provider polling the game's memory

use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::config::TimingConfig;
use crate::memory::{ProcessMemory, SnapshotReader};
use crate::provider::Provider;
use crate::types::{RaceState, poll_hz};
use crate::Result;

/// Provider reading a fresh [`RaceState`] from game memory every poll period.
///
/// Transient read failures (game not loaded, counters out of range) are logged
/// by the reader and skipped; only persistent errors reach the driver.
pub struct MemoryProvider<M> {
    reader: SnapshotReader<M>,
    /// Created on first use so providers can be built outside a runtime
    interval: Option<Interval>,
    poll_ms: u64,
}

impl<M: ProcessMemory> MemoryProvider<M> {
    pub fn new(memory: M, config: &TimingConfig) -> Self {
        Self::from_reader(SnapshotReader::new(memory, config), config.overlay.poll_ms)
    }

    /// Wrap an already configured reader.
    pub fn from_reader(reader: SnapshotReader<M>, poll_ms: u64) -> Self {
        let poll_ms = poll_ms.max(1);
        info!("Polling {} memory every {}ms", reader.version(), poll_ms);
        Self { reader, interval: None, poll_ms }
    }

    pub fn reader(&self) -> &SnapshotReader<M> {
        &self.reader
    }
}

#[async_trait::async_trait]
impl<M> Provider for MemoryProvider<M>
where
    M: ProcessMemory + Send + 'static,
{
    async fn next_snapshot(&mut self) -> Result<Option<RaceState>> {
        let poll_ms = self.poll_ms;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = interval(Duration::from_millis(poll_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            interval.tick().await;

            match self.reader.read_race_state() {
                Ok(state) => {
                    trace!(cars = state.car_states.len(), "Read race state");
                    return Ok(Some(state));
                }
                Err(e) if e.is_retryable() => {
                    debug!("Skipping poll: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn poll_hz(&self) -> f64 {
        poll_hz(self.poll_ms)
    }
}
