//! Driver spawns and manages the snapshot processing task

use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::TimingConfig;
use crate::frame::TimingFrame;
use crate::gap::{GapColors, compute_gaps};
use crate::laps::{BestLapColors, BestLapTracker, LapDisplayMode, LapLogger};
use crate::provider::Provider;
use crate::types::{CarIdx, RaceState};

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Receiver for timing frames; `None` until the first snapshot.
    /// The last frame stays readable after the task ends.
    pub frames: watch::Receiver<Option<Arc<TimingFrame>>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Per-snapshot processing: gaps, best laps and the lap log.
struct FrameBuilder {
    colors: GapColors,
    best_laps: BestLapTracker,
    lap_display: LapDisplayMode,
    player_index: CarIdx,
    lap_log: Option<LapLogger<std::fs::File>>,
    track_name: Option<String>,
    tick: u64,
}

impl FrameBuilder {
    fn new(config: &TimingConfig) -> Self {
        Self {
            colors: GapColors::from(&config.colors),
            best_laps: BestLapTracker::new(BestLapColors::from(&config.colors)),
            lap_display: config.overlay.lap_display,
            player_index: config.overlay.player_index,
            lap_log: config.overlay.lap_log.as_deref().and_then(open_lap_log),
            track_name: None,
            tick: 0,
        }
    }

    fn build(&mut self, state: RaceState) -> TimingFrame {
        self.tick += 1;

        if self.track_name.as_deref() != Some(state.track_name.as_str()) {
            if self.track_name.is_some() {
                debug!("Track changed to '{}', resetting best laps", state.track_name);
            }
            self.best_laps.reset();
            self.track_name = Some(state.track_name.clone());
        }

        self.best_laps.update_from_snapshot(&state);

        if let Some(logger) = self.lap_log.as_mut()
            && let Err(e) = logger.on_snapshot(&state)
        {
            warn!("Lap log disabled: {}", e);
            self.lap_log = None;
        }

        let gaps = compute_gaps(&state, &self.colors);
        let last_laps = self.best_laps.last_laps(&state, self.lap_display).into_iter().collect();
        let player = state.car_states.contains_key(&self.player_index).then_some(self.player_index);

        TimingFrame { tick: self.tick, state, gaps, last_laps, player }
    }
}

fn open_lap_log(path: &Path) -> Option<LapLogger<std::fs::File>> {
    match LapLogger::create(path) {
        Ok(logger) => Some(logger),
        Err(e) => {
            warn!("Cannot open lap log {}: {}", path.display(), e);
            None
        }
    }
}

/// Driver spawns and manages the snapshot processing task
///
/// The task owns the provider, turns each snapshot into a [`TimingFrame`] and
/// publishes it on a watch channel.
pub struct Driver;

impl Driver {
    /// Spawn the driver task for the given provider
    ///
    /// Returns a watch receiver for frames plus a cancellation token for
    /// graceful shutdown.
    pub fn spawn<P>(provider: P, config: &TimingConfig) -> DriverChannels
    where
        P: Provider,
    {
        let (frame_tx, frame_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();
        let builder = FrameBuilder::new(config);

        tokio::spawn(async move {
            Self::snapshot_task(provider, builder, frame_tx, cancel_task).await;
        });

        DriverChannels { frames: frame_rx, cancel }
    }

    async fn snapshot_task<P>(
        mut provider: P,
        mut builder: FrameBuilder,
        frame_tx: watch::Sender<Option<Arc<TimingFrame>>>,
        cancel: CancellationToken,
    ) where
        P: Provider,
    {
        info!("Snapshot task started");
        let mut frame_count = 0u64;
        let mut error_count = 0u32;
        const MAX_ERRORS: u32 = 10;

        loop {
            if cancel.is_cancelled() {
                info!("Snapshot task cancelled");
                break;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Snapshot task cancelled during read");
                    break;
                }
                result = provider.next_snapshot() => result,
            };

            match result {
                Ok(Some(state)) => {
                    frame_count += 1;
                    error_count = 0;

                    let frame = builder.build(state);
                    trace!(
                        "Frame {}: {} cars, gaps {:?}",
                        frame.tick,
                        frame.state.car_states.len(),
                        frame.gaps.status
                    );

                    if frame_tx.send(Some(Arc::new(frame))).is_err() {
                        debug!("Frame receiver dropped, shutting down");
                        break;
                    }
                }
                Ok(None) => {
                    info!("Provider ended after {} snapshots", frame_count);
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Provider error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many provider errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!("Snapshot task ended (processed {} snapshots)", frame_count);
    }
}
