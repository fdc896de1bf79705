//! Timing connection: one driver task feeding any number of subscribers

use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TimingConfig;
use crate::driver::Driver;
use crate::frame::TimingFrame;
use crate::memory::ProcessMemory;
use crate::provider::Provider;
use crate::providers::{MemoryProvider, ReplayProvider};
use crate::stream::ThrottleExt;
use crate::types::UpdateRate;
use crate::Result;


/// How long [`TimingConnection::replay`] waits for the first frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection to a snapshot source
///
/// Frames are computed once by the driver task and shared with every
/// subscriber. Dropping the connection stops the task.
pub struct TimingConnection {
    /// Frame watch receiver
    frames: watch::Receiver<Option<Arc<TimingFrame>>>,

    /// Source frequency
    poll_hz: f64,

    /// Cancellation token for stopping tasks
    cancel: CancellationToken,
}

impl TimingConnection {
    /// Start a connection over any provider.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_provider<P: Provider>(provider: P, config: &TimingConfig) -> Self {
        let poll_hz = provider.poll_hz();
        let channels = Driver::spawn(provider, config);
        debug!("Timing connection started ({}Hz)", poll_hz);
        Self { frames: channels.frames, poll_hz, cancel: channels.cancel }
    }

    /// Poll the game's memory.
    ///
    /// Does not wait for a frame: the game may not have a race loaded yet.
    pub fn memory<M>(memory: M, config: &TimingConfig) -> Self
    where
        M: ProcessMemory + Send + 'static,
    {
        info!("Connecting to game memory ({})", config.memory.version);
        Self::from_provider(MemoryProvider::new(memory, config), config)
    }

    /// Open a YAML replay of recorded snapshots.
    ///
    /// Waits for the first frame to be available before returning so that
    /// [`current`](Self::current) is populated.
    pub async fn replay<P: AsRef<Path>>(path: P, config: &TimingConfig) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening replay: {}", path.display());

        let provider = ReplayProvider::open(path, config.overlay.poll_ms)?;
        let connection = Self::from_provider(provider, config);

        if connection.wait_for_frame(FIRST_FRAME_TIMEOUT).await.is_none() {
            warn!("Timeout waiting for first frame from replay file");
        }

        info!("Replay connection opened ({}Hz)", connection.poll_hz);
        Ok(connection)
    }

    /// Subscribe to timing frames
    ///
    /// Every subscriber gets the current frame first. With
    /// [`UpdateRate::Max`] below the poll rate, frames are sampled latest-wins.
    pub fn subscribe(&self, rate: UpdateRate) -> impl Stream<Item = Arc<TimingFrame>> + 'static {
        let frames = WatchStream::new(self.frames.clone()).filter_map(|opt| async move { opt });

        match rate.sample_interval(self.poll_hz) {
            None => frames.boxed(),
            Some(interval) => frames.throttle(interval).boxed(),
        }
    }

    /// The latest frame, if any has been produced
    pub fn current(&self) -> Option<Arc<TimingFrame>> {
        self.frames.borrow().clone()
    }

    /// Wait until a frame is available, up to `timeout`.
    pub async fn wait_for_frame(&self, timeout: Duration) -> Option<Arc<TimingFrame>> {
        let mut frames = self.frames.clone();
        let result = tokio::time::timeout(timeout, frames.wait_for(Option::is_some)).await;
        match result {
            Ok(Ok(frame)) => frame.clone(),
            _ => None,
        }
    }

    /// Get the source snapshot frequency
    pub fn poll_hz(&self) -> f64 {
        self.poll_hz
    }
}

impl Drop for TimingConnection {
    fn drop(&mut self) {
        debug!("Dropping timing connection");
        self.cancel.cancel();
    }
}
