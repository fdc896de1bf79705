//! Provider trait for snapshot sources

use crate::Result;
use crate::types::RaceState;

/// Trait for race snapshot sources
///
/// Providers abstract over where snapshots come from (game memory, recorded
/// replays) and handle their own pacing.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Get the next race snapshot
    ///
    /// Returns:
    /// - `Ok(Some(state))` - New snapshot available
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Error occurred
    ///
    /// Each provider paces itself:
    /// - Memory: waits for the next poll tick
    /// - Replay: plays recorded snapshots at the configured rate
    async fn next_snapshot(&mut self) -> Result<Option<RaceState>>;

    /// Snapshot rate in Hz
    fn poll_hz(&self) -> f64;
}
