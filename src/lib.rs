//! Timing core for IndyCar Racing II overlays.
//!
//! Reads race snapshots out of the running game (or a recorded replay) and
//! derives the columns a timing overlay shows: the gap to the leader, laps
//! down, pit and retirement status, and colour-coded best laps.
//!
//! # Features
//!
//! - **Gap Engine**: pure, total gap computation with 32-bit clock wraparound
//! - **Memory Decoding**: REND32A, DOS and WINDY builds of the executable
//! - **Best Laps**: personal and overall bests, CSV lap log
//! - **Streaming**: one driver task per connection, throttled subscriptions
//!
//! ## Example (replay)
//!
//! ```rust,no_run
//! use icr2_timing::{TimingConfig, TimingConnection, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> icr2_timing::Result<()> {
//!     let config = TimingConfig::load("settings.yaml")?;
//!     let connection = TimingConnection::replay("race.yaml", &config).await?;
//!     let mut frames = Box::pin(connection.subscribe(UpdateRate::Max(4)));
//!
//!     while let Some(frame) = frames.next().await {
//!         for (idx, gap) in frame.rows() {
//!             println!("{:>3} {}", idx, gap.text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example (gap column only)
//!
//! ```rust
//! use icr2_timing::gap::{GapColors, compute_gaps, format_time_diff};
//! use icr2_timing::RaceState;
//!
//! let report = compute_gaps(&RaceState::default(), &GapColors::default());
//! assert!(report.gaps.is_empty());
//! assert_eq!(format_time_diff(65_250), "+1:05.250");
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod frame;
pub mod gap;
pub mod laps;
pub mod memory;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Stream-based timing architecture
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;
pub mod stream;

// Core exports
pub use config::TimingConfig;
pub use error::*;
pub use types::*;

// Main API exports
pub use connection::TimingConnection;
pub use frame::TimingFrame;
pub use gap::{GapColors, GapDisplay, GapReport, GapStatus, compute_gaps, format_time_diff};
pub use laps::{BestLapTracker, LapDisplayMode, LapLogger};
