//! Game memory decoding
//!
//! - [`layout`]: table offsets per executable build and the per-car block layout
//! - [`decode`]: pure decoders from raw bytes to snapshot types
//! - [`reader`]: assembles a [`crate::RaceState`] from a [`ProcessMemory`] source

pub mod decode;
pub mod layout;
mod reader;

pub use layout::{MemoryOffsets, MemoryVersion, SlotMapping};
pub use reader::{ProcessMemory, SnapshotReader, TrackDirectory};
