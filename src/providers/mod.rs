//! Snapshot providers

pub mod memory;
pub mod replay;

pub use memory::MemoryProvider;
pub use replay::ReplayProvider;
