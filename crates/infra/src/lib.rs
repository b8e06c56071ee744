//! Ostinato infrastructure: adapters behind the core's ports.

pub mod memory;

pub use memory::{MemoryClipRepository, MemoryEventBus, MemoryTrackRepository};
