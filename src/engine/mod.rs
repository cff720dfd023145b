//! Host-facing engine types
//!
//! - Audio buffer handed through the chain
//! - Per-block parameter snapshots and the lock-free parameter store
//! - Meter readback for a UI thread

pub mod buffer;
pub mod meters;
pub mod params;

pub use buffer::{AudioBuffer, ChannelLayout};
pub use meters::{MeterReadings, SharedMeters};
pub use params::{AtomicF32, ChainParams, ParamId, SharedParams, TRIM_RANGE_DB};
