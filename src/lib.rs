//! VoxProc - Vocal Processing Chain
//!
//! A fixed vocal channel strip for real-time hosts:
//! 1. Equalizer - high-pass plus five tone bands
//! 2. Compressor - feed-forward, stereo-linked, soft knee
//! 3. De-esser - band-pass detector with split-band or wideband reduction
//!
//! # Architecture
//!
//! - `dsp`: filter math, the three stages and the `AudioChain` orchestrator
//! - `engine`: audio buffers, parameter snapshots and the lock-free
//!   parameter/meter bridge to a host
//! - `cli`: offline inspection commands (presets, EQ response, compressor curve)
//!
//! Processing is in place on a mono or stereo `AudioBuffer`. Nothing on the
//! audio path allocates or returns errors.

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;

pub use dsp::AudioChain;
pub use engine::{AudioBuffer, ChainParams};
pub use error::{Result, VoxError};
