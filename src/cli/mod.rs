//! CLI Module
//!
//! Command-line interface for inspecting VoxProc presets offline.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::dsp::EqBand;

/// VoxProc - vocal EQ, compressor and de-esser chain
#[derive(Parser, Debug)]
#[command(name = "voxproc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the default parameter set as JSON
    #[command(name = "defaults")]
    Defaults,

    /// Load a preset, clamp it and print the result
    #[command(name = "check")]
    Check {
        /// Path to a JSON preset
        path: PathBuf,
    },

    /// Print the equalizer magnitude response
    #[command(name = "response")]
    Response {
        /// JSON preset (defaults when omitted)
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Sample rate in Hz
        #[arg(short, long, default_value_t = 48000.0)]
        sample_rate: f64,

        /// Number of log-spaced points between 20 Hz and 20 kHz
        #[arg(long, default_value_t = 31)]
        points: usize,

        /// Show a single band (hpf, low_shelf, low_mid, mid, high_mid, high_shelf)
        #[arg(short, long)]
        band: Option<EqBand>,
    },

    /// Print the compressor static gain curve
    #[command(name = "curve")]
    Curve {
        /// JSON preset (defaults when omitted)
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// First input level in dBFS
        #[arg(long, default_value_t = -60.0, allow_negative_numbers = true)]
        from: f32,

        /// Last input level in dBFS
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        to: f32,

        /// Step between input levels in dB
        #[arg(long, default_value_t = 3.0)]
        step: f32,
    },
}
