//! Vocal chain
//!
//! Fixed processing order per block:
//! 1. Input trim, then input level measurement
//! 2. Equalizer (HPF and tone bands)
//! 3. Compressor
//! 4. De-esser
//! 5. Output trim, then output level measurement

use tracing::debug;

use super::filter_math::db_to_linear;
use super::{Compressor, DeEsser, Effect, Equalizer};
use crate::engine::{AudioBuffer, ChainParams, MeterReadings, TRIM_RANGE_DB};

/// Equalizer → compressor → de-esser on one shared buffer
#[derive(Debug, Clone)]
pub struct AudioChain {
    equalizer: Equalizer,
    compressor: Compressor,
    deesser: DeEsser,
    input_gain_db: f32,
    output_gain_db: f32,
    input_level: f32,
    output_level: f32,
}

impl AudioChain {
    /// Create a new chain with default parameters
    pub fn new() -> Self {
        Self::with_params(&ChainParams::default())
    }

    /// Create a new chain from a parameter snapshot (clamped)
    pub fn with_params(params: &ChainParams) -> Self {
        let mut chain = Self {
            equalizer: Equalizer::new(),
            compressor: Compressor::new(),
            deesser: DeEsser::new(),
            input_gain_db: 0.0,
            output_gain_db: 0.0,
            input_level: 0.0,
            output_level: 0.0,
        };
        chain.apply_params(params);
        chain
    }

    /// Prepare all stages for processing
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        for stage in self.stages_mut() {
            stage.prepare(sample_rate, max_block_size);
        }
        self.input_level = 0.0;
        self.output_level = 0.0;
        debug!(sample_rate, max_block_size, "audio chain prepared");
    }

    /// Reset all stage state and meters, keeping parameters
    pub fn reset(&mut self) {
        for stage in self.stages_mut() {
            stage.reset();
        }
        self.input_level = 0.0;
        self.output_level = 0.0;
        debug!("audio chain reset");
    }

    /// Push a parameter snapshot through every stage's setters
    pub fn apply_params(&mut self, params: &ChainParams) {
        self.input_gain_db = params.input_gain_db.clamp(TRIM_RANGE_DB.0, TRIM_RANGE_DB.1);
        self.output_gain_db = params.output_gain_db.clamp(TRIM_RANGE_DB.0, TRIM_RANGE_DB.1);
        self.equalizer.apply_params(&params.eq);
        self.compressor.apply_params(&params.compressor);
        self.deesser.apply_params(&params.deesser);
    }

    /// Apply this block's parameters, then process the buffer in place
    pub fn process(&mut self, buffer: &mut AudioBuffer, params: &ChainParams) {
        self.apply_params(params);
        self.process_block(buffer);
    }

    /// Process the buffer with the parameters already applied
    pub fn process_block(&mut self, buffer: &mut AudioBuffer) {
        buffer.apply_gain(db_to_linear(self.input_gain_db));
        self.input_level = buffer.peak_magnitude();

        for stage in self.stages_mut() {
            stage.process(buffer);
        }

        buffer.apply_gain(db_to_linear(self.output_gain_db));
        self.output_level = buffer.peak_magnitude();
    }

    /// Current parameter values as held by the stages
    pub fn params(&self) -> ChainParams {
        ChainParams {
            input_gain_db: self.input_gain_db,
            output_gain_db: self.output_gain_db,
            eq: self.equalizer.params().clone(),
            compressor: self.compressor.params().clone(),
            deesser: self.deesser.params().clone(),
        }
    }

    /// Meter values from the last processed block
    pub fn meters(&self) -> MeterReadings {
        MeterReadings {
            input_level: self.input_level,
            output_level: self.output_level,
            compressor_reduction_db: self.compressor.gain_reduction_db(),
            deesser_reduction_db: self.deesser.gain_reduction_db(),
            deesser_active: self.deesser.is_active(),
        }
    }

    pub fn equalizer(&self) -> &Equalizer {
        &self.equalizer
    }

    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    pub fn deesser(&self) -> &DeEsser {
        &self.deesser
    }

    /// Stages in processing order
    fn stages_mut(&mut self) -> [&mut dyn Effect; 3] {
        [&mut self.equalizer, &mut self.compressor, &mut self.deesser]
    }
}

impl Default for AudioChain {
    fn default() -> Self {
        Self::new()
    }
}
