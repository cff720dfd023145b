//! Metering readback
//!
//! The audio thread publishes one `MeterReadings` per block; a UI thread
//! loads them at its own rate. Nothing here feeds back into the signal path.

use serde::Serialize;

use super::params::AtomicF32;

/// Meter values after one processed block
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MeterReadings {
    /// Block peak magnitude after the input trim (linear)
    pub input_level: f32,
    /// Block peak magnitude after the output trim (linear)
    pub output_level: f32,
    /// Smoothed compressor gain reduction in dB
    pub compressor_reduction_db: f32,
    /// Smoothed de-esser gain reduction in dB
    pub deesser_reduction_db: f32,
    /// De-esser activity indicator
    pub deesser_active: bool,
}

/// Lock-free meter store shared with a UI thread
#[derive(Debug, Default)]
pub struct SharedMeters {
    input_level: AtomicF32,
    output_level: AtomicF32,
    compressor_reduction_db: AtomicF32,
    deesser_reduction_db: AtomicF32,
    deesser_active: AtomicF32,
}

impl SharedMeters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a block's readings (audio thread)
    pub fn publish(&self, readings: &MeterReadings) {
        self.input_level.store(readings.input_level);
        self.output_level.store(readings.output_level);
        self.compressor_reduction_db
            .store(readings.compressor_reduction_db);
        self.deesser_reduction_db.store(readings.deesser_reduction_db);
        self.deesser_active
            .store(if readings.deesser_active { 1.0 } else { 0.0 });
    }

    /// Latest published readings (any thread)
    ///
    /// Fields are loaded one by one, so a reading may mix two adjacent
    /// blocks.
    pub fn load(&self) -> MeterReadings {
        MeterReadings {
            input_level: self.input_level.load(),
            output_level: self.output_level.load(),
            compressor_reduction_db: self.compressor_reduction_db.load(),
            deesser_reduction_db: self.deesser_reduction_db.load(),
            deesser_active: self.deesser_active.load() > 0.5,
        }
    }
}
