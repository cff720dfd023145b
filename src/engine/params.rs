//! Chain parameters
//!
//! `ChainParams` is the plain per-block snapshot the chain applies to its
//! stages. `SharedParams` is the lock-free store a host or UI thread writes
//! into; the audio thread takes one snapshot per block.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::dsp::{CompressorParams, DeEsserMode, DeEsserParams, EqParams, HpfSlope};
use crate::error::{Result, VoxError};

/// Input/output trim range in dB
pub const TRIM_RANGE_DB: (f32, f32) = (-24.0, 24.0);

// ============================================================================
// Snapshot
// ============================================================================

/// Every parameter of the chain at one block boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Gain applied before the equalizer, in dB
    pub input_gain_db: f32,
    /// Gain applied after the de-esser, in dB
    pub output_gain_db: f32,
    pub eq: EqParams,
    pub compressor: CompressorParams,
    pub deesser: DeEsserParams,
}

impl ChainParams {
    /// Clamp every value to its valid range
    pub fn clamp(&mut self) {
        self.input_gain_db = self.input_gain_db.clamp(TRIM_RANGE_DB.0, TRIM_RANGE_DB.1);
        self.output_gain_db = self.output_gain_db.clamp(TRIM_RANGE_DB.0, TRIM_RANGE_DB.1);
        self.eq.clamp();
        self.compressor.clamp();
        self.deesser.clamp();
    }

    /// Parse a (possibly partial) JSON preset; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut params: Self = serde_json::from_str(json)?;
        params.clamp();
        Ok(params)
    }

    /// Load a JSON preset from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the preset to disk as pretty JSON
    pub fn save_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Raw host value of one parameter
    ///
    /// Switches read 1.0/0.0 and choices read their index.
    pub fn value(&self, id: ParamId) -> f32 {
        use ParamId::*;
        let switch = |on: bool| if on { 1.0 } else { 0.0 };
        match id {
            InputGain => self.input_gain_db,
            OutputGain => self.output_gain_db,
            EqHpfFreq => self.eq.hpf_freq,
            EqHpfSlope => self.eq.hpf_slope.index() as f32,
            EqLowShelfFreq => self.eq.low_shelf_freq,
            EqLowShelfGain => self.eq.low_shelf_gain_db,
            EqLowMidFreq => self.eq.low_mid_freq,
            EqLowMidGain => self.eq.low_mid_gain_db,
            EqLowMidQ => self.eq.low_mid_q,
            EqMidFreq => self.eq.mid_freq,
            EqMidGain => self.eq.mid_gain_db,
            EqMidQ => self.eq.mid_q,
            EqHighMidFreq => self.eq.high_mid_freq,
            EqHighMidGain => self.eq.high_mid_gain_db,
            EqHighMidQ => self.eq.high_mid_q,
            EqHighShelfFreq => self.eq.high_shelf_freq,
            EqHighShelfGain => self.eq.high_shelf_gain_db,
            EqBypass => switch(self.eq.bypass),
            CompThreshold => self.compressor.threshold_db,
            CompRatio => self.compressor.ratio,
            CompAttack => self.compressor.attack_ms,
            CompRelease => self.compressor.release_ms,
            CompMakeup => self.compressor.makeup_gain_db,
            CompKnee => self.compressor.knee_db,
            CompAutoRelease => switch(self.compressor.auto_release),
            CompBypass => switch(self.compressor.bypass),
            DeessFrequency => self.deesser.frequency,
            DeessThreshold => self.deesser.threshold_db,
            DeessRange => self.deesser.range_db,
            DeessMode => self.deesser.mode.index() as f32,
            DeessListen => switch(self.deesser.listen),
            DeessBypass => switch(self.deesser.bypass),
        }
    }

    /// Set one parameter from a raw host value
    ///
    /// Switches are on above 0.5; choices take the truncated index.
    /// Continuous values are stored as given and clamped by the stage setters.
    pub fn set_value(&mut self, id: ParamId, value: f32) {
        use ParamId::*;
        let on = value > 0.5;
        match id {
            InputGain => self.input_gain_db = value,
            OutputGain => self.output_gain_db = value,
            EqHpfFreq => self.eq.hpf_freq = value,
            EqHpfSlope => self.eq.hpf_slope = HpfSlope::from_index(value as i32),
            EqLowShelfFreq => self.eq.low_shelf_freq = value,
            EqLowShelfGain => self.eq.low_shelf_gain_db = value,
            EqLowMidFreq => self.eq.low_mid_freq = value,
            EqLowMidGain => self.eq.low_mid_gain_db = value,
            EqLowMidQ => self.eq.low_mid_q = value,
            EqMidFreq => self.eq.mid_freq = value,
            EqMidGain => self.eq.mid_gain_db = value,
            EqMidQ => self.eq.mid_q = value,
            EqHighMidFreq => self.eq.high_mid_freq = value,
            EqHighMidGain => self.eq.high_mid_gain_db = value,
            EqHighMidQ => self.eq.high_mid_q = value,
            EqHighShelfFreq => self.eq.high_shelf_freq = value,
            EqHighShelfGain => self.eq.high_shelf_gain_db = value,
            EqBypass => self.eq.bypass = on,
            CompThreshold => self.compressor.threshold_db = value,
            CompRatio => self.compressor.ratio = value,
            CompAttack => self.compressor.attack_ms = value,
            CompRelease => self.compressor.release_ms = value,
            CompMakeup => self.compressor.makeup_gain_db = value,
            CompKnee => self.compressor.knee_db = value,
            CompAutoRelease => self.compressor.auto_release = on,
            CompBypass => self.compressor.bypass = on,
            DeessFrequency => self.deesser.frequency = value,
            DeessThreshold => self.deesser.threshold_db = value,
            DeessRange => self.deesser.range_db = value,
            DeessMode => self.deesser.mode = DeEsserMode::from_index(value as i32),
            DeessListen => self.deesser.listen = on,
            DeessBypass => self.deesser.bypass = on,
        }
    }
}

// ============================================================================
// Parameter identifiers
// ============================================================================

/// Identifier of one host-automatable parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    InputGain,
    OutputGain,
    EqHpfFreq,
    EqHpfSlope,
    EqLowShelfFreq,
    EqLowShelfGain,
    EqLowMidFreq,
    EqLowMidGain,
    EqLowMidQ,
    EqMidFreq,
    EqMidGain,
    EqMidQ,
    EqHighMidFreq,
    EqHighMidGain,
    EqHighMidQ,
    EqHighShelfFreq,
    EqHighShelfGain,
    EqBypass,
    CompThreshold,
    CompRatio,
    CompAttack,
    CompRelease,
    CompMakeup,
    CompKnee,
    CompAutoRelease,
    CompBypass,
    DeessFrequency,
    DeessThreshold,
    DeessRange,
    DeessMode,
    DeessListen,
    DeessBypass,
}

impl ParamId {
    pub const COUNT: usize = 32;

    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::InputGain,
        ParamId::OutputGain,
        ParamId::EqHpfFreq,
        ParamId::EqHpfSlope,
        ParamId::EqLowShelfFreq,
        ParamId::EqLowShelfGain,
        ParamId::EqLowMidFreq,
        ParamId::EqLowMidGain,
        ParamId::EqLowMidQ,
        ParamId::EqMidFreq,
        ParamId::EqMidGain,
        ParamId::EqMidQ,
        ParamId::EqHighMidFreq,
        ParamId::EqHighMidGain,
        ParamId::EqHighMidQ,
        ParamId::EqHighShelfFreq,
        ParamId::EqHighShelfGain,
        ParamId::EqBypass,
        ParamId::CompThreshold,
        ParamId::CompRatio,
        ParamId::CompAttack,
        ParamId::CompRelease,
        ParamId::CompMakeup,
        ParamId::CompKnee,
        ParamId::CompAutoRelease,
        ParamId::CompBypass,
        ParamId::DeessFrequency,
        ParamId::DeessThreshold,
        ParamId::DeessRange,
        ParamId::DeessMode,
        ParamId::DeessListen,
        ParamId::DeessBypass,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable string key used by hosts and the CLI
    pub fn key(self) -> &'static str {
        use ParamId::*;
        match self {
            InputGain => "input_gain",
            OutputGain => "output_gain",
            EqHpfFreq => "eq_hpf_freq",
            EqHpfSlope => "eq_hpf_slope",
            EqLowShelfFreq => "eq_low_shelf_freq",
            EqLowShelfGain => "eq_low_shelf_gain",
            EqLowMidFreq => "eq_low_mid_freq",
            EqLowMidGain => "eq_low_mid_gain",
            EqLowMidQ => "eq_low_mid_q",
            EqMidFreq => "eq_mid_freq",
            EqMidGain => "eq_mid_gain",
            EqMidQ => "eq_mid_q",
            EqHighMidFreq => "eq_high_mid_freq",
            EqHighMidGain => "eq_high_mid_gain",
            EqHighMidQ => "eq_high_mid_q",
            EqHighShelfFreq => "eq_high_shelf_freq",
            EqHighShelfGain => "eq_high_shelf_gain",
            EqBypass => "eq_bypass",
            CompThreshold => "comp_threshold",
            CompRatio => "comp_ratio",
            CompAttack => "comp_attack",
            CompRelease => "comp_release",
            CompMakeup => "comp_makeup",
            CompKnee => "comp_knee",
            CompAutoRelease => "comp_auto_release",
            CompBypass => "comp_bypass",
            DeessFrequency => "deess_frequency",
            DeessThreshold => "deess_threshold",
            DeessRange => "deess_range",
            DeessMode => "deess_mode",
            DeessListen => "deess_listen",
            DeessBypass => "deess_bypass",
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ParamId {
    type Err = VoxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ParamId::ALL
            .iter()
            .copied()
            .find(|id| id.key() == s)
            .ok_or_else(|| VoxError::InvalidConfig {
                reason: format!("unknown parameter '{}'", s),
            })
    }
}

// ============================================================================
// Lock-free store
// ============================================================================

/// f32 stored in an `AtomicU32` by bit pattern
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Parameter store shared between a writer thread and the audio thread
///
/// Writers and the reader never block each other. A write is picked up at
/// the next `snapshot`, so changes land on block boundaries.
#[derive(Debug)]
pub struct SharedParams {
    values: [AtomicF32; ParamId::COUNT],
}

impl SharedParams {
    pub fn new(params: &ChainParams) -> Self {
        let shared = Self {
            values: std::array::from_fn(|_| AtomicF32::default()),
        };
        shared.store(params);
        shared
    }

    /// Write one raw parameter value
    #[inline]
    pub fn set(&self, id: ParamId, value: f32) {
        self.values[id.index()].store(value);
    }

    /// Read one raw parameter value
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.values[id.index()].load()
    }

    /// Overwrite every parameter from a snapshot
    pub fn store(&self, params: &ChainParams) {
        for id in ParamId::ALL {
            self.set(id, params.value(id));
        }
    }

    /// Read every parameter once
    ///
    /// Values are not clamped here; each stage setter clamps on apply.
    pub fn snapshot(&self) -> ChainParams {
        let mut params = ChainParams::default();
        for id in ParamId::ALL {
            params.set_value(id, self.get(id));
        }
        params
    }
}

impl Default for SharedParams {
    fn default() -> Self {
        Self::new(&ChainParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_defaults() {
        let params = ChainParams::default();
        assert_eq!(params.input_gain_db, 0.0);
        assert_eq!(params.output_gain_db, 0.0);
        assert_eq!(params.compressor.knee_db, 6.0);
        assert_eq!(params.deesser.frequency, 6000.0);
        assert_eq!(params.eq.hpf_freq, 80.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let params = ChainParams::from_json_str(
            r#"{ "input_gain_db": 3.0, "compressor": { "ratio": 8.0 } }"#,
        )
        .unwrap();

        assert_eq!(params.input_gain_db, 3.0);
        assert_eq!(params.compressor.ratio, 8.0);
        assert_eq!(params.compressor.threshold_db, -20.0);
        assert_eq!(params.deesser, DeEsserParams::default());
    }

    #[test]
    fn test_json_values_are_clamped() {
        let params = ChainParams::from_json_str(
            r#"{ "output_gain_db": 99.0, "deesser": { "range_db": 40.0 }, "eq": { "mid_q": 0.0 } }"#,
        )
        .unwrap();

        assert_eq!(params.output_gain_db, 24.0);
        assert_eq!(params.deesser.range_db, 12.0);
        assert_eq!(params.eq.mid_q, 0.5);
    }

    #[test]
    fn test_malformed_json_is_error() {
        let err = ChainParams::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_json_round_trip() {
        let mut params = ChainParams::default();
        params.deesser.mode = DeEsserMode::Wideband;
        params.eq.hpf_slope = HpfSlope::Db24;
        params.compressor.auto_release = true;

        let json = params.to_json_pretty().unwrap();
        assert_eq!(ChainParams::from_json_str(&json).unwrap(), params);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.json");

        let mut params = ChainParams::default();
        params.eq.mid_gain_db = -3.5;
        params.save_json_file(&path).unwrap();

        assert_eq!(ChainParams::from_json_file(&path).unwrap(), params);
        assert_eq!(
            ChainParams::from_json_file(dir.path().join("missing.json"))
                .unwrap_err()
                .error_code(),
            "IO_ERROR"
        );
    }

    #[test]
    fn test_raw_values_round_trip() {
        let mut params = ChainParams::default();
        params.eq.bypass = true;
        params.deesser.mode = DeEsserMode::Wideband;
        params.eq.hpf_slope = HpfSlope::Db24;
        params.compressor.release_ms = 250.0;

        let mut copy = ChainParams::default();
        for id in ParamId::ALL {
            copy.set_value(id, params.value(id));
        }
        assert_eq!(copy, params);
    }

    #[test]
    fn test_switch_threshold() {
        let mut params = ChainParams::default();
        params.set_value(ParamId::CompBypass, 0.5);
        assert!(!params.compressor.bypass);
        params.set_value(ParamId::CompBypass, 0.51);
        assert!(params.compressor.bypass);
    }

    #[test]
    fn test_param_keys_are_unique_and_parse() {
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(id.key().parse::<ParamId>().unwrap(), *id);
        }
        assert!("comp_sidechain".parse::<ParamId>().is_err());
    }

    #[test]
    fn test_shared_params_snapshot() {
        let shared = SharedParams::default();
        assert_eq!(shared.snapshot(), ChainParams::default());

        shared.set(ParamId::DeessThreshold, -35.0);
        shared.set(ParamId::EqBypass, 1.0);
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.deesser.threshold_db, -35.0);
        assert!(snapshot.eq.bypass);
    }

    #[test]
    fn test_shared_params_across_threads() {
        let shared = Arc::new(SharedParams::default());
        let writer = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for i in 0..1000 {
                    shared.set(ParamId::CompThreshold, -(i % 60) as f32);
                }
            })
        };

        for _ in 0..1000 {
            let threshold = shared.snapshot().compressor.threshold_db;
            assert!((-60.0..=0.0).contains(&threshold));
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_atomic_f32() {
        let value = AtomicF32::new(-6.5);
        assert_eq!(value.load(), -6.5);
        value.store(f32::MIN_POSITIVE);
        assert_eq!(value.load(), f32::MIN_POSITIVE);
    }
}
