//! Six-band vocal equalizer
//!
//! Fixed band order: high-pass (one or two sections) → low shelf →
//! low-mid peak → mid peak → high-mid peak → high shelf. A band whose gain
//! is within 0.1 dB of flat is skipped entirely; the high-pass is skipped
//! when parked at 20 Hz.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::biquad::BiquadState;
use super::filter_math::{BiquadCoeffs, FilterType, BUTTERWORTH_Q};
use super::Effect;
use crate::engine::AudioBuffer;
use crate::error::VoxError;
use crate::impl_effect_common;

/// High-pass frequency that means "off"
pub const HPF_OFF_HZ: f32 = 20.0;

/// Bands with a smaller gain magnitude than this are not evaluated
pub const BAND_ACTIVE_THRESHOLD_DB: f32 = 0.1;

pub const GAIN_RANGE_DB: (f32, f32) = (-12.0, 12.0);
pub const Q_RANGE: (f32, f32) = (0.5, 10.0);

/// Shelf slope (S); 1.0 is the steepest slope without overshoot
const SHELF_SLOPE: f64 = 1.0;

// ============================================================================
// Bands
// ============================================================================

/// Equalizer band, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqBand {
    HighPass,
    LowShelf,
    LowMid,
    Mid,
    HighMid,
    HighShelf,
}

impl EqBand {
    pub const COUNT: usize = 6;

    pub const ALL: [EqBand; Self::COUNT] = [
        EqBand::HighPass,
        EqBand::LowShelf,
        EqBand::LowMid,
        EqBand::Mid,
        EqBand::HighMid,
        EqBand::HighShelf,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            EqBand::HighPass => "high_pass",
            EqBand::LowShelf => "low_shelf",
            EqBand::LowMid => "low_mid",
            EqBand::Mid => "mid",
            EqBand::HighMid => "high_mid",
            EqBand::HighShelf => "high_shelf",
        }
    }

    /// Valid corner/center frequency range in Hz
    pub fn frequency_range(self) -> (f32, f32) {
        match self {
            EqBand::HighPass => (HPF_OFF_HZ, 400.0),
            EqBand::LowShelf => (50.0, 500.0),
            EqBand::LowMid => (100.0, 1000.0),
            EqBand::Mid => (500.0, 4000.0),
            EqBand::HighMid => (2000.0, 8000.0),
            EqBand::HighShelf => (4000.0, 16000.0),
        }
    }

    pub fn filter_type(self) -> FilterType {
        match self {
            EqBand::HighPass => FilterType::HighPass,
            EqBand::LowShelf => FilterType::LowShelf,
            EqBand::LowMid | EqBand::Mid | EqBand::HighMid => FilterType::Peaking,
            EqBand::HighShelf => FilterType::HighShelf,
        }
    }

    /// Whether the band has a gain control
    pub fn has_gain(self) -> bool {
        self != EqBand::HighPass
    }

    /// Whether the band has a Q control
    pub fn has_q(self) -> bool {
        self.filter_type() == FilterType::Peaking
    }
}

impl fmt::Display for EqBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EqBand {
    type Err = VoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "high_pass" | "hpf" => Ok(EqBand::HighPass),
            "low_shelf" | "ls" => Ok(EqBand::LowShelf),
            "low_mid" | "lm" => Ok(EqBand::LowMid),
            "mid" => Ok(EqBand::Mid),
            "high_mid" | "hm" => Ok(EqBand::HighMid),
            "high_shelf" | "hs" => Ok(EqBand::HighShelf),
            other => Err(VoxError::InvalidConfig {
                reason: format!("unknown EQ band '{}'", other),
            }),
        }
    }
}

/// High-pass filter slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HpfSlope {
    /// One Butterworth section
    #[default]
    #[serde(rename = "12")]
    Db12,
    /// Two identical cascaded sections
    #[serde(rename = "24")]
    Db24,
}

impl HpfSlope {
    /// Number of cascaded sections
    pub fn stages(self) -> usize {
        match self {
            HpfSlope::Db12 => 1,
            HpfSlope::Db24 => 2,
        }
    }

    /// Slope from a host choice index (0 = 12 dB/oct, 1 = 24 dB/oct)
    pub fn from_index(index: i32) -> Self {
        if index >= 1 {
            HpfSlope::Db24
        } else {
            HpfSlope::Db12
        }
    }

    pub fn index(self) -> i32 {
        match self {
            HpfSlope::Db12 => 0,
            HpfSlope::Db24 => 1,
        }
    }

    pub fn db_per_octave(self) -> u32 {
        12 * self.stages() as u32
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Equalizer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqParams {
    /// High-pass corner in Hz (20 = off)
    pub hpf_freq: f32,
    pub hpf_slope: HpfSlope,
    pub low_shelf_freq: f32,
    pub low_shelf_gain_db: f32,
    pub low_mid_freq: f32,
    pub low_mid_gain_db: f32,
    pub low_mid_q: f32,
    pub mid_freq: f32,
    pub mid_gain_db: f32,
    pub mid_q: f32,
    pub high_mid_freq: f32,
    pub high_mid_gain_db: f32,
    pub high_mid_q: f32,
    pub high_shelf_freq: f32,
    pub high_shelf_gain_db: f32,
    pub bypass: bool,
}

impl Default for EqParams {
    fn default() -> Self {
        Self {
            hpf_freq: 80.0,
            hpf_slope: HpfSlope::Db12,
            low_shelf_freq: 200.0,
            low_shelf_gain_db: 0.0,
            low_mid_freq: 400.0,
            low_mid_gain_db: 0.0,
            low_mid_q: 1.0,
            mid_freq: 1000.0,
            mid_gain_db: 0.0,
            mid_q: 1.0,
            high_mid_freq: 4000.0,
            high_mid_gain_db: 0.0,
            high_mid_q: 1.0,
            high_shelf_freq: 8000.0,
            high_shelf_gain_db: 0.0,
            bypass: false,
        }
    }
}

impl EqParams {
    /// Parameters that leave the signal untouched
    pub fn flat() -> Self {
        Self {
            hpf_freq: HPF_OFF_HZ,
            ..Self::default()
        }
    }

    pub fn frequency(&self, band: EqBand) -> f32 {
        match band {
            EqBand::HighPass => self.hpf_freq,
            EqBand::LowShelf => self.low_shelf_freq,
            EqBand::LowMid => self.low_mid_freq,
            EqBand::Mid => self.mid_freq,
            EqBand::HighMid => self.high_mid_freq,
            EqBand::HighShelf => self.high_shelf_freq,
        }
    }

    /// Band gain in dB (0 for the high-pass)
    pub fn gain_db(&self, band: EqBand) -> f32 {
        match band {
            EqBand::HighPass => 0.0,
            EqBand::LowShelf => self.low_shelf_gain_db,
            EqBand::LowMid => self.low_mid_gain_db,
            EqBand::Mid => self.mid_gain_db,
            EqBand::HighMid => self.high_mid_gain_db,
            EqBand::HighShelf => self.high_shelf_gain_db,
        }
    }

    /// Band Q (fixed Butterworth for the high-pass, shelf slope for shelves)
    pub fn q(&self, band: EqBand) -> f64 {
        match band {
            EqBand::HighPass => BUTTERWORTH_Q,
            EqBand::LowShelf | EqBand::HighShelf => SHELF_SLOPE,
            EqBand::LowMid => self.low_mid_q as f64,
            EqBand::Mid => self.mid_q as f64,
            EqBand::HighMid => self.high_mid_q as f64,
        }
    }

    /// Whether the band is evaluated by `process` and the response query
    pub fn is_band_active(&self, band: EqBand) -> bool {
        match band {
            EqBand::HighPass => self.hpf_freq > HPF_OFF_HZ,
            _ => self.gain_db(band).abs() > BAND_ACTIVE_THRESHOLD_DB,
        }
    }

    fn frequency_mut(&mut self, band: EqBand) -> &mut f32 {
        match band {
            EqBand::HighPass => &mut self.hpf_freq,
            EqBand::LowShelf => &mut self.low_shelf_freq,
            EqBand::LowMid => &mut self.low_mid_freq,
            EqBand::Mid => &mut self.mid_freq,
            EqBand::HighMid => &mut self.high_mid_freq,
            EqBand::HighShelf => &mut self.high_shelf_freq,
        }
    }

    fn gain_mut(&mut self, band: EqBand) -> Option<&mut f32> {
        match band {
            EqBand::HighPass => None,
            EqBand::LowShelf => Some(&mut self.low_shelf_gain_db),
            EqBand::LowMid => Some(&mut self.low_mid_gain_db),
            EqBand::Mid => Some(&mut self.mid_gain_db),
            EqBand::HighMid => Some(&mut self.high_mid_gain_db),
            EqBand::HighShelf => Some(&mut self.high_shelf_gain_db),
        }
    }

    fn q_mut(&mut self, band: EqBand) -> Option<&mut f32> {
        match band {
            EqBand::LowMid => Some(&mut self.low_mid_q),
            EqBand::Mid => Some(&mut self.mid_q),
            EqBand::HighMid => Some(&mut self.high_mid_q),
            _ => None,
        }
    }

    /// Clamp every field to its band's range
    pub fn clamp(&mut self) {
        for band in EqBand::ALL {
            let (lo, hi) = band.frequency_range();
            let freq = self.frequency_mut(band);
            *freq = freq.clamp(lo, hi);

            if let Some(gain) = self.gain_mut(band) {
                *gain = gain.clamp(GAIN_RANGE_DB.0, GAIN_RANGE_DB.1);
            }
            if let Some(q) = self.q_mut(band) {
                *q = q.clamp(Q_RANGE.0, Q_RANGE.1);
            }
        }
    }

    /// Design the band's biquad at the given sample rate
    pub fn design(&self, band: EqBand, sample_rate: f64) -> BiquadCoeffs {
        BiquadCoeffs::design(
            band.filter_type(),
            sample_rate,
            self.frequency(band) as f64,
            self.gain_db(band) as f64,
            self.q(band),
        )
    }
}

// ============================================================================
// Equalizer
// ============================================================================

/// Filter sections in processing order; the high-pass owns two
const NUM_SECTIONS: usize = EqBand::COUNT + 1;

const SECTION_BANDS: [EqBand; NUM_SECTIONS] = [
    EqBand::HighPass,
    EqBand::HighPass,
    EqBand::LowShelf,
    EqBand::LowMid,
    EqBand::Mid,
    EqBand::HighMid,
    EqBand::HighShelf,
];

/// Six-band equalizer with per-channel filter memory
///
/// Both channels share coefficients. The analytic response query reads the
/// same coefficients the audio path runs, so it matches the time-domain
/// filter for any frequency.
#[derive(Debug, Clone)]
pub struct Equalizer {
    params: EqParams,
    sample_rate: f64,
    /// Coefficients indexed by `EqBand::index`
    coeffs: [BiquadCoeffs; EqBand::COUNT],
    /// Filter memory: `[channel][section]`
    states: [[BiquadState; NUM_SECTIONS]; 2],
}

impl Equalizer {
    /// Create a new equalizer with default parameters
    pub fn new() -> Self {
        Self::with_params(EqParams::default())
    }

    /// Create a new equalizer with custom parameters (clamped)
    pub fn with_params(mut params: EqParams) -> Self {
        params.clamp();
        let mut eq = Self {
            params,
            sample_rate: 44100.0,
            coeffs: [BiquadCoeffs::IDENTITY; EqBand::COUNT],
            states: Default::default(),
        };
        eq.update_all_coefficients();
        eq
    }

    /// Get the current parameters
    pub fn params(&self) -> &EqParams {
        &self.params
    }

    /// Apply a full parameter set through the individual setters
    pub fn apply_params(&mut self, params: &EqParams) {
        self.set_bypass(params.bypass);
        self.set_hpf_slope(params.hpf_slope);
        for band in EqBand::ALL {
            self.set_band_frequency(band, params.frequency(band));
            if band.has_gain() {
                self.set_band_gain_db(band, params.gain_db(band));
            }
            if band.has_q() {
                self.set_band_q(band, params.q(band) as f32);
            }
        }
    }

    /// Set a band's frequency in Hz, clamped to the band's range
    pub fn set_band_frequency(&mut self, band: EqBand, freq: f32) {
        let (lo, hi) = band.frequency_range();
        let freq = freq.clamp(lo, hi);
        let slot = self.params.frequency_mut(band);
        if *slot != freq {
            *slot = freq;
            self.update_band(band);
        }
    }

    /// Set a band's gain in dB; ignored for the high-pass
    pub fn set_band_gain_db(&mut self, band: EqBand, gain_db: f32) {
        let gain_db = gain_db.clamp(GAIN_RANGE_DB.0, GAIN_RANGE_DB.1);
        if let Some(slot) = self.params.gain_mut(band) {
            if *slot != gain_db {
                *slot = gain_db;
                self.update_band(band);
            }
        }
    }

    /// Set a peaking band's Q; ignored for the high-pass and shelves
    pub fn set_band_q(&mut self, band: EqBand, q: f32) {
        let q = q.clamp(Q_RANGE.0, Q_RANGE.1);
        if let Some(slot) = self.params.q_mut(band) {
            if *slot != q {
                *slot = q;
                self.update_band(band);
            }
        }
    }

    pub fn set_hpf_slope(&mut self, slope: HpfSlope) {
        self.params.hpf_slope = slope;
    }

    fn update_band(&mut self, band: EqBand) {
        self.coeffs[band.index()] = self.params.design(band, self.sample_rate);
        trace!(
            band = band.name(),
            freq = self.params.frequency(band),
            gain_db = self.params.gain_db(band),
            "eq coefficients updated"
        );
    }

    fn update_all_coefficients(&mut self) {
        for band in EqBand::ALL {
            self.update_band(band);
        }
    }

    fn active_sections(&self) -> [bool; NUM_SECTIONS] {
        let mut active = [false; NUM_SECTIONS];
        for (section, band) in SECTION_BANDS.iter().enumerate() {
            active[section] = self.params.is_band_active(*band);
        }
        if self.params.hpf_slope.stages() < 2 {
            active[1] = false;
        }
        active
    }

    /// Combined magnitude (linear) of all active bands at `freq` Hz
    pub fn magnitude(&self, freq: f64) -> f64 {
        EqBand::ALL
            .iter()
            .map(|&band| self.magnitude_band(freq, band))
            .product()
    }

    /// Magnitude (linear) of one band at `freq` Hz
    ///
    /// An inactive band reports exactly 1.0. The high-pass counts once per
    /// cascaded section.
    pub fn magnitude_band(&self, freq: f64, band: EqBand) -> f64 {
        if !self.params.is_band_active(band) {
            return 1.0;
        }

        let mag = self.coeffs[band.index()].magnitude_at(freq, self.sample_rate);
        match band {
            EqBand::HighPass => mag.powi(self.params.hpf_slope.stages() as i32),
            _ => mag,
        }
    }

    #[inline]
    fn process_channel(
        samples: &mut [f32],
        coeffs: &[BiquadCoeffs; EqBand::COUNT],
        active: &[bool; NUM_SECTIONS],
        states: &mut [BiquadState; NUM_SECTIONS],
    ) {
        for sample in samples.iter_mut() {
            let mut x = *sample;
            for (section, state) in states.iter_mut().enumerate() {
                if active[section] {
                    x = state.process(x, &coeffs[SECTION_BANDS[section].index()]);
                }
            }
            *sample = x;
        }
    }
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Equalizer {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.params.bypass {
            return;
        }

        let active = self.active_sections();
        let Some((left, right)) = buffer.stereo_mut() else {
            return;
        };

        let [left_states, right_states] = &mut self.states;
        Self::process_channel(left, &self.coeffs, &active, left_states);
        if let Some(right) = right {
            Self::process_channel(right, &self.coeffs, &active, right_states);
        }
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_all_coefficients();
        self.reset();
        debug!(sample_rate, max_block_size, "equalizer prepared");
    }

    fn reset(&mut self) {
        self.states = Default::default();
    }

    impl_effect_common!("equalizer");
}
