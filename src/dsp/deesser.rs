//! De-esser
//!
//! Band-pass sidechain detector driving a hard-capped gain reduction,
//! applied wideband or to the band above a crossover. Listen mode solos
//! the detected band for auditioning.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::biquad::{BiquadState, StereoBiquad};
use super::envelope::{EnvelopeFollower, OnePoleSmoother, ReductionMeter};
use super::filter_math::{db_to_linear, linear_to_db, BiquadCoeffs, BUTTERWORTH_Q};
use super::Effect;
use crate::engine::AudioBuffer;
use crate::impl_effect_common;

const DETECTOR_Q: f64 = 2.0;
const DETECTOR_ATTACK_MS: f32 = 0.5;
const DETECTOR_RELEASE_MS: f32 = 50.0;
const GAIN_SMOOTHING_MS: f32 = 2.0;

/// Split-band crossover sits below the detector center
const CROSSOVER_RATIO: f64 = 0.8;

/// Smoothed reduction above which the stage reports itself active
const ACTIVE_THRESHOLD_DB: f32 = 0.5;

/// How the de-esser applies its gain reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeEsserMode {
    /// Reduce only the band above the crossover
    #[default]
    SplitBand,
    /// Reduce the whole signal
    Wideband,
}

impl DeEsserMode {
    /// Mode from a host choice index; out-of-range indices clamp
    pub fn from_index(index: i32) -> Self {
        if index >= 1 {
            DeEsserMode::Wideband
        } else {
            DeEsserMode::SplitBand
        }
    }

    pub fn index(self) -> i32 {
        match self {
            DeEsserMode::SplitBand => 0,
            DeEsserMode::Wideband => 1,
        }
    }
}

/// De-esser parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeEsserParams {
    /// Detector center frequency in Hz (2000 to 12000 Hz)
    pub frequency: f32,
    /// Threshold in dB (-60 to 0 dB)
    pub threshold_db: f32,
    /// Maximum reduction in dB (0 to 12 dB)
    pub range_db: f32,
    pub mode: DeEsserMode,
    /// Output the detected band instead of the processed signal
    pub listen: bool,
    pub bypass: bool,
}

impl Default for DeEsserParams {
    fn default() -> Self {
        Self {
            frequency: 6000.0,
            threshold_db: -20.0,
            range_db: 6.0,
            mode: DeEsserMode::SplitBand,
            listen: false,
            bypass: false,
        }
    }
}

impl DeEsserParams {
    /// Clamp parameters to valid ranges
    pub fn clamp(&mut self) {
        self.frequency = self.frequency.clamp(2000.0, 12000.0);
        self.threshold_db = self.threshold_db.clamp(-60.0, 0.0);
        self.range_db = self.range_db.clamp(0.0, 12.0);
    }
}

/// Split-band/wideband de-esser
#[derive(Debug, Clone)]
pub struct DeEsser {
    params: DeEsserParams,
    sample_rate: f64,

    detector_coeffs: BiquadCoeffs,
    high_pass_coeffs: BiquadCoeffs,
    low_pass_coeffs: BiquadCoeffs,
    detector: StereoBiquad,
    high_pass: StereoBiquad,
    low_pass: StereoBiquad,

    envelope: EnvelopeFollower,
    gain: OnePoleSmoother,
    meter: ReductionMeter,
}

impl DeEsser {
    /// Create a new de-esser with default parameters
    pub fn new() -> Self {
        Self::with_params(DeEsserParams::default())
    }

    /// Create a new de-esser with custom parameters (clamped)
    pub fn with_params(mut params: DeEsserParams) -> Self {
        params.clamp();
        let mut deesser = Self {
            params,
            sample_rate: 44100.0,
            detector_coeffs: BiquadCoeffs::IDENTITY,
            high_pass_coeffs: BiquadCoeffs::IDENTITY,
            low_pass_coeffs: BiquadCoeffs::IDENTITY,
            detector: StereoBiquad::default(),
            high_pass: StereoBiquad::default(),
            low_pass: StereoBiquad::default(),
            envelope: EnvelopeFollower::default(),
            gain: OnePoleSmoother::new(1.0),
            meter: ReductionMeter::new(0.85, 0.15),
        };
        deesser.update_time_constants();
        deesser.update_filters();
        deesser
    }

    /// Get the current parameters
    pub fn params(&self) -> &DeEsserParams {
        &self.params
    }

    /// Apply a full parameter set through the individual setters
    pub fn apply_params(&mut self, params: &DeEsserParams) {
        self.set_frequency(params.frequency);
        self.set_threshold_db(params.threshold_db);
        self.set_range_db(params.range_db);
        self.set_mode(params.mode);
        self.set_listen(params.listen);
        self.set_bypass(params.bypass);
    }

    /// Set detector center frequency in Hz
    pub fn set_frequency(&mut self, frequency: f32) {
        let frequency = frequency.clamp(2000.0, 12000.0);
        if frequency != self.params.frequency {
            self.params.frequency = frequency;
            self.update_filters();
        }
    }

    /// Set threshold in dB
    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.params.threshold_db = threshold_db.clamp(-60.0, 0.0);
    }

    /// Set maximum reduction in dB
    pub fn set_range_db(&mut self, range_db: f32) {
        self.params.range_db = range_db.clamp(0.0, 12.0);
    }

    pub fn set_mode(&mut self, mode: DeEsserMode) {
        self.params.mode = mode;
    }

    pub fn set_listen(&mut self, listen: bool) {
        self.params.listen = listen;
    }

    /// Smoothed gain reduction in dB for metering
    pub fn gain_reduction_db(&self) -> f32 {
        self.meter.value()
    }

    /// Whether the de-esser is audibly working
    pub fn is_active(&self) -> bool {
        self.meter.value() > ACTIVE_THRESHOLD_DB
    }

    /// Current smoothed linear gain (1.0 = no reduction)
    pub fn current_gain(&self) -> f32 {
        self.gain.value()
    }

    /// Reduction in dB for a detector envelope (linear)
    ///
    /// Zero at or below threshold, otherwise the overshoot capped at the
    /// range.
    pub fn compute_reduction_db(&self, envelope: f32) -> f32 {
        let threshold_db = self.params.threshold_db;
        reduction_db(
            envelope,
            db_to_linear(threshold_db),
            threshold_db,
            self.params.range_db,
        )
    }

    fn update_time_constants(&mut self) {
        self.envelope
            .set_times(self.sample_rate, DETECTOR_ATTACK_MS, DETECTOR_RELEASE_MS);
        self.gain.set_time(self.sample_rate, GAIN_SMOOTHING_MS);
    }

    fn update_filters(&mut self) {
        let freq = self.params.frequency as f64;
        let crossover = freq * CROSSOVER_RATIO;

        self.detector_coeffs = BiquadCoeffs::band_pass(self.sample_rate, freq, DETECTOR_Q);
        self.high_pass_coeffs = BiquadCoeffs::high_pass(self.sample_rate, crossover, BUTTERWORTH_Q);
        self.low_pass_coeffs = BiquadCoeffs::low_pass(self.sample_rate, crossover, BUTTERWORTH_Q);
        trace!(frequency = self.params.frequency, "de-esser filters updated");
    }

    /// Dry/processed crossfade; exact dry output when `gain` is 1
    #[inline]
    fn split_band(
        input: f32,
        gain: f32,
        high_coeffs: &BiquadCoeffs,
        high_state: &mut BiquadState,
        low_coeffs: &BiquadCoeffs,
        low_state: &mut BiquadState,
    ) -> f32 {
        let low = low_state.process(input, low_coeffs);
        let high = high_state.process(input, high_coeffs);
        let processed = low + high * gain;
        let wet = 1.0 - gain;
        input * (1.0 - wet) + processed * wet
    }
}

/// Overshoot above threshold in dB, capped at the range; zero at or below threshold
#[inline]
fn reduction_db(envelope: f32, threshold_linear: f32, threshold_db: f32, range_db: f32) -> f32 {
    if envelope > threshold_linear {
        (linear_to_db(envelope) - threshold_db).min(range_db)
    } else {
        0.0
    }
}

impl Default for DeEsser {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for DeEsser {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.params.bypass {
            return;
        }

        let Some((left, mut right)) = buffer.stereo_mut() else {
            return;
        };

        let threshold_linear = db_to_linear(self.params.threshold_db);
        let threshold_db = self.params.threshold_db;
        let range_db = self.params.range_db;
        let mut block_peak_db = 0.0_f32;

        for i in 0..left.len() {
            let in_left = left[i];
            let in_right = right.as_deref().map_or(in_left, |r| r[i]);

            // Sidechain runs on both channels even for mono input
            let detected_left = self.detector.left.process(in_left, &self.detector_coeffs);
            let detected_right = self.detector.right.process(in_right, &self.detector_coeffs);
            let envelope = self
                .envelope
                .process(detected_left.abs().max(detected_right.abs()));

            let reduction = reduction_db(envelope, threshold_linear, threshold_db, range_db);
            block_peak_db = block_peak_db.max(reduction);

            let gain = self.gain.process(db_to_linear(-reduction));

            if self.params.listen {
                left[i] = detected_left;
                if let Some(right) = right.as_deref_mut() {
                    right[i] = detected_right;
                }
                continue;
            }

            match self.params.mode {
                DeEsserMode::SplitBand => {
                    left[i] = Self::split_band(
                        in_left,
                        gain,
                        &self.high_pass_coeffs,
                        &mut self.high_pass.left,
                        &self.low_pass_coeffs,
                        &mut self.low_pass.left,
                    );
                    if let Some(right) = right.as_deref_mut() {
                        right[i] = Self::split_band(
                            in_right,
                            gain,
                            &self.high_pass_coeffs,
                            &mut self.high_pass.right,
                            &self.low_pass_coeffs,
                            &mut self.low_pass.right,
                        );
                    }
                }
                DeEsserMode::Wideband => {
                    left[i] = in_left * gain;
                    if let Some(right) = right.as_deref_mut() {
                        right[i] = in_right * gain;
                    }
                }
            }
        }

        self.meter.update(block_peak_db);
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_time_constants();
        self.update_filters();
        self.reset();
        debug!(sample_rate, max_block_size, "de-esser prepared");
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.high_pass.reset();
        self.low_pass.reset();
        self.envelope.reset();
        self.gain.reset();
        self.meter.reset();
    }

    impl_effect_common!("deesser");
}
