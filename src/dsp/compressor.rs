//! Compressor
//!
//! Feed-forward compressor with a single stereo-linked peak detector,
//! soft-knee gain computer, makeup gain and optional auto-release.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::envelope::{EnvelopeFollower, ReductionMeter};
use super::filter_math::{db_to_linear, linear_to_db, one_pole_coefficient};
use super::Effect;
use crate::engine::AudioBuffer;
use crate::impl_effect_common;

/// Reduction above which auto-release slows the release
const AUTO_RELEASE_THRESHOLD_DB: f32 = 6.0;

/// Compressor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Threshold level in dB (-60 to 0 dB)
    pub threshold_db: f32,
    /// Compression ratio (1.0 to 20.0, representing 1:1 to 20:1)
    pub ratio: f32,
    /// Attack time in milliseconds (0.1 to 100 ms)
    pub attack_ms: f32,
    /// Release time in milliseconds (10 to 1000 ms)
    pub release_ms: f32,
    /// Makeup gain in dB (0 to 24 dB)
    pub makeup_gain_db: f32,
    /// Knee width in dB (0 = hard knee, up to 12 dB for soft knee)
    pub knee_db: f32,
    /// Lengthen the release under heavy reduction
    pub auto_release: bool,
    pub bypass: bool,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            makeup_gain_db: 0.0,
            knee_db: 6.0,
            auto_release: false,
            bypass: false,
        }
    }
}

impl CompressorParams {
    /// Clamp parameters to valid ranges
    pub fn clamp(&mut self) {
        self.threshold_db = self.threshold_db.clamp(-60.0, 0.0);
        self.ratio = self.ratio.clamp(1.0, 20.0);
        self.attack_ms = self.attack_ms.clamp(0.1, 100.0);
        self.release_ms = self.release_ms.clamp(10.0, 1000.0);
        self.makeup_gain_db = self.makeup_gain_db.clamp(0.0, 24.0);
        self.knee_db = self.knee_db.clamp(0.0, 12.0);
    }

    /// Static gain reduction in dB (non-negative) for a detector level in dB
    ///
    /// Hard knee when `knee_db` is zero. Otherwise the ratio ramps from 1:1
    /// at `threshold - knee/2` to the full ratio at `threshold + knee/2`.
    /// Inside the knee the reduction is `over * (1 - 1/ratio') * progress / 2`,
    /// which meets the hard-knee line exactly at the upper edge.
    pub fn compute_reduction_db(&self, input_db: f32) -> f32 {
        let threshold = self.threshold_db;
        let ratio = self.ratio;
        let knee = self.knee_db;

        if knee > 0.0 {
            let knee_start = threshold - knee / 2.0;
            let knee_end = threshold + knee / 2.0;

            if input_db <= knee_start {
                0.0
            } else if input_db >= knee_end {
                (input_db - threshold) * (1.0 - 1.0 / ratio)
            } else {
                let progress = (input_db - knee_start) / knee;
                let soft_ratio = 1.0 + (ratio - 1.0) * progress;
                (input_db - knee_start) * (1.0 - 1.0 / soft_ratio) * progress * 0.5
            }
        } else if input_db > threshold {
            (input_db - threshold) * (1.0 - 1.0 / ratio)
        } else {
            0.0
        }
    }
}

/// Compressor dynamics processor
///
/// One detector drives both channels: the detector input is the larger of
/// the two rectified samples and the right channel follows the left
/// envelope exactly.
#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    sample_rate: f64,
    envelope: EnvelopeFollower,
    /// Release coefficient at twice the release time, for auto-release
    slow_release_coeff: f32,
    makeup_linear: f32,
    meter: ReductionMeter,
}

impl Compressor {
    /// Create a new compressor with default parameters
    pub fn new() -> Self {
        Self::with_params(CompressorParams::default())
    }

    /// Create a new compressor with custom parameters (clamped)
    pub fn with_params(mut params: CompressorParams) -> Self {
        params.clamp();
        let mut comp = Self {
            params,
            sample_rate: 44100.0,
            envelope: EnvelopeFollower::default(),
            slow_release_coeff: 1.0,
            makeup_linear: 1.0,
            meter: ReductionMeter::new(0.9, 0.1),
        };
        comp.update_coefficients();
        comp
    }

    /// Get the current parameters
    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    /// Apply a full parameter set through the individual setters
    pub fn apply_params(&mut self, params: &CompressorParams) {
        self.set_threshold_db(params.threshold_db);
        self.set_ratio(params.ratio);
        self.set_attack_ms(params.attack_ms);
        self.set_release_ms(params.release_ms);
        self.set_makeup_gain_db(params.makeup_gain_db);
        self.set_knee_db(params.knee_db);
        self.set_auto_release(params.auto_release);
        self.set_bypass(params.bypass);
    }

    /// Set threshold in dB
    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.params.threshold_db = threshold_db.clamp(-60.0, 0.0);
    }

    /// Set compression ratio (1:1 to 20:1)
    pub fn set_ratio(&mut self, ratio: f32) {
        self.params.ratio = ratio.clamp(1.0, 20.0);
    }

    /// Set attack time in milliseconds
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        let attack_ms = attack_ms.clamp(0.1, 100.0);
        if attack_ms != self.params.attack_ms {
            self.params.attack_ms = attack_ms;
            self.update_coefficients();
        }
    }

    /// Set release time in milliseconds
    pub fn set_release_ms(&mut self, release_ms: f32) {
        let release_ms = release_ms.clamp(10.0, 1000.0);
        if release_ms != self.params.release_ms {
            self.params.release_ms = release_ms;
            self.update_coefficients();
        }
    }

    /// Set makeup gain in dB
    pub fn set_makeup_gain_db(&mut self, makeup_gain_db: f32) {
        let makeup_gain_db = makeup_gain_db.clamp(0.0, 24.0);
        if makeup_gain_db != self.params.makeup_gain_db {
            self.params.makeup_gain_db = makeup_gain_db;
            self.makeup_linear = db_to_linear(makeup_gain_db);
        }
    }

    /// Set knee width in dB (0 = hard knee)
    pub fn set_knee_db(&mut self, knee_db: f32) {
        self.params.knee_db = knee_db.clamp(0.0, 12.0);
    }

    pub fn set_auto_release(&mut self, auto_release: bool) {
        self.params.auto_release = auto_release;
    }

    /// Static gain reduction in dB for a detector level in dB
    pub fn compute_reduction_db(&self, input_db: f32) -> f32 {
        self.params.compute_reduction_db(input_db)
    }

    /// Smoothed gain reduction in dB for metering
    pub fn gain_reduction_db(&self) -> f32 {
        self.meter.value()
    }

    /// Current detector level (linear)
    pub fn envelope(&self) -> f32 {
        self.envelope.level()
    }

    /// Update attack/release coefficients based on sample rate and time constants
    fn update_coefficients(&mut self) {
        self.envelope
            .set_times(self.sample_rate, self.params.attack_ms, self.params.release_ms);
        self.slow_release_coeff =
            one_pole_coefficient(self.sample_rate, self.params.release_ms * 2.0);
        self.makeup_linear = db_to_linear(self.params.makeup_gain_db);
        trace!(
            attack_ms = self.params.attack_ms,
            release_ms = self.params.release_ms,
            "compressor coefficients updated"
        );
    }

    /// Advance the detector by one stereo frame and return the reduction in dB
    #[inline]
    fn detect(&mut self, in_left: f32, in_right: f32) -> f32 {
        let level = in_left.abs().max(in_right.abs());
        let envelope = self.envelope.process(level);
        let reduction_db = self.params.compute_reduction_db(linear_to_db(envelope));

        // Applied after the gain is computed, so it only shapes the next sample
        if self.params.auto_release && reduction_db > AUTO_RELEASE_THRESHOLD_DB {
            let pull = (self.slow_release_coeff - self.envelope.release_coeff()) * 0.5;
            self.envelope.nudge(pull, level);
        }

        reduction_db
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Compressor {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.params.bypass {
            return;
        }

        let Some((left, mut right)) = buffer.stereo_mut() else {
            return;
        };

        let makeup = self.makeup_linear;
        let mut block_peak_db = 0.0_f32;

        for i in 0..left.len() {
            let in_left = left[i];
            let in_right = right.as_deref().map_or(in_left, |r| r[i]);

            let reduction_db = self.detect(in_left, in_right);
            block_peak_db = block_peak_db.max(reduction_db);

            let gain = db_to_linear(-reduction_db);
            left[i] = in_left * gain * makeup;
            if let Some(right) = right.as_deref_mut() {
                right[i] = in_right * gain * makeup;
            }
        }

        self.meter.update(block_peak_db);
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
        self.reset();
        debug!(sample_rate, max_block_size, "compressor prepared");
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.meter.reset();
    }

    impl_effect_common!("compressor");
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: f64 = 48000.0;

    fn prepared(params: CompressorParams) -> Compressor {
        let mut comp = Compressor::with_params(params);
        comp.prepare(SR, 512);
        comp
    }

    fn sine(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    #[test]
    fn test_compressor_default_params() {
        let comp = Compressor::new();
        let params = comp.params();

        assert_eq!(params.threshold_db, -20.0);
        assert_eq!(params.ratio, 4.0);
        assert_eq!(params.attack_ms, 10.0);
        assert_eq!(params.release_ms, 100.0);
        assert_eq!(params.makeup_gain_db, 0.0);
        assert_eq!(params.knee_db, 6.0);
        assert!(!params.auto_release);
        assert!(!params.bypass);
    }

    #[test]
    fn test_parameter_clamping() {
        let mut params = CompressorParams {
            threshold_db: -100.0,
            ratio: 50.0,
            attack_ms: 0.001,
            release_ms: 5000.0,
            makeup_gain_db: 50.0,
            knee_db: 20.0,
            ..Default::default()
        };

        params.clamp();

        assert_eq!(params.threshold_db, -60.0);
        assert_eq!(params.ratio, 20.0);
        assert_eq!(params.attack_ms, 0.1);
        assert_eq!(params.release_ms, 1000.0);
        assert_eq!(params.makeup_gain_db, 24.0);
        assert_eq!(params.knee_db, 12.0);
    }

    #[test]
    fn test_setters_clamp_values() {
        let mut comp = Compressor::new();

        comp.set_threshold_db(10.0);
        assert_eq!(comp.params().threshold_db, 0.0);

        comp.set_ratio(0.5);
        assert_eq!(comp.params().ratio, 1.0);

        comp.set_attack_ms(500.0);
        assert_eq!(comp.params().attack_ms, 100.0);

        comp.set_release_ms(1.0);
        assert_eq!(comp.params().release_ms, 10.0);

        comp.set_makeup_gain_db(-3.0);
        assert_eq!(comp.params().makeup_gain_db, 0.0);

        comp.set_knee_db(-1.0);
        assert_eq!(comp.params().knee_db, 0.0);
    }

    #[test]
    fn test_gain_computer_hard_knee() {
        let params = CompressorParams {
            threshold_db: -20.0,
            ratio: 4.0,
            knee_db: 0.0,
            ..Default::default()
        };

        assert_eq!(params.compute_reduction_db(-30.0), 0.0);
        assert_eq!(params.compute_reduction_db(-20.0), 0.0);
        // 8 dB over at 4:1 keeps 2 dB, so 6 dB of reduction
        assert_abs_diff_eq!(params.compute_reduction_db(-12.0), 6.0, epsilon = 1e-5);
    }

    #[test]
    fn test_gain_computer_soft_knee_edges() {
        let params = CompressorParams {
            threshold_db: -20.0,
            ratio: 4.0,
            knee_db: 6.0,
            ..Default::default()
        };

        assert_eq!(params.compute_reduction_db(-23.0), 0.0);
        assert_abs_diff_eq!(params.compute_reduction_db(-17.0), 2.25, epsilon = 1e-5);
        assert_abs_diff_eq!(params.compute_reduction_db(-8.0), 9.0, epsilon = 1e-5);

        let mid = params.compute_reduction_db(-20.0);
        assert!(mid > 0.0 && mid < 2.25, "knee midpoint reduction {}", mid);
    }

    #[test]
    fn test_gain_curve_continuous_and_monotonic() {
        for &threshold in &[-60.0_f32, -35.0, -20.0, -6.0, 0.0] {
            for &knee in &[0.0_f32, 0.5, 3.0, 6.0, 12.0] {
                for &ratio in &[1.0_f32, 1.5, 4.0, 10.0, 20.0] {
                    let params = CompressorParams {
                        threshold_db: threshold,
                        knee_db: knee,
                        ratio,
                        ..Default::default()
                    };

                    let mut prev = params.compute_reduction_db(-80.0);
                    let mut level = -80.0_f32;
                    while level <= 20.0 {
                        level += 0.01;
                        let reduction = params.compute_reduction_db(level);
                        assert!(
                            reduction >= prev - 1e-5,
                            "decreasing at {} dB (t={}, k={}, r={})",
                            level,
                            threshold,
                            knee,
                            ratio
                        );
                        assert!(
                            reduction - prev < 0.011,
                            "jump at {} dB (t={}, k={}, r={})",
                            level,
                            threshold,
                            knee,
                            ratio
                        );
                        prev = reduction;
                    }
                }
            }
        }
    }

    #[test]
    fn test_steady_state_reduction() {
        let mut comp = prepared(CompressorParams {
            threshold_db: -20.0,
            ratio: 4.0,
            knee_db: 0.0,
            attack_ms: 1.0,
            ..Default::default()
        });

        // Constant magnitude at -10 dBFS so the peak detector sees a flat level
        let level = db_to_linear(-10.0);
        let input: Vec<f32> = (0..48000)
            .map(|i| if i % 2 == 0 { level } else { -level })
            .collect();
        let mut buffer = AudioBuffer::from_channels(vec![input.clone(), input]).unwrap();
        comp.process(&mut buffer);

        let expected_gain = db_to_linear(-7.5);
        let out = buffer.channel(0)[47999].abs();
        assert_abs_diff_eq!(out / level, expected_gain, epsilon = 1e-4);
        assert_abs_diff_eq!(
            comp.compute_reduction_db(linear_to_db(comp.envelope())),
            7.5,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_below_threshold_applies_only_makeup() {
        let mut comp = prepared(CompressorParams {
            threshold_db: -10.0,
            knee_db: 0.0,
            makeup_gain_db: 6.0,
            ..Default::default()
        });

        let input = sine(440.0, 2048, 0.1);
        let mut buffer = AudioBuffer::from_channels(vec![input.clone(), input.clone()]).unwrap();
        comp.process(&mut buffer);

        let makeup = db_to_linear(6.0);
        for (out, inp) in buffer.channel(0).iter().zip(&input) {
            assert_eq!(*out, inp * 1.0 * makeup);
        }
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_process_above_threshold_reduces_level() {
        let mut comp = prepared(CompressorParams {
            threshold_db: -20.0,
            attack_ms: 0.1,
            release_ms: 10.0,
            ..Default::default()
        });

        let input = sine(440.0, 4800, 0.5);
        let mut buffer = AudioBuffer::from_channels(vec![input.clone(), input.clone()]).unwrap();
        comp.process(&mut buffer);

        let peak_in = input[2400..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        let peak_out = buffer.channel(0)[2400..]
            .iter()
            .fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak_out < peak_in * 0.5, "in={} out={}", peak_in, peak_out);
        assert!(comp.gain_reduction_db() > 0.0);
    }

    #[test]
    fn test_stereo_linked_detection() {
        let mut comp = prepared(CompressorParams {
            threshold_db: -30.0,
            attack_ms: 0.1,
            ..Default::default()
        });

        // Loud left, quiet right: both channels get the same gain
        let left = vec![0.8_f32; 1024];
        let right = vec![0.01_f32; 1024];
        let mut buffer = AudioBuffer::from_channels(vec![left, right]).unwrap();
        comp.process(&mut buffer);

        let gain_left = buffer.channel(0)[1023] / 0.8;
        let gain_right = buffer.channel(1)[1023] / 0.01;
        assert_abs_diff_eq!(gain_left, gain_right, epsilon = 1e-4);
        assert!(gain_left < 0.5);
    }

    #[test]
    fn test_mono_uses_left_as_right() {
        let params = CompressorParams {
            threshold_db: -30.0,
            attack_ms: 0.1,
            ..Default::default()
        };
        let mut mono_comp = prepared(params.clone());
        let mut stereo_comp = prepared(params);

        let input = sine(200.0, 1024, 0.7);
        let mut mono = AudioBuffer::from_channels(vec![input.clone()]).unwrap();
        let mut stereo = AudioBuffer::from_channels(vec![input.clone(), input]).unwrap();
        mono_comp.process(&mut mono);
        stereo_comp.process(&mut stereo);

        assert_eq!(mono.num_channels(), 1);
        assert_eq!(mono.channel(0), stereo.channel(0));
    }

    #[test]
    fn test_auto_release_holds_reduction_longer() {
        let params = CompressorParams {
            threshold_db: -40.0,
            ratio: 10.0,
            attack_ms: 0.1,
            release_ms: 50.0,
            knee_db: 0.0,
            ..Default::default()
        };
        let mut plain = prepared(params.clone());
        let mut auto = prepared(CompressorParams {
            auto_release: true,
            ..params
        });

        let mut input = vec![0.9_f32; 4800];
        input.extend(std::iter::repeat(0.0).take(2400));

        for comp in [&mut plain, &mut auto] {
            let mut buffer = AudioBuffer::from_channels(vec![input.clone()]).unwrap();
            comp.process(&mut buffer);
        }

        assert!(
            auto.envelope() > plain.envelope(),
            "auto {} plain {}",
            auto.envelope(),
            plain.envelope()
        );
    }

    #[test]
    fn test_auto_release_adjusts_envelope_after_gain() {
        let params = CompressorParams {
            threshold_db: -40.0,
            ratio: 10.0,
            attack_ms: 0.1,
            knee_db: 0.0,
            ..Default::default()
        };
        let mut plain = prepared(params.clone());
        let mut auto = prepared(CompressorParams {
            auto_release: true,
            ..params
        });

        // One sample, far enough over threshold to trigger auto-release
        let mut plain_buffer = AudioBuffer::from_channels(vec![vec![0.9]]).unwrap();
        let mut auto_buffer = AudioBuffer::from_channels(vec![vec![0.9]]).unwrap();
        plain.process(&mut plain_buffer);
        auto.process(&mut auto_buffer);

        assert!(plain.compute_reduction_db(linear_to_db(plain.envelope())) > 6.0);
        assert_eq!(auto_buffer.channel(0)[0], plain_buffer.channel(0)[0]);
        assert!(auto.envelope() < plain.envelope());
    }

    #[test]
    fn test_bypass_leaves_buffer_identical() {
        let mut comp = prepared(CompressorParams {
            threshold_db: -60.0,
            makeup_gain_db: 12.0,
            bypass: true,
            ..Default::default()
        });

        let input = sine(1000.0, 1024, 0.9);
        let mut buffer = AudioBuffer::from_channels(vec![input.clone(), input.clone()]).unwrap();
        comp.process(&mut buffer);

        assert_eq!(buffer.channel(0), input.as_slice());
        assert_eq!(buffer.channel(1), input.as_slice());
        assert_eq!(comp.envelope(), 0.0);
    }

    #[test]
    fn test_empty_buffer_is_noop() {
        let mut comp = prepared(CompressorParams::default());
        let mut buffer = AudioBuffer::empty();
        comp.process(&mut buffer);
        assert_eq!(comp.envelope(), 0.0);
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut comp = prepared(CompressorParams {
            threshold_db: -40.0,
            ..Default::default()
        });
        let input = sine(440.0, 2048, 0.8);
        let mut buffer = AudioBuffer::from_channels(vec![input.clone(), input]).unwrap();
        comp.process(&mut buffer);
        assert!(comp.envelope() > 0.0);

        comp.reset();
        assert_eq!(comp.envelope(), 0.0);
        assert_eq!(comp.gain_reduction_db(), 0.0);
        assert_eq!(comp.params().threshold_db, -40.0);
    }
}
