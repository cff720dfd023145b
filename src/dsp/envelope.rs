//! Detector building blocks shared by the dynamics stages
//!
//! - `EnvelopeFollower`: one-pole peak follower with separate attack/release
//! - `OnePoleSmoother`: single-coefficient declicker for applied gain
//! - `ReductionMeter`: once-per-block smoothed gain reduction for display

use super::filter_math::{flush_denormal, one_pole_coefficient};

/// One-pole follower tracking a non-negative signal level
///
/// Moves a fraction of the way toward its input each sample, using the
/// attack coefficient when the input is above the current level and the
/// release coefficient otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeFollower {
    level: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl Default for EnvelopeFollower {
    fn default() -> Self {
        Self {
            level: 0.0,
            attack_coeff: 1.0,
            release_coeff: 1.0,
        }
    }
}

impl EnvelopeFollower {
    /// Recompute attack/release coefficients from time constants
    pub fn set_times(&mut self, sample_rate: f64, attack_ms: f32, release_ms: f32) {
        self.attack_coeff = one_pole_coefficient(sample_rate, attack_ms);
        self.release_coeff = one_pole_coefficient(sample_rate, release_ms);
    }

    /// Feed one detector sample (already rectified) and return the new level
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let coeff = if input > self.level {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.level += coeff * (input - self.level);
        self.level = flush_denormal(self.level as f64) as f32;
        self.level
    }

    /// Extra pull of `amount` times the distance toward `target`
    ///
    /// A negative amount pushes away from the target, which is how the
    /// compressor lengthens its release. The level never drops below zero.
    #[inline]
    pub fn nudge(&mut self, amount: f32, target: f32) {
        self.level = (self.level + amount * (target - self.level)).max(0.0);
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn attack_coeff(&self) -> f32 {
        self.attack_coeff
    }

    pub fn release_coeff(&self) -> f32 {
        self.release_coeff
    }

    /// Zero the level, keeping coefficients
    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

/// Single-coefficient one-pole smoother
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnePoleSmoother {
    value: f32,
    initial: f32,
    coeff: f32,
}

impl OnePoleSmoother {
    pub fn new(initial: f32) -> Self {
        Self {
            value: initial,
            initial,
            coeff: 1.0,
        }
    }

    pub fn set_time(&mut self, sample_rate: f64, time_ms: f32) {
        self.coeff = one_pole_coefficient(sample_rate, time_ms);
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.value += self.coeff * (target - self.value);
        self.value
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = self.initial;
    }
}

/// Exponentially smoothed gain-reduction reading, updated once per block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReductionMeter {
    value: f32,
    old_weight: f32,
    new_weight: f32,
}

impl ReductionMeter {
    pub fn new(old_weight: f32, new_weight: f32) -> Self {
        Self {
            value: 0.0,
            old_weight,
            new_weight,
        }
    }

    /// Blend a block's peak reduction (dB) into the reading
    pub fn update(&mut self, block_peak_db: f32) {
        self.value = self.value * self.old_weight + block_peak_db * self.new_weight;
    }

    /// Current reading in dB of reduction (non-negative)
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}
