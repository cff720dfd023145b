//! Filter math
//!
//! Stateless coefficient design shared by every stage: one-pole time
//! constants, level conversion and RBJ cookbook biquads.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
//!
//! None of this is meant for the per-sample loop. Stages call it from their
//! setters and `prepare`, then run on the cached results.

use std::f64::consts::PI;

/// Level reported for zero or negative linear input
pub const DB_FLOOR: f32 = -100.0;

/// Butterworth Q used for the HPF and the split-band crossover
pub const BUTTERWORTH_Q: f64 = 0.707;

/// Magnitude below which recursive state is flushed to zero
///
/// Far under the f32 noise floor, well above the subnormal range of both
/// f32 and f64.
pub const DENORMAL_THRESHOLD: f64 = 1e-30;

/// Flush a value below [`DENORMAL_THRESHOLD`] to exactly zero
#[inline]
pub fn flush_denormal(value: f64) -> f64 {
    if value.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        value
    }
}

/// One-pole smoothing coefficient for a time constant
///
/// Returns `1 - exp(-1 / (sample_rate * time_ms * 0.001))`, the fraction of
/// the remaining distance a follower covers per sample. A non-positive time
/// constant means an instant response (1.0).
pub fn one_pole_coefficient(sample_rate: f64, time_ms: f32) -> f32 {
    if time_ms <= 0.0 {
        return 1.0;
    }

    let samples = sample_rate * time_ms as f64 * 0.001;
    // exp_m1 keeps precision for long time constants where exp(-x) ~ 1
    (-(-1.0 / samples).exp_m1()) as f32
}

/// Convert linear amplitude to decibels, floored at [`DB_FLOOR`]
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        DB_FLOOR
    }
}

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Biquad response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Remove below frequency
    HighPass,
    /// Remove above frequency
    LowPass,
    /// Band-pass with unity gain at the center frequency
    BandPass,
    /// Bell curve boost/cut
    Peaking,
    /// Boost/cut below frequency
    LowShelf,
    /// Boost/cut above frequency
    HighShelf,
}

/// Biquad filter coefficients
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoeffs {
    /// Pass-through section
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Design a section from the cookbook formulas
    ///
    /// `q` is the quality factor for pass/peaking types and the shelf slope
    /// (S) for shelves. `gain_db` is ignored by the pass types.
    pub fn design(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        // Keep the design frequency below Nyquist; degenerate rates pin it at 1 Hz
        let freq = frequency.clamp(1.0, (sample_rate * 0.49).max(1.0));

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::HighPass => {
                let alpha = sin_w0 / (2.0 * q);
                (
                    (1.0 + cos_w0) / 2.0,
                    -(1.0 + cos_w0),
                    (1.0 + cos_w0) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterType::LowPass => {
                let alpha = sin_w0 / (2.0 * q);
                (
                    (1.0 - cos_w0) / 2.0,
                    1.0 - cos_w0,
                    (1.0 - cos_w0) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterType::BandPass => {
                let alpha = sin_w0 / (2.0 * q);
                (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Peaking => {
                let alpha = sin_w0 / (2.0 * q);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            FilterType::LowShelf => {
                let alpha = sin_w0 / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let alpha = sin_w0 / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        // Normalize by a0
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    pub fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::design(FilterType::HighPass, sample_rate, frequency, 0.0, q)
    }

    pub fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::design(FilterType::LowPass, sample_rate, frequency, 0.0, q)
    }

    pub fn band_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::design(FilterType::BandPass, sample_rate, frequency, 0.0, q)
    }

    pub fn peaking(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        Self::design(FilterType::Peaking, sample_rate, frequency, gain_db, q)
    }

    pub fn low_shelf(sample_rate: f64, frequency: f64, gain_db: f64, slope: f64) -> Self {
        Self::design(FilterType::LowShelf, sample_rate, frequency, gain_db, slope)
    }

    pub fn high_shelf(sample_rate: f64, frequency: f64, gain_db: f64, slope: f64) -> Self {
        Self::design(FilterType::HighShelf, sample_rate, frequency, gain_db, slope)
    }

    /// Magnitude of the transfer function at `frequency`
    ///
    /// Evaluates |H(e^jw)| with w = 2*pi*frequency/sample_rate.
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (sin_w, cos_w) = w.sin_cos();
        let (sin_2w, cos_2w) = (2.0 * w).sin_cos();

        let num_re = self.b0 + self.b1 * cos_w + self.b2 * cos_2w;
        let num_im = -self.b1 * sin_w - self.b2 * sin_2w;
        let den_re = 1.0 + self.a1 * cos_w + self.a2 * cos_2w;
        let den_im = -self.a1 * sin_w - self.a2 * sin_2w;

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}
