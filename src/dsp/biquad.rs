//! Biquad filter state
//!
//! One `BiquadState` per filter instance per channel. Coefficients live with
//! the owning stage and are shared by both channels.

use super::filter_math::{flush_denormal, BiquadCoeffs};

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl BiquadState {
    /// Process a single sample through the biquad filter
    /// Direct Form I implementation
    ///
    /// Decaying tails are flushed to zero once they fall below
    /// `DENORMAL_THRESHOLD`, so silence never runs on subnormal state.
    #[inline]
    pub fn process(&mut self, input: f32, coeffs: &BiquadCoeffs) -> f32 {
        let input = input as f64;
        let output = flush_denormal(
            coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
                - coeffs.a1 * self.y1
                - coeffs.a2 * self.y2,
        );

        // Shift delay line
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output as f32
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Left/right state pair for one filter instance
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoBiquad {
    pub left: BiquadState,
    pub right: BiquadState,
}

impl StereoBiquad {
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::filter_math::BUTTERWORTH_Q;

    #[test]
    fn test_identity_passes_input() {
        let mut state = BiquadState::default();
        for &x in &[0.5_f32, -0.25, 0.125, 0.0] {
            assert_eq!(state.process(x, &BiquadCoeffs::IDENTITY), x);
        }
    }

    #[test]
    fn test_difference_equation() {
        let coeffs = BiquadCoeffs {
            b0: 0.5,
            b1: 0.25,
            b2: 0.125,
            a1: -0.5,
            a2: 0.25,
        };
        let mut state = BiquadState::default();

        // Impulse response: y0 = b0, y1 = b1 - a1*y0, y2 = b2 - a1*y1 - a2*y0
        let y0 = state.process(1.0, &coeffs);
        let y1 = state.process(0.0, &coeffs);
        let y2 = state.process(0.0, &coeffs);
        assert_eq!(y0, 0.5);
        assert_eq!(y1, 0.5);
        assert_eq!(y2, 0.25);
    }

    #[test]
    fn test_reset_clears_memory() {
        let coeffs = BiquadCoeffs::low_pass(48000.0, 1000.0, BUTTERWORTH_Q);
        let mut state = BiquadState::default();
        for _ in 0..32 {
            state.process(1.0, &coeffs);
        }
        assert_ne!(state, BiquadState::default());

        state.reset();
        assert_eq!(state, BiquadState::default());
    }

    #[test]
    fn test_silent_tail_decays_to_exact_zero() {
        let coeffs = BiquadCoeffs::low_pass(48000.0, 1000.0, BUTTERWORTH_Q);
        let mut state = BiquadState::default();
        state.process(1.0, &coeffs);

        for _ in 0..4800 {
            let out = state.process(0.0, &coeffs);
            assert!(!out.is_subnormal());
        }
        assert_eq!(state, BiquadState::default());
    }

    #[test]
    fn test_low_pass_settles_to_dc() {
        let coeffs = BiquadCoeffs::low_pass(48000.0, 1000.0, BUTTERWORTH_Q);
        let mut state = BiquadState::default();
        let mut out = 0.0;
        for _ in 0..4800 {
            out = state.process(0.5, &coeffs);
        }
        assert!((out - 0.5).abs() < 1e-4);
    }
}
