//! Effect trait definition
//!
//! Shared lifecycle of every stage in the vocal chain.

use crate::engine::AudioBuffer;

/// Base trait for all DSP stages
///
/// Stages process audio buffers in place. `process` must not allocate,
/// lock or log: it runs on the audio thread once per block.
pub trait Effect: Send + Sync {
    /// Process audio buffer in place
    ///
    /// A buffer with no channels is left alone. A mono buffer is handled by
    /// treating the left channel as the right one for detection.
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Prepare the stage for processing
    ///
    /// Called when sample rate or block size changes. Recomputes all
    /// coefficients and clears all state.
    fn prepare(&mut self, sample_rate: f64, max_block_size: usize);

    /// Reset stage state
    ///
    /// Clears filter memory, envelopes and meters. Parameters are kept.
    fn reset(&mut self);

    /// Get the stage type identifier
    fn effect_type(&self) -> &'static str;

    /// Check if the stage is bypassed
    fn is_bypassed(&self) -> bool;

    /// Bypass or engage the stage
    fn set_bypass(&mut self, bypass: bool);
}

/// Helper macro to implement common Effect trait methods
///
/// Expects the implementing type to keep its parameters in `self.params`
/// with a `bypass` flag.
#[macro_export]
macro_rules! impl_effect_common {
    ($effect_type:expr) => {
        fn effect_type(&self) -> &'static str {
            $effect_type
        }

        fn is_bypassed(&self) -> bool {
            self.params.bypass
        }

        fn set_bypass(&mut self, bypass: bool) {
            self.params.bypass = bypass;
        }
    };
}
