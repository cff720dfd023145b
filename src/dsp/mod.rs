//! DSP stages of the vocal chain
//!
//! Every stage implements the `Effect` trait for uniform lifecycle and
//! in-place block processing. `AudioChain` runs them in fixed order.

pub mod biquad;
mod chain;
mod compressor;
mod deesser;
mod effect;
pub mod envelope;
mod equalizer;
pub mod filter_math;

pub use biquad::{BiquadState, StereoBiquad};
pub use chain::AudioChain;
pub use compressor::{Compressor, CompressorParams};
pub use deesser::{DeEsser, DeEsserMode, DeEsserParams};
pub use effect::Effect;
pub use envelope::{EnvelopeFollower, OnePoleSmoother, ReductionMeter};
pub use equalizer::{EqBand, EqParams, Equalizer, HpfSlope};
pub use filter_math::{
    db_to_linear, linear_to_db, one_pole_coefficient, BiquadCoeffs, FilterType, DB_FLOOR,
};
