//! CLI Command Implementations

use std::path::Path;

use anyhow::{ensure, Context, Result};
use tracing::{debug, info};

use crate::dsp::{CompressorParams, EqBand, Effect, Equalizer};
use crate::engine::ChainParams;

/// Lowest frequency of the response table
const RESPONSE_MIN_HZ: f64 = 20.0;
/// Highest frequency of the response table
const RESPONSE_MAX_HZ: f64 = 20_000.0;
/// Upper bound on compressor curve rows
const MAX_CURVE_POINTS: usize = 100_000;

/// One row of the compressor static curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub input_db: f32,
    pub reduction_db: f32,
    pub output_db: f32,
}

/// Load a preset from disk, or the defaults when no path is given
pub fn load_params(path: Option<&Path>) -> Result<ChainParams> {
    match path {
        Some(path) => {
            let params = ChainParams::from_json_file(path)
                .with_context(|| format!("Failed to load preset {}", path.display()))?;
            info!("Loaded preset: {}", path.display());
            Ok(params)
        }
        None => Ok(ChainParams::default()),
    }
}

/// Print the default parameter set
pub fn print_defaults() -> Result<()> {
    println!("{}", ChainParams::default().to_json_pretty()?);
    Ok(())
}

/// Load, clamp and print a preset
pub fn check_preset(path: &Path) -> Result<()> {
    let params = load_params(Some(path))?;
    println!("{}", params.to_json_pretty()?);
    Ok(())
}

/// `points` log-spaced frequencies from 20 Hz up to 20 kHz or Nyquist
pub fn log_frequencies(points: usize, sample_rate: f64) -> Result<Vec<f64>> {
    ensure!(points >= 2, "need at least 2 points, got {}", points);
    ensure!(sample_rate > 0.0, "sample rate must be positive, got {}", sample_rate);

    let top = RESPONSE_MAX_HZ.min(sample_rate * 0.5);
    ensure!(top > RESPONSE_MIN_HZ, "sample rate {} is too low", sample_rate);

    let span = top / RESPONSE_MIN_HZ;
    let last = (points - 1) as f64;
    Ok((0..points)
        .map(|i| RESPONSE_MIN_HZ * span.powf(i as f64 / last))
        .collect())
}

/// Magnitude response in dB, for the whole EQ or a single band
pub fn frequency_response(
    params: &ChainParams,
    sample_rate: f64,
    points: usize,
    band: Option<EqBand>,
) -> Result<Vec<(f64, f64)>> {
    let freqs = log_frequencies(points, sample_rate)?;

    let mut equalizer = Equalizer::with_params(params.eq.clone());
    equalizer.prepare(sample_rate, 0);

    Ok(freqs
        .into_iter()
        .map(|freq| {
            let magnitude = match band {
                Some(band) => equalizer.magnitude_band(freq, band),
                None => equalizer.magnitude(freq),
            };
            (freq, 20.0 * magnitude.max(1e-10).log10())
        })
        .collect())
}

/// Print the EQ response table
pub fn print_response(
    path: Option<&Path>,
    sample_rate: f64,
    points: usize,
    band: Option<EqBand>,
) -> Result<()> {
    let params = load_params(path)?;
    let response = frequency_response(&params, sample_rate, points, band)?;
    debug!(sample_rate, points, "computed EQ response");

    match band {
        Some(band) => println!("Band: {}", band),
        None => println!("Equalizer response"),
    }
    if band.map_or(true, |b| b == EqBand::HighPass) && params.eq.is_band_active(EqBand::HighPass) {
        println!(
            "High-pass: {:.0} Hz, {} dB/oct",
            params.eq.hpf_freq,
            params.eq.hpf_slope.db_per_octave()
        );
    }
    println!("{:>10}  {:>8}", "Hz", "dB");
    for (freq, db) in response {
        println!("{:>10.1}  {:>8.2}", freq, db);
    }
    Ok(())
}

/// Static compressor curve from `from` to `to` dBFS in `step` increments
pub fn compressor_curve(
    params: &CompressorParams,
    from: f32,
    to: f32,
    step: f32,
) -> Result<Vec<CurvePoint>> {
    ensure!(step > 0.0, "step must be positive, got {}", step);
    ensure!(from <= to, "range is empty: {} > {}", from, to);

    let mut params = params.clone();
    params.clamp();

    let steps = ((to - from) / step).floor();
    ensure!(
        steps.is_finite() && steps < MAX_CURVE_POINTS as f32,
        "step {} is too small for a {} dB range (at most {} points)",
        step,
        to - from,
        MAX_CURVE_POINTS
    );

    let count = steps as usize + 1;
    Ok((0..count)
        .map(|i| {
            let input_db = from + step * i as f32;
            let reduction_db = params.compute_reduction_db(input_db);
            CurvePoint {
                input_db,
                reduction_db,
                output_db: input_db - reduction_db + params.makeup_gain_db,
            }
        })
        .collect())
}

/// Print the compressor curve table
pub fn print_curve(path: Option<&Path>, from: f32, to: f32, step: f32) -> Result<()> {
    let params = load_params(path)?;
    let curve = compressor_curve(&params.compressor, from, to, step)?;

    let comp = &params.compressor;
    println!(
        "Threshold {:.1} dB, ratio {:.1}:1, knee {:.1} dB, makeup {:.1} dB",
        comp.threshold_db, comp.ratio, comp.knee_db, comp.makeup_gain_db
    );
    println!("{:>8}  {:>9}  {:>8}", "In dB", "GR dB", "Out dB");
    for point in curve {
        println!(
            "{:>8.1}  {:>9.2}  {:>8.2}",
            point.input_db, point.reduction_db, point.output_db
        );
    }
    Ok(())
}
