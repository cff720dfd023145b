//! Chain Benchmarks
//!
//! Per-block cost of each stage and of the full chain at a typical host
//! block size.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voxproc::dsp::{Compressor, DeEsser, Effect, Equalizer};
use voxproc::engine::{AudioBuffer, ChainParams};
use voxproc::AudioChain;

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK_SIZE: usize = 512;

fn voice_block() -> AudioBuffer {
    let samples: Vec<f32> = (0..BLOCK_SIZE)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.4 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                + 0.2 * (2.0 * std::f32::consts::PI * 6500.0 * t).sin()
        })
        .collect();
    AudioBuffer::from_channels(vec![samples.clone(), samples]).unwrap()
}

fn bench_stage<E: Effect>(c: &mut Criterion, name: &str, mut effect: E) {
    effect.prepare(SAMPLE_RATE, BLOCK_SIZE);
    let source = voice_block();

    c.bench_function(name, |b| {
        b.iter(|| {
            let mut buffer = source.clone();
            effect.process(black_box(&mut buffer));
            buffer
        })
    });
}

fn benchmark_stages(c: &mut Criterion) {
    let mut eq = Equalizer::new();
    eq.set_band_gain_db(voxproc::dsp::EqBand::HighMid, 4.0);
    bench_stage(c, "equalizer_512_stereo", eq);
    bench_stage(c, "compressor_512_stereo", Compressor::new());
    bench_stage(c, "deesser_512_stereo", DeEsser::new());
}

fn benchmark_chain(c: &mut Criterion) {
    let params = ChainParams::default();
    let mut chain = AudioChain::with_params(&params);
    chain.prepare(SAMPLE_RATE, BLOCK_SIZE);
    let source = voice_block();

    c.bench_function("chain_512_stereo", |b| {
        b.iter(|| {
            let mut buffer = source.clone();
            chain.process(black_box(&mut buffer), black_box(&params));
            buffer
        })
    });
}

criterion_group!(benches, benchmark_stages, benchmark_chain);
criterion_main!(benches);
