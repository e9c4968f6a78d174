//! Benchmarks for sample playback primitives and full synth renders.
//!
//! Run with: cargo bench
//!
//! Reference timing at 44.1kHz sample rate:
//!   - 64 frames  = 1.45ms deadline
//!   - 128 frames = 2.90ms deadline
//!   - 256 frames = 5.80ms deadline
//!   - 512 frames = 11.61ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Envelope, interpolation and gain staging
//!   - scenarios/*  Whole-synth renders at increasing voice counts

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    dsp::bench_envelope,
    dsp::bench_interpolate,
    dsp::bench_mix,
    scenarios::bench_voices,
    scenarios::bench_control,
);
criterion_main!(benches);
