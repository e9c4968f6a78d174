//! Benchmarks for the DAHDSR envelope.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fontsynth::dsp::envelope::{Envelope, EnvelopeParams};

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Envelope::new(44_100.0);
        env.note_on(EnvelopeParams::adsr(10.0, 0.1, 0.7, 0.3));
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });

        // Sustain phase (holding steady)
        let mut env = Envelope::new(44_100.0);
        env.note_on(EnvelopeParams::adsr(0.001, 0.001, 0.7, 0.3));
        for _ in 0..200 {
            env.next_sample();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });

        // Release phase (ramping down)
        let mut env = Envelope::new(44_100.0);
        env.note_on(EnvelopeParams::adsr(0.001, 0.001, 0.7, 10.0));
        for _ in 0..200 {
            env.next_sample();
        }
        env.note_off();
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}
