//! Benchmarks for gain staging and 16-bit conversion.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fontsynth::dsp::mix;

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let voice: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut bus = vec![0.0f32; size];
        let mut out = vec![0i16; size];

        // One voice added to the bus at a panned gain
        group.bench_with_input(BenchmarkId::new("sum_scaled", size), &size, |b, _| {
            b.iter(|| {
                let (left, _) = mix::pan_gains(black_box(0.25));
                mix::sum_scaled_in_place(black_box(&mut bus), black_box(&voice), left);
            })
        });

        // Bus → i16 with clipping
        group.bench_with_input(BenchmarkId::new("to_i16", size), &size, |b, _| {
            b.iter(|| {
                for (o, &s) in out.iter_mut().zip(black_box(&voice)) {
                    *o = mix::to_i16(s * 0.2);
                }
            })
        });
    }

    group.finish();
}
