//! Render cost as the number of sounding voices grows.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};

use super::looping_synth;
use crate::BLOCK_SIZES;

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &voices in &[1usize, 16, 64] {
        let synth = looping_synth(256);
        for key in 0..voices {
            synth.note_on(0, 24 + key as u8, 100).unwrap();
        }

        for &size in BLOCK_SIZES {
            let mut out = vec![0i16; size * 2];
            group.bench_with_input(
                BenchmarkId::new(format!("{voices}_voices"), size),
                &size,
                |b, _| b.iter(|| synth.write_s16_interleaved(black_box(&mut out))),
            );
        }
    }

    // Same load written to separate planar buffers
    let synth = looping_synth(256);
    for key in 0..16u8 {
        synth.note_on(0, 48 + key, 100).unwrap();
    }
    for &size in BLOCK_SIZES {
        let mut left = vec![0i16; size];
        let mut right = vec![0i16; size];
        group.bench_with_input(BenchmarkId::new("16_voices_planar", size), &size, |b, &n| {
            b.iter(|| synth.write_s16(n, &mut left, 0, 1, &mut right, 0, 1))
        });
    }

    group.finish();
}
