//! Benchmarks for reading a looped sample at a non-integer rate.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fontsynth::dsp::{interpolate::SampleCursor, Interpolation};

use crate::BLOCK_SIZES;

pub fn bench_interpolate(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/interpolate");

    let wave: Vec<i16> = (0..4096)
        .map(|i| ((i as f32 * 0.05).sin() * 20_000.0) as i16)
        .collect();
    // A4 played from a C4 root
    let step = 2f64.powf(9.0 / 12.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, method) in [
            ("none", Interpolation::None),
            ("linear", Interpolation::Linear),
            ("cubic", Interpolation::Cubic),
        ] {
            let mut cursor = SampleCursor::new(0..wave.len(), Some(1024..4096));
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for out in buffer.iter_mut() {
                        *out = cursor.read(black_box(&wave), method);
                        cursor.advance(step);
                    }
                })
            });
        }
    }

    group.finish();
}
