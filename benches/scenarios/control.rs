//! Control-path cost: note churn at full polyphony forces voice stealing.

use std::hint::black_box;

use criterion::Criterion;

use super::looping_synth;

pub fn bench_control(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/control");

    let synth = looping_synth(64);
    for key in 0..64u8 {
        synth.note_on(0, key, 100).unwrap();
    }

    let mut key = 64u8;
    group.bench_function("note_on_with_steal", |b| {
        b.iter(|| {
            synth.note_on(0, black_box(key), 100).unwrap();
            key = if key == 127 { 0 } else { key + 1 };
        })
    });

    group.bench_function("note_off_no_match", |b| {
        b.iter(|| synth.note_off(1, black_box(60)).unwrap())
    });

    group.finish();
}
