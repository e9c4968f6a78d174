//! Benchmarks for low-level DSP primitives.

mod envelope;
mod interpolate;
mod mix;

pub use envelope::bench_envelope;
pub use interpolate::bench_interpolate;
pub use mix::bench_mix;
