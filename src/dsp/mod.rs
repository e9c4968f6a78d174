//! Low-level DSP primitives used by the voice renderer.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside pooled voices. They stay focused on the
//! signal-processing math; voice and channel bookkeeping lives in `synth`.

/// Delay/attack/hold/decay/sustain/release volume envelope.
pub mod envelope;
/// Fractional sample cursor and interpolation.
pub mod interpolate;
/// Panning, gain conversion and 16-bit output.
pub mod mix;

pub use envelope::{EnvelopeParams, EnvelopeStage};
pub use interpolate::Interpolation;
