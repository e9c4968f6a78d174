//! Gain staging, panning and the float → 16-bit output stage.

/*
Mixing Voices
=============

Every active voice adds its contribution into a shared stereo bus. Mixing is
plain ADDITION, so the bus can exceed [-1.0, +1.0] when many voices overlap;
the master gain is applied afterwards and the result is clipped once, at the
16-bit conversion.

Vocabulary
----------

  gain          A linear multiplier. 1.0 = unity, 0.5 ≈ -6 dB, 0.0 = silence.

  attenuation   A reduction expressed in decibels (positive = quieter).
                  gain = 10^(-dB / 20)

  pan           Stereo position, -1.0 (hard left) … 0.0 (centre) … +1.0
                (hard right).

  velocity      How hard the key was struck (1..=127). Mapped through a
                square law so soft notes fall off quickly, like most GM
                soundfonts expect.


Equal-Power Panning
-------------------

LINEAR panning (left = 1 - p, right = p) dips ~3 dB at the centre because
power, not amplitude, is what we hear. EQUAL-POWER panning keeps

    left² + right² = 1

    angle = (pan + 1) × π/4
    left  = cos(angle)
    right = sin(angle)

    pan = -1.0  →  (1.000, 0.000)
    pan =  0.0  →  (0.707, 0.707)
    pan = +1.0  →  (0.000, 1.000)


16-bit Output
-------------

    i16 = clamp(round(x × 32767), -32768, 32767)

Clipping is hard. The default master gain (0.2) leaves headroom for roughly
five full-scale voices before it engages.
*/

use std::f32::consts::FRAC_PI_4;

/// Equal-power (left, right) gains for `pan` in -1.0..=1.0.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Linear gain for an attenuation in decibels.
#[inline]
pub fn db_to_gain(attenuation_db: f32) -> f32 {
    10.0_f32.powf(-attenuation_db / 20.0)
}

/// Square-law velocity curve, 127 → 1.0.
#[inline]
pub fn velocity_gain(velocity: u8) -> f32 {
    let v = velocity.min(127) as f32 / 127.0;
    v * v
}

/// Add signal B into signal A in-place, scaled by `gain`.
///
/// ⚠️ WARNING: Can exceed [-1.0, +1.0] range!
#[inline]
pub fn sum_scaled_in_place(a: &mut [f32], b: &[f32], gain: f32) {
    debug_assert_eq!(a.len(), b.len());

    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb * gain;
    }
}

/// Convert one bus sample to a clipped signed 16-bit value.
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    let scaled = (sample * 32_767.0).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
