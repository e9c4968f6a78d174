//! Whole-synth benchmarks.
//!
//! These drive the public `Synth` API the way an audio callback and a
//! control thread would.

mod control;
mod voices;

pub use control::bench_control;
pub use voices::bench_voices;

use fontsynth::{
    bank::LoopMode, dsp::envelope::EnvelopeParams, settings::keys, BankBuilder, InstrumentBank,
    Preset, Settings, Synth, Zone,
};

/// Synth with one looping, sustaining preset bound to channel 0.
pub fn looping_synth(polyphony: i32) -> Synth {
    let mut settings = Settings::new();
    settings.set_int(keys::POLYPHONY, polyphony).unwrap();
    let synth = Synth::new(&settings).unwrap();
    synth.add_bank(looping_bank(), true).unwrap();
    synth
}

fn looping_bank() -> InstrumentBank {
    let mut builder = BankBuilder::new("bench");
    let wave: Vec<i16> = (0..2048)
        .map(|i| ((i as f32 * std::f32::consts::TAU / 2048.0).sin() * 16_000.0) as i16)
        .collect();
    let span = builder.add_sample(&wave, 44_100).with_loop(0..2048);
    builder.add_preset(
        Preset::new("sine", 0, 0).with_zone(
            Zone::new(span)
                .loop_mode(LoopMode::Continuous)
                .envelope(EnvelopeParams::adsr(0.005, 0.1, 0.8, 0.3)),
        ),
    );
    builder.build().unwrap()
}
