#![allow(dead_code)]

use fontsynth::{
    bank::LoopMode, dsp::envelope::EnvelopeParams, settings::keys, BankBuilder, InstrumentBank,
    Preset, Settings, Synth, Zone,
};

pub fn synth_with_polyphony(polyphony: i32) -> Synth {
    let mut settings = Settings::new();
    settings.set_int(keys::POLYPHONY, polyphony).unwrap();
    Synth::new(&settings).unwrap()
}

/// One preset at (0, 0) holding a looped square wave with a 50ms release.
pub fn square_bank() -> InstrumentBank {
    let mut builder = BankBuilder::new("square");
    let wave: Vec<i16> = (0..200)
        .map(|i| if i < 100 { 10_000 } else { -10_000 })
        .collect();
    let span = builder.add_sample(&wave, 44_100).with_loop(0..200);
    builder.add_preset(
        Preset::new("square", 0, 0).with_zone(
            Zone::new(span)
                .loop_mode(LoopMode::Continuous)
                .envelope(EnvelopeParams::adsr(0.002, 0.05, 0.6, 0.05)),
        ),
    );
    builder.build().unwrap()
}

/// Two zones split at middle C plus a layer that covers the whole keyboard.
pub fn layered_bank() -> InstrumentBank {
    let mut builder = BankBuilder::new("layers");
    let low = builder.add_sample(&[6_000; 64], 22_050).with_loop(0..64);
    let high = builder.add_sample(&[-6_000; 64], 22_050).with_loop(0..64);
    builder.add_preset(
        Preset::new("split", 0, 0)
            .with_zone(Zone::new(low.clone()).keys(0..=59).loop_mode(LoopMode::Continuous))
            .with_zone(Zone::new(high).keys(60..=127).loop_mode(LoopMode::Continuous))
            .with_zone(Zone::new(low).loop_mode(LoopMode::Continuous)),
    );
    builder.build().unwrap()
}

pub fn is_silent(samples: &[i16]) -> bool {
    samples.iter().all(|&s| s == 0)
}
