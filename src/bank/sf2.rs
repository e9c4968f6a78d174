//! SoundFont 2 loading via `rustysynth`'s parser.
//!
//! The parser gives us presets → preset regions → instruments → instrument
//! regions, each carrying generator values. We flatten every (preset region,
//! instrument region) pair into one [`Zone`]: key and velocity ranges are
//! intersected, tunings and attenuations summed, and envelope times
//! multiplied (the parser reports preset-level times as factors).

use std::{fs::File, io::BufReader, path::Path};

use rustysynth::{InstrumentRegion, LoopMode as SfLoopMode, PresetRegion, SampleHeader, SoundFont};
use tracing::debug;

use crate::{
    bank::{BankBuilder, BankLoader, InstrumentBank, LoopMode, Preset, SampleSpan, Zone},
    dsp::{envelope::EnvelopeParams, mix::db_to_gain},
    error::{Result, SynthError},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Sf2Loader;

impl BankLoader for Sf2Loader {
    fn load(&self, path: &Path) -> Result<InstrumentBank> {
        let file = File::open(path).map_err(|e| SynthError::load(path, e))?;
        let mut reader = BufReader::new(file);
        let font = SoundFont::new(&mut reader)
            .map_err(|e| SynthError::load(path, format!("{e:?}")))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        flatten(&font, name).map_err(|e| SynthError::load(path, e))
    }
}

fn flatten(font: &SoundFont, name: String) -> std::result::Result<InstrumentBank, crate::bank::BankError> {
    let instruments = font.get_instruments();
    let headers = font.get_sample_headers();
    let mut builder = BankBuilder::from_pool(name, font.get_wave_data().to_vec());

    for sf_preset in font.get_presets().iter() {
        let mut preset = Preset::new(
            sf_preset.get_name(),
            sf_preset.get_bank_number().clamp(0, u16::MAX as i32) as u16,
            sf_preset.get_patch_number().clamp(0, 127) as u8,
        );

        for preset_region in sf_preset.get_regions().iter() {
            let Some(instrument) = instruments.get(preset_region.get_instrument_id()) else {
                continue;
            };
            for instrument_region in instrument.get_regions().iter() {
                if let Some(zone) = zone_from(preset_region, instrument_region, headers) {
                    preset.add_zone(zone);
                }
            }
        }

        debug!(
            preset = preset.name(),
            bank = preset.bank_number(),
            program = preset.program(),
            zones = preset.zones().len(),
            "flattened preset"
        );
        builder.add_preset(preset);
    }

    builder.build()
}

fn zone_from(p: &PresetRegion, i: &InstrumentRegion, headers: &[SampleHeader]) -> Option<Zone> {
    let keys = intersect(
        (p.get_key_range_start(), p.get_key_range_end()),
        (i.get_key_range_start(), i.get_key_range_end()),
    )?;
    let velocities = intersect(
        (p.get_velocity_range_start(), p.get_velocity_range_end()),
        (i.get_velocity_range_start(), i.get_velocity_range_end()),
    )?;

    let start = i.get_sample_start().max(0) as usize;
    let end = i.get_sample_end().max(0) as usize;
    let sample_rate = headers.get(i.get_sample_id())?.get_sample_rate().max(0) as u32;
    if end <= start || sample_rate == 0 {
        return None;
    }

    let sample = SampleSpan {
        start,
        end,
        loop_start: i.get_sample_start_loop().max(0) as usize,
        loop_end: i.get_sample_end_loop().max(0) as usize,
        sample_rate,
    };

    let loop_mode = match i.get_sample_modes() {
        SfLoopMode::Continuous => LoopMode::Continuous,
        SfLoopMode::LoopUntilNoteOff => LoopMode::UntilRelease,
        _ => LoopMode::NoLoop,
    };

    let tune_cents = 100.0 * (i.get_coarse_tune() + p.get_coarse_tune()) as f32
        + (i.get_fine_tune() + p.get_fine_tune()) as f32;

    let envelope = EnvelopeParams {
        delay: i.get_delay_volume_envelope() * p.get_delay_volume_envelope(),
        attack: i.get_attack_volume_envelope() * p.get_attack_volume_envelope(),
        hold: i.get_hold_volume_envelope() * p.get_hold_volume_envelope(),
        decay: i.get_decay_volume_envelope() * p.get_decay_volume_envelope(),
        sustain: db_to_gain(i.get_sustain_volume_envelope() + p.get_sustain_volume_envelope()),
        release: i.get_release_volume_envelope() * p.get_release_volume_envelope(),
    };

    Some(Zone {
        keys,
        velocities,
        sample,
        loop_mode,
        root_key: i.get_root_key().clamp(0, 127) as u8,
        tune_cents,
        scale_tuning: (i.get_scale_tuning() + p.get_scale_tuning()) as f32,
        attenuation_db: i.get_initial_attenuation() + p.get_initial_attenuation(),
        // generator pan is in percent, -50..=50
        pan: ((i.get_pan() + p.get_pan()) / 50.0).clamp(-1.0, 1.0),
        envelope,
    })
}

fn intersect(a: (i32, i32), b: (i32, i32)) -> Option<std::ops::RangeInclusive<u8>> {
    let lo = a.0.max(b.0).clamp(0, 127);
    let hi = a.1.min(b.1).clamp(0, 127);
    (lo <= hi).then(|| lo as u8..=hi as u8)
}
