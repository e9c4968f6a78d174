//! Immutable, in-memory instrument banks.
//!
//! A bank is what a soundfont becomes once it has been parsed: one shared pool
//! of 16-bit sample data, and presets addressed by (bank number, program)
//! whose zones say which slice of the pool to play for which keys and
//! velocities, at what pitch, and with which envelope.
//!
//! Banks are built once (by a [`BankLoader`] or a [`BankBuilder`]) and never
//! mutated afterwards. The synth shares them behind an `Arc`, so a voice can
//! keep reading a bank that has already been unloaded.

pub mod loader;
#[cfg(feature = "sf2")]
pub mod sf2;

use std::{collections::HashMap, fmt, ops::Range, ops::RangeInclusive};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dsp::envelope::EnvelopeParams;

pub use loader::{default_loader, BankLoader};

/// Handle for one loaded bank. Assigned by the synth, never reused.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BankId(pub(crate) u32);

impl BankId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BankError {
    #[error("preset {preset:?}: zone {zone} reads samples {start}..{end} outside the pool of {len}")]
    SampleOutOfRange {
        preset: String,
        zone: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("preset {preset:?}: zone {zone} has a zero sample rate")]
    ZeroSampleRate { preset: String, zone: usize },
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    NoLoop,
    /// Loop for the whole life of the voice, release included.
    Continuous,
    /// Loop while the key is held, then play on to the end of the sample.
    UntilRelease,
}

/// Where one recording lives in the bank's sample pool.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpan {
    pub start: usize,
    pub end: usize,
    pub loop_start: usize,
    pub loop_end: usize,
    pub sample_rate: u32,
}

impl SampleSpan {
    pub fn new(range: Range<usize>, sample_rate: u32) -> Self {
        Self {
            start: range.start,
            end: range.end,
            loop_start: range.start,
            loop_end: range.end,
            sample_rate,
        }
    }

    /// Loop points relative to the span's start.
    pub fn with_loop(mut self, relative: Range<usize>) -> Self {
        self.loop_start = self.start + relative.start;
        self.loop_end = self.start + relative.end;
        self
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One key/velocity region of a preset, flattened to everything a voice
/// needs to play it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub keys: RangeInclusive<u8>,
    pub velocities: RangeInclusive<u8>,
    pub sample: SampleSpan,
    pub loop_mode: LoopMode,
    pub root_key: u8,
    /// Coarse and fine tuning combined, in cents.
    pub tune_cents: f32,
    /// Pitch change per key, in cents (100 = equal temperament, 0 = fixed).
    pub scale_tuning: f32,
    pub attenuation_db: f32,
    pub pan: f32,
    pub envelope: EnvelopeParams,
}

impl Zone {
    pub fn new(sample: SampleSpan) -> Self {
        Self {
            keys: 0..=127,
            velocities: 0..=127,
            sample,
            loop_mode: LoopMode::NoLoop,
            root_key: 60,
            tune_cents: 0.0,
            scale_tuning: 100.0,
            attenuation_db: 0.0,
            pan: 0.0,
            envelope: EnvelopeParams::default(),
        }
    }

    pub fn keys(mut self, keys: RangeInclusive<u8>) -> Self {
        self.keys = keys;
        self
    }

    pub fn velocities(mut self, velocities: RangeInclusive<u8>) -> Self {
        self.velocities = velocities;
        self
    }

    pub fn root_key(mut self, key: u8) -> Self {
        self.root_key = key;
        self
    }

    pub fn loop_mode(mut self, mode: LoopMode) -> Self {
        self.loop_mode = mode;
        self
    }

    pub fn tune_cents(mut self, cents: f32) -> Self {
        self.tune_cents = cents;
        self
    }

    pub fn attenuation_db(mut self, db: f32) -> Self {
        self.attenuation_db = db;
        self
    }

    pub fn pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    pub fn envelope(mut self, envelope: EnvelopeParams) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn matches(&self, key: u8, velocity: u8) -> bool {
        self.keys.contains(&key) && self.velocities.contains(&velocity)
    }

    /// Absolute loop range in the pool, if this zone loops at all.
    pub(crate) fn loop_range(&self) -> Option<Range<usize>> {
        match self.loop_mode {
            LoopMode::NoLoop => None,
            LoopMode::Continuous | LoopMode::UntilRelease => {
                Some(self.sample.loop_start..self.sample.loop_end)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Preset {
    name: String,
    bank_number: u16,
    program: u8,
    zones: Vec<Zone>,
}

impl Preset {
    pub fn new(name: impl Into<String>, bank_number: u16, program: u8) -> Self {
        Self {
            name: name.into(),
            bank_number,
            program,
            zones: Vec::new(),
        }
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.push(zone);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bank_number(&self) -> u16 {
        self.bank_number
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn matching(&self, key: u8, velocity: u8) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(move |z| z.matches(key, velocity))
    }

    pub fn info(&self) -> PresetInfo {
        PresetInfo {
            bank_number: self.bank_number,
            program: self.program,
            name: self.name.clone(),
            zones: self.zones.len(),
        }
    }
}

/// Summary of a preset for browsing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetInfo {
    pub bank_number: u16,
    pub program: u8,
    pub name: String,
    pub zones: usize,
}

#[derive(Debug)]
pub struct InstrumentBank {
    name: String,
    samples: Vec<i16>,
    presets: Vec<Preset>,
    index: HashMap<(u16, u8), usize>,
    by_program: HashMap<u8, usize>,
    first_playable: Option<usize>,
}

impl InstrumentBank {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Presets that can actually make a sound, in bank order.
    pub fn playable_presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter().filter(|p| !p.zones.is_empty())
    }

    pub fn preset_index(&self, bank_number: u16, program: u8) -> Option<usize> {
        self.index.get(&(bank_number, program)).copied()
    }

    /// Playable preset for `program` in the lowest bank number that has one.
    pub fn program_fallback(&self, program: u8) -> Option<usize> {
        self.by_program.get(&program).copied()
    }

    pub fn first_playable(&self) -> Option<usize> {
        self.first_playable
    }

    pub fn preset(&self, bank_number: u16, program: u8) -> Option<&Preset> {
        self.preset_index(bank_number, program)
            .map(|i| &self.presets[i])
    }

    pub fn preset_infos(&self) -> Vec<PresetInfo> {
        self.presets.iter().map(Preset::info).collect()
    }

    /// Approximate heap footprint, for logging.
    pub fn memory_size(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
            + self
                .presets
                .iter()
                .map(|p| p.zones.len() * std::mem::size_of::<Zone>())
                .sum::<usize>()
    }
}

/// Assembles an [`InstrumentBank`] and checks every zone against the pool.
#[derive(Debug, Default)]
pub struct BankBuilder {
    name: String,
    samples: Vec<i16>,
    presets: Vec<Preset>,
}

impl BankBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Start from an existing sample pool (e.g. a soundfont's sample chunk).
    pub fn from_pool(name: impl Into<String>, samples: Vec<i16>) -> Self {
        Self {
            name: name.into(),
            samples,
            presets: Vec::new(),
        }
    }

    /// Append a recording to the pool and return its span.
    pub fn add_sample(&mut self, data: &[i16], sample_rate: u32) -> SampleSpan {
        let start = self.samples.len();
        self.samples.extend_from_slice(data);
        SampleSpan::new(start..self.samples.len(), sample_rate)
    }

    pub fn add_preset(&mut self, preset: Preset) -> &mut Self {
        self.presets.push(preset);
        self
    }

    pub fn build(self) -> Result<InstrumentBank, BankError> {
        let len = self.samples.len();
        let mut index = HashMap::with_capacity(self.presets.len());
        let mut by_program: HashMap<u8, usize> = HashMap::new();
        let mut first_playable = None;

        for (i, preset) in self.presets.iter().enumerate() {
            for (z, zone) in preset.zones.iter().enumerate() {
                let span = &zone.sample;
                if span.start > span.end || span.end > len {
                    return Err(BankError::SampleOutOfRange {
                        preset: preset.name.clone(),
                        zone: z,
                        start: span.start,
                        end: span.end,
                        len,
                    });
                }
                if span.sample_rate == 0 {
                    return Err(BankError::ZeroSampleRate {
                        preset: preset.name.clone(),
                        zone: z,
                    });
                }
            }
            // first preset wins on duplicate addresses
            index.entry((preset.bank_number, preset.program)).or_insert(i);

            if preset.zones.is_empty() {
                continue;
            }
            first_playable.get_or_insert(i);
            by_program
                .entry(preset.program)
                .and_modify(|best| {
                    if preset.bank_number < self.presets[*best].bank_number {
                        *best = i;
                    }
                })
                .or_insert(i);
        }

        Ok(InstrumentBank {
            name: self.name,
            samples: self.samples,
            presets: self.presets,
            index,
            by_program,
            first_playable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_preset_bank() -> InstrumentBank {
        let mut builder = BankBuilder::new("test");
        let low = builder.add_sample(&[1, 2, 3, 4], 22_050);
        let high = builder.add_sample(&[5, 6, 7, 8], 44_100);

        builder
            .add_preset(
                Preset::new("Split", 0, 0)
                    .with_zone(Zone::new(low).keys(0..=59))
                    .with_zone(Zone::new(high).keys(60..=127)),
            )
            .add_preset(Preset::new("Empty", 0, 1));
        builder.build().unwrap()
    }

    #[test]
    fn samples_are_appended_to_one_pool() {
        let bank = two_preset_bank();
        assert_eq!(bank.samples(), &[1, 2, 3, 4, 5, 6, 7, 8]);

        let zones = bank.preset(0, 0).unwrap().zones();
        assert_eq!(zones[1].sample.start, 4);
        assert_eq!(zones[1].sample.end, 8);
    }

    #[test]
    fn lookup_by_bank_and_program() {
        let bank = two_preset_bank();
        assert_eq!(bank.preset_index(0, 1), Some(1));
        assert!(bank.preset(1, 0).is_none());
    }

    #[test]
    fn zones_are_selected_by_key() {
        let bank = two_preset_bank();
        let preset = bank.preset(0, 0).unwrap();

        let hits: Vec<_> = preset.matching(72, 100).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sample.sample_rate, 44_100);
    }

    #[test]
    fn fallbacks_skip_empty_presets() {
        let mut builder = BankBuilder::new("fallback");
        let span = builder.add_sample(&[1; 4], 44_100);
        builder
            .add_preset(Preset::new("Empty", 0, 3))
            .add_preset(Preset::new("Brass", 16, 3).with_zone(Zone::new(span.clone())))
            .add_preset(Preset::new("Horn", 8, 3).with_zone(Zone::new(span)));
        let bank = builder.build().unwrap();

        assert_eq!(bank.first_playable(), Some(1));
        assert_eq!(bank.program_fallback(3), Some(2));
        assert_eq!(bank.program_fallback(4), None);
    }

    #[test]
    fn playable_presets_skip_empty_ones() {
        let bank = two_preset_bank();
        let names: Vec<_> = bank.playable_presets().map(Preset::name).collect();
        assert_eq!(names, ["Split"]);
    }

    #[test]
    fn span_outside_pool_is_rejected() {
        let mut builder = BankBuilder::new("broken");
        builder.add_sample(&[0; 4], 44_100);
        builder.add_preset(
            Preset::new("Bad", 0, 0).with_zone(Zone::new(SampleSpan::new(2..10, 44_100))),
        );

        assert!(matches!(
            builder.build(),
            Err(BankError::SampleOutOfRange { len: 4, .. })
        ));
    }

    #[test]
    fn loop_points_are_relative_to_span() {
        let span = SampleSpan::new(100..200, 44_100).with_loop(10..90);
        assert_eq!((span.loop_start, span.loop_end), (110, 190));

        let zone = Zone::new(span).loop_mode(LoopMode::Continuous);
        assert_eq!(zone.loop_range(), Some(110..190));
    }
}
