//! Named, typed settings consulted when a synth or driver is built.
//!
//! The store is a plain map. It only knows which keys are recognized and what
//! type each expects; defaults are applied later by whoever reads the store
//! (see `SynthConfig` and `DriverConfig`), so an empty store is a valid store.

use std::{collections::BTreeMap, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// Setting names understood by the engine and the audio driver.
pub mod keys {
    pub const SAMPLE_RATE: &str = "synth.sample-rate";
    pub const MIDI_CHANNELS: &str = "synth.midi-channels";
    pub const POLYPHONY: &str = "synth.polyphony";
    pub const GAIN: &str = "synth.gain";
    pub const MAX_BANKS: &str = "synth.max-banks";
    pub const INTERPOLATION: &str = "synth.interpolation";
    pub const AUDIO_DRIVER: &str = "audio.driver";
    pub const AUDIO_DEVICE: &str = "audio.device";
    pub const PERIOD_SIZE: &str = "audio.period-size";
}

const RECOGNIZED: &[(&str, SettingKind)] = &[
    (keys::SAMPLE_RATE, SettingKind::Num),
    (keys::MIDI_CHANNELS, SettingKind::Int),
    (keys::POLYPHONY, SettingKind::Int),
    (keys::GAIN, SettingKind::Num),
    (keys::MAX_BANKS, SettingKind::Int),
    (keys::INTERPOLATION, SettingKind::Str),
    (keys::AUDIO_DRIVER, SettingKind::Str),
    (keys::AUDIO_DEVICE, SettingKind::Str),
    (keys::PERIOD_SIZE, SettingKind::Int),
];

/// The declared type of a recognized key, `None` for keys nobody consults.
pub fn expected_kind(name: &str) -> Option<SettingKind> {
    RECOGNIZED
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, kind)| *kind)
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Str,
    Num,
    Int,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SettingKind::Str => "string",
            SettingKind::Num => "number",
            SettingKind::Int => "integer",
        })
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Str(String),
    Num(f64),
    Int(i32),
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Str(_) => SettingKind::Str,
            SettingValue::Num(_) => SettingKind::Num,
            SettingValue::Int(_) => SettingKind::Int,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_str(&mut self, name: &str, value: &str) -> Result<()> {
        self.set(name, SettingValue::Str(value.to_owned()))
    }

    pub fn set_num(&mut self, name: &str, value: f64) -> Result<()> {
        self.set(name, SettingValue::Num(value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> Result<()> {
        self.set(name, SettingValue::Int(value))
    }

    /// Upsert `name`. Unrecognized names are stored as given.
    pub fn set(&mut self, name: &str, value: SettingValue) -> Result<()> {
        if let Some(expected) = expected_kind(name) {
            if value.kind() != expected {
                return Err(SynthError::InvalidSettingType {
                    name: name.to_owned(),
                    expected,
                });
            }
        }
        self.values.insert(name.to_owned(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(SettingValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_num(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(SettingValue::Num(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.values.get(name) {
            Some(SettingValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // A deserialized store can carry a mistyped value that `set` would have
    // refused, so readers re-check the type here.

    pub(crate) fn num_or(&self, name: &str, default: f64) -> Result<f64> {
        self.typed(name, SettingKind::Num)?;
        Ok(self.get_num(name).unwrap_or(default))
    }

    pub(crate) fn int_or(&self, name: &str, default: i32) -> Result<i32> {
        self.typed(name, SettingKind::Int)?;
        Ok(self.get_int(name).unwrap_or(default))
    }

    pub(crate) fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str> {
        self.typed(name, SettingKind::Str)?;
        Ok(self.get_str(name).unwrap_or(default))
    }

    fn typed(&self, name: &str, expected: SettingKind) -> Result<()> {
        match self.values.get(name) {
            Some(value) if value.kind() != expected => Err(SynthError::InvalidConfiguration(
                format!("`{name}` holds a {} but expects a {expected}", value.kind()),
            )),
            _ => Ok(()),
        }
    }
}
