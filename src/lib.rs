pub mod bank; // Instrument banks, presets, zones and loaders
pub mod driver; // Audio device output
pub mod dsp;
pub mod error;
pub mod io;
pub mod settings;
pub mod synth; // Channels, voices and the engine aggregate

pub use bank::{BankBuilder, BankId, BankLoader, InstrumentBank, Preset, PresetInfo, Zone};
pub use driver::{AudioDriver, DriverConfig};
pub use error::{Result, SynthError};
pub use io::MidiEvent;
pub use settings::{SettingValue, Settings};
pub use synth::{Binding, MonoNotes, Synth, SynthConfig, VoiceState};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
