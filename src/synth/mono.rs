use std::path::Path;

use crate::{
    bank::BankId,
    error::{Result, SynthError},
    synth::Synth,
};

/// Plays one key at a time on a fixed channel: switching to a new key
/// releases the previous one first.
#[derive(Debug, Clone)]
pub struct MonoNotes {
    channel: usize,
    velocity: u8,
    current: Option<u8>,
}

impl MonoNotes {
    pub fn new(channel: usize, velocity: u8) -> Self {
        Self {
            channel,
            velocity,
            current: None,
        }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn current(&self) -> Option<u8> {
        self.current
    }

    /// Load `path` and bind this helper's channel to its `index`-th playable
    /// preset. The bank is unloaded again if there is no such preset.
    pub fn set_font(&self, synth: &Synth, path: impl AsRef<Path>, index: usize) -> Result<BankId> {
        let bank_id = synth.load(path, false)?;
        let bank = synth.bank(bank_id)?;

        let Some(preset) = bank.playable_presets().nth(index) else {
            let count = bank.playable_presets().count();
            synth.unload(bank_id, false)?;
            return Err(SynthError::InvalidConfiguration(format!(
                "preset index {index} out of range, bank has {count} playable presets"
            )));
        };

        synth.program_select(self.channel, bank_id, preset.bank_number(), preset.program())?;
        Ok(bank_id)
    }

    /// Release the sounding key, if any, and start `key`.
    pub fn switch(&mut self, synth: &Synth, key: u8) -> Result<()> {
        self.release(synth)?;
        synth.note_on(self.channel, key, self.velocity)?;
        self.current = Some(key);
        Ok(())
    }

    pub fn release(&mut self, synth: &Synth) -> Result<()> {
        if let Some(key) = self.current.take() {
            synth.note_off(self.channel, key)?;
        }
        Ok(())
    }
}
