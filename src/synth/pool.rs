use std::sync::Arc;

use crate::{
    bank::{BankId, InstrumentBank, Zone},
    dsp::Interpolation,
    synth::{
        banks::Retired,
        channel::{Channel, ChannelMix},
        voice::{Voice, VoiceState},
    },
};

/// A sounding voice that was cut to make room for a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stolen {
    pub slot: usize,
    pub channel: usize,
    pub key: u8,
    pub state: VoiceState,
}

/// Fixed set of voices allocated once at construction.
pub struct VoicePool {
    voices: Vec<Voice>,
}

impl VoicePool {
    pub fn new(sample_rate: f32, polyphony: usize) -> Self {
        let voices = (0..polyphony).map(|_| Voice::new(sample_rate)).collect();
        Self { voices }
    }

    /// Index of a free voice, stealing one if none is free. Voices started
    /// with `serial` are never stolen, so a layered note cannot eat itself.
    ///
    /// Runs under the engine lock, so a steal is reported back to the caller
    /// instead of being logged here.
    pub fn allocate(&mut self, serial: u64, retired: &mut Retired) -> Option<(usize, Option<Stolen>)> {
        if let Some(idx) = self.voices.iter().position(Voice::is_free) {
            return Some((idx, None));
        }

        let idx = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.serial() != serial)
            .min_by_key(|(slot, v)| v.steal_key(*slot))
            .map(|(idx, _)| idx)?;

        let victim = &mut self.voices[idx];
        let stolen = Stolen {
            slot: idx,
            channel: victim.channel(),
            key: victim.key(),
            state: victim.state(),
        };
        retired.retire(victim.free());
        Some((idx, Some(stolen)))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        slot: usize,
        channel: usize,
        key: u8,
        velocity: u8,
        serial: u64,
        bank_id: BankId,
        bank: Arc<InstrumentBank>,
        zone: &Zone,
    ) {
        self.voices[slot].start(channel, key, velocity, serial, bank_id, bank, zone);
    }

    /// Release every held voice on `channel` playing `key`.
    pub fn release_key(&mut self, channel: usize, key: u8) -> usize {
        let mut released = 0;
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.is_held() && v.channel() == channel && v.key() == key)
        {
            voice.release();
            released += 1;
        }
        released
    }

    /// Release every held voice, optionally limited to one channel.
    pub fn release_channel(&mut self, channel: Option<usize>) {
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.is_held() && channel.map_or(true, |c| v.channel() == c))
        {
            voice.release();
        }
    }

    /// Fast-release every sounding voice, optionally limited to one channel.
    pub fn force_release_channel(&mut self, channel: Option<usize>, seconds: f32) {
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| !v.is_free() && channel.map_or(true, |c| v.channel() == c))
        {
            voice.force_release(seconds);
        }
    }

    /// Fast-release every voice reading `bank_id`.
    pub fn force_release_bank(&mut self, bank_id: BankId, seconds: f32) -> usize {
        let mut count = 0;
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.bank_id() == Some(bank_id))
        {
            voice.force_release(seconds);
            count += 1;
        }
        count
    }

    /// Mix every sounding voice into `left`/`right`, freeing those that
    /// finish during this block.
    pub fn render(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        scratch: &mut [f32],
        channels: &[Channel],
        interpolation: Interpolation,
        retired: &mut Retired,
    ) {
        let frames = left.len();
        let scratch = &mut scratch[..frames];

        for voice in self.voices.iter_mut().filter(|v| !v.is_free()) {
            let mix = channels
                .get(voice.channel())
                .map(Channel::mix)
                .unwrap_or(ChannelMix {
                    gain: 0.0,
                    pan: 0.0,
                    bend_cents: 0.0,
                });

            if voice.render(left, right, scratch, mix, interpolation) {
                retired.retire(voice.free());
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_free()).count()
    }

    pub fn states(&self) -> Vec<VoiceState> {
        self.voices.iter().map(Voice::state).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bank::{BankBuilder, LoopMode, Preset},
        dsp::envelope::EnvelopeParams,
        synth::banks::retirement,
    };

    fn looping_bank() -> Arc<InstrumentBank> {
        let mut builder = BankBuilder::new("loop");
        let span = builder.add_sample(&[8_000; 64], 44_100).with_loop(0..64);
        builder.add_preset(
            Preset::new("pad", 0, 0).with_zone(
                Zone::new(span)
                    .loop_mode(LoopMode::Continuous)
                    .envelope(EnvelopeParams::adsr(0.0, 0.0, 1.0, 0.5)),
            ),
        );
        Arc::new(builder.build().unwrap())
    }

    fn play(pool: &mut VoicePool, retired: &mut Retired, key: u8, velocity: u8, serial: u64) {
        let bank = looping_bank();
        let zone = bank.presets()[0].zones()[0].clone();
        let (slot, _) = pool.allocate(serial, retired).unwrap();
        pool.start(slot, 0, key, velocity, serial, BankId(1), bank, &zone);
    }

    #[test]
    fn oldest_held_voice_is_stolen_when_full() {
        let (mut retired, mut reclaimer) = retirement(16);
        let mut pool = VoicePool::new(44_100.0, 4);
        for (serial, key) in (60..=63).enumerate() {
            play(&mut pool, &mut retired, key, 100, serial as u64);
        }

        let bank = looping_bank();
        let (slot, stolen) = pool.allocate(4, &mut retired).unwrap();
        assert_eq!(
            stolen,
            Some(Stolen {
                slot,
                channel: 0,
                key: 60,
                state: VoiceState::Attacking,
            })
        );
        let zone = bank.presets()[0].zones()[0].clone();
        pool.start(slot, 0, 64, 100, 4, BankId(1), bank, &zone);

        let mut keys: Vec<u8> = pool.iter().map(Voice::key).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![61, 62, 63, 64]);
        assert_eq!(reclaimer.drain(), 1);
    }

    #[test]
    fn releasing_voices_are_stolen_before_held_ones() {
        let (mut retired, _reclaimer) = retirement(16);
        let mut pool = VoicePool::new(44_100.0, 3);
        play(&mut pool, &mut retired, 60, 100, 0);
        play(&mut pool, &mut retired, 61, 100, 1);
        play(&mut pool, &mut retired, 62, 100, 2);
        pool.release_key(0, 62);

        play(&mut pool, &mut retired, 63, 100, 3);

        let keys: Vec<u8> = pool.iter().map(Voice::key).collect();
        assert!(keys.contains(&60));
        assert!(!keys.contains(&62));
    }

    #[test]
    fn a_note_never_steals_its_own_layers() {
        let (mut retired, _reclaimer) = retirement(16);
        let mut pool = VoicePool::new(44_100.0, 1);
        play(&mut pool, &mut retired, 60, 100, 7);

        assert_eq!(pool.allocate(7, &mut retired), None);
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn bank_release_targets_only_that_bank() {
        let (mut retired, _reclaimer) = retirement(16);
        let mut pool = VoicePool::new(44_100.0, 4);
        play(&mut pool, &mut retired, 60, 100, 0);

        assert_eq!(pool.force_release_bank(BankId(2), 0.01), 0);
        assert_eq!(pool.force_release_bank(BankId(1), 0.01), 1);
        assert_eq!(pool.states()[0], VoiceState::Releasing);
    }
}
