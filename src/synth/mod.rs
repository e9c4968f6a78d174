// Purpose: the engine aggregate. Channels, voice pool and bank table live
// behind one short-hold lock shared by the control thread and the renderer.

pub mod banks;
pub mod channel;
pub mod config;
pub mod mono;
pub mod pool;
pub mod voice;

use std::{path::Path, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

pub use channel::{Binding, MatchQuality};
pub use config::SynthConfig;
pub use mono::MonoNotes;
pub use voice::VoiceState;

use crate::{
    bank::{default_loader, BankId, BankLoader, InstrumentBank, PresetInfo},
    dsp::{mix::to_i16, Interpolation},
    error::{Result, SynthError},
    io::MidiEvent,
    settings::Settings,
    MAX_BLOCK_SIZE,
};

use self::{
    banks::{retirement, BankTable, Reclaimer, Retired},
    channel::{cc, match_in, Channel},
    pool::{Stolen, VoicePool},
};

/// Release time applied when voices are cut by unload or all-sounds-off.
pub const FORCED_RELEASE: f32 = 0.01;

/// What a note-on did to the pool, logged once the engine lock is released.
#[derive(Debug, Default)]
pub(crate) struct NoteReport {
    stolen: Vec<Stolen>,
    dropped_layers: usize,
}

/// A channel whose binding moved as the bank table changed.
type Rebind = (usize, Option<(BankId, usize, MatchQuality)>);

/// Everything the renderer touches.
pub(crate) struct SynthState {
    channels: Vec<Channel>,
    pool: VoicePool,
    banks: BankTable,
    retired: Retired,
    next_serial: u64,

    gain: f32,
    interpolation: Interpolation,

    left: Vec<f32>,
    right: Vec<f32>,
    scratch: Vec<f32>,
}

pub(crate) struct Shared {
    config: SynthConfig,
    state: Mutex<SynthState>,
}

impl Shared {
    /// Render `out.len() / 2` interleaved stereo frames.
    pub(crate) fn write_interleaved(&self, out: &mut [i16]) {
        let frames = out.len() / 2;
        self.state.lock().render(frames, |i, l, r| {
            out[2 * i] = l;
            out[2 * i + 1] = r;
        });
    }
}

/// A soundfont-driven polyphonic synthesizer.
///
/// Every method takes `&self`: control calls and rendering may run on
/// different threads. Control calls hold the engine lock for work bounded by
/// channel count and polyphony; file parsing and bank deallocation happen
/// outside it.
pub struct Synth {
    shared: Arc<Shared>,
    loader: Box<dyn BankLoader>,
    reclaimer: Mutex<Reclaimer>,
}

impl Synth {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_loader(settings, default_loader())
    }

    pub fn with_loader(settings: &Settings, loader: Box<dyn BankLoader>) -> Result<Self> {
        let config = SynthConfig::from_settings(settings)?;

        // Every voice and every table slot can hold one bank reference.
        let (retired, reclaimer) = retirement(2 * config.polyphony + config.max_banks);

        let state = SynthState {
            channels: (0..config.channels).map(Channel::new).collect(),
            pool: VoicePool::new(config.sample_rate, config.polyphony),
            banks: BankTable::new(config.max_banks),
            retired,
            next_serial: 0,
            gain: config.gain,
            interpolation: config.interpolation,
            left: vec![0.0; MAX_BLOCK_SIZE],
            right: vec![0.0; MAX_BLOCK_SIZE],
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        };

        debug!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            polyphony = config.polyphony,
            gain = config.gain,
            "synth created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
            }),
            loader,
            reclaimer: Mutex::new(reclaimer),
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.shared.config
    }

    pub(crate) fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    // ---------------------------------------------------------------- banks

    /// Parse `path` with the synth's loader and publish the result.
    pub fn load(&self, path: impl AsRef<Path>, update_presets: bool) -> Result<BankId> {
        let path = path.as_ref();
        let bank = self.loader.load(path)?;
        let id = self.add_bank(bank, update_presets)?;
        info!(bank_id = %id, path = %path.display(), "loaded soundfont");
        Ok(id)
    }

    /// Publish an already built bank under a fresh id.
    pub fn add_bank(&self, bank: InstrumentBank, update_presets: bool) -> Result<BankId> {
        let bank = Arc::new(bank);
        let (id, rebound) = self.with_state(|s| s.add_bank(&bank, update_presets))?;
        for (channel, found) in rebound {
            debug!(channel, ?found, "channel rebound to new bank");
        }
        info!(
            bank_id = %id,
            name = bank.name(),
            presets = bank.presets().len(),
            bytes = bank.memory_size(),
            "bank added"
        );
        Ok(id)
    }

    /// Remove a bank. Voices still reading it are faded out quickly and the
    /// bank's memory is reclaimed after the last of them finishes.
    pub fn unload(&self, bank_id: BankId, update_presets: bool) -> Result<()> {
        let (bank, releasing, rebound) =
            self.with_state(|s| s.unload(bank_id, update_presets))?;
        for (channel, found) in rebound {
            debug!(channel, ?found, "channel fell back");
        }
        info!(bank_id = %bank_id, name = bank.name(), releasing, "bank unloaded");
        drop(bank);
        Ok(())
    }

    pub fn bank_ids(&self) -> Vec<BankId> {
        self.shared.state.lock().banks.ids()
    }

    pub fn bank(&self, bank_id: BankId) -> Result<Arc<InstrumentBank>> {
        self.shared
            .state
            .lock()
            .banks
            .get(bank_id)
            .cloned()
            .ok_or(SynthError::UnknownBank(bank_id))
    }

    pub fn presets(&self, bank_id: BankId) -> Result<Vec<PresetInfo>> {
        Ok(self.bank(bank_id)?.preset_infos())
    }

    // ------------------------------------------------------------- programs

    /// Bind `channel` to a preset of one specific bank.
    pub fn program_select(
        &self,
        channel: usize,
        bank_id: BankId,
        bank_number: u16,
        program: u8,
    ) -> Result<()> {
        self.check_channel(channel)?;
        self.with_state(|s| -> Result<()> {
            let bank = s.banks.get(bank_id).ok_or(SynthError::UnknownBank(bank_id))?;
            let preset = bank
                .preset_index(bank_number, program)
                .ok_or(SynthError::NoSuchPreset {
                    bank_id,
                    bank_number,
                    program,
                })?;
            s.channels[channel].select(bank_id, preset, bank_number, program);
            Ok(())
        })?;
        debug!(channel, bank_id = %bank_id, bank_number, program, "program selected");
        Ok(())
    }

    /// Switch `channel` to `program` within its current bank number,
    /// searching every loaded bank.
    pub fn program_change(&self, channel: usize, program: u8) -> Result<()> {
        self.check_channel(channel)?;
        let program = program & 0x7f;
        if let Some(found) = self.with_state(|s| s.program_change(channel, program)) {
            debug!(channel, program, ?found, "program resolved");
        }
        Ok(())
    }

    pub fn channel_binding(&self, channel: usize) -> Result<Binding> {
        self.check_channel(channel)?;
        Ok(self.shared.state.lock().channels[channel].binding())
    }

    /// The preset `channel` currently plays, if any.
    pub fn channel_preset(&self, channel: usize) -> Result<Option<PresetInfo>> {
        self.check_channel(channel)?;
        let target = {
            let state = self.shared.state.lock();
            state.channels[channel]
                .binding()
                .target()
                .and_then(|(id, preset)| state.banks.get(id).cloned().map(|b| (b, preset)))
        };
        Ok(target.and_then(|(bank, preset)| bank.presets().get(preset).map(|p| p.info())))
    }

    // ---------------------------------------------------------------- notes

    pub fn note_on(&self, channel: usize, key: u8, velocity: u8) -> Result<()> {
        self.check_channel(channel)?;
        check_key(key)?;
        if !(1..=127).contains(&velocity) {
            return Err(SynthError::InvalidVelocity(velocity));
        }
        let report = self.with_state(|s| s.note_on(channel, key, velocity));
        for stolen in &report.stolen {
            debug!(
                slot = stolen.slot,
                channel = stolen.channel,
                key = stolen.key,
                state = ?stolen.state,
                "stole voice"
            );
        }
        if report.dropped_layers > 0 {
            warn!(
                channel,
                key,
                dropped = report.dropped_layers,
                polyphony = self.shared.config.polyphony,
                "not enough voices for every layer"
            );
        }
        Ok(())
    }

    /// Release every held voice on (`channel`, `key`). Releasing a key that
    /// is not sounding is not an error.
    pub fn note_off(&self, channel: usize, key: u8) -> Result<()> {
        self.check_channel(channel)?;
        check_key(key)?;
        self.with_state(|s| s.pool.release_key(channel, key));
        Ok(())
    }

    /// Release held voices on one channel, or on all of them.
    pub fn all_notes_off(&self, channel: Option<usize>) -> Result<()> {
        if let Some(channel) = channel {
            self.check_channel(channel)?;
        }
        self.with_state(|s| s.pool.release_channel(channel));
        Ok(())
    }

    /// Fade out every sounding voice on one channel, or on all of them.
    pub fn all_sounds_off(&self, channel: Option<usize>) -> Result<()> {
        if let Some(channel) = channel {
            self.check_channel(channel)?;
        }
        self.with_state(|s| s.pool.force_release_channel(channel, FORCED_RELEASE));
        Ok(())
    }

    pub fn control_change(&self, channel: usize, controller: u8, value: u8) -> Result<()> {
        self.check_channel(channel)?;
        self.with_state(|s| match controller {
            cc::ALL_SOUND_OFF => s.pool.force_release_channel(Some(channel), FORCED_RELEASE),
            cc::ALL_NOTES_OFF => s.pool.release_channel(Some(channel)),
            cc::RESET_CONTROLLERS => s.channels[channel].reset_controllers(),
            _ => s.channels[channel].set_controller(controller, value),
        });
        Ok(())
    }

    pub fn pitch_bend(&self, channel: usize, value: u16) -> Result<()> {
        self.check_channel(channel)?;
        self.with_state(|s| s.channels[channel].set_pitch_bend(value));
        Ok(())
    }

    pub fn process_midi(&self, event: MidiEvent) -> Result<()> {
        match event {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } => self.note_on(channel as usize, key, velocity),
            MidiEvent::NoteOff { channel, key, .. } => self.note_off(channel as usize, key),
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => self.control_change(channel as usize, controller, value),
            MidiEvent::PitchBend { channel, value } => self.pitch_bend(channel as usize, value),
            MidiEvent::ProgramChange { channel, program } => {
                self.program_change(channel as usize, program)
            }
        }
    }

    // ------------------------------------------------------------ rendering

    /// Render `frames` frames into two 16-bit buffers. Frame `i` goes to
    /// `left[left_offset + i * left_stride]` and
    /// `right[right_offset + i * right_stride]`.
    ///
    /// # Panics
    ///
    /// If an offset/stride pair would index past its buffer.
    #[allow(clippy::too_many_arguments)]
    pub fn write_s16(
        &self,
        frames: usize,
        left: &mut [i16],
        left_offset: usize,
        left_stride: usize,
        right: &mut [i16],
        right_offset: usize,
        right_stride: usize,
    ) {
        if frames == 0 {
            return;
        }
        assert!(
            left_offset + (frames - 1) * left_stride < left.len(),
            "left buffer too small for {frames} frames"
        );
        assert!(
            right_offset + (frames - 1) * right_stride < right.len(),
            "right buffer too small for {frames} frames"
        );

        self.shared.state.lock().render(frames, |i, l, r| {
            left[left_offset + i * left_stride] = l;
            right[right_offset + i * right_stride] = r;
        });
    }

    /// Render `out.len() / 2` frames, left on even and right on odd indices.
    pub fn write_s16_interleaved(&self, out: &mut [i16]) {
        self.shared.write_interleaved(out);
    }

    /// Render `frames` interleaved frames into a new buffer. Allocates, so it
    /// is meant for offline use rather than an audio callback.
    pub fn render_s16_vec(&self, frames: usize) -> Vec<i16> {
        let mut out = vec![0; frames * 2];
        self.shared.write_interleaved(&mut out);
        self.reclaim();
        out
    }

    // ---------------------------------------------------------- observation

    pub fn active_voice_count(&self) -> usize {
        self.shared.state.lock().pool.active_count()
    }

    pub fn voice_states(&self) -> Vec<VoiceState> {
        self.shared.state.lock().pool.states()
    }

    /// (channel, key) of every sounding voice, in slot order.
    pub fn active_notes(&self) -> Vec<(usize, u8)> {
        self.shared
            .state
            .lock()
            .pool
            .iter()
            .filter(|v| !v.is_free())
            .map(|v| (v.channel(), v.key()))
            .collect()
    }

    // ------------------------------------------------------------- internal

    fn check_channel(&self, channel: usize) -> Result<()> {
        let count = self.shared.config.channels;
        if channel >= count {
            return Err(SynthError::InvalidChannel { channel, count });
        }
        Ok(())
    }

    /// Run `f` under the engine lock, then drop any bank references the
    /// renderer has retired since the last call.
    fn with_state<R>(&self, f: impl FnOnce(&mut SynthState) -> R) -> R {
        let result = f(&mut self.shared.state.lock());
        self.reclaim();
        result
    }

    fn reclaim(&self) {
        let dropped = self.reclaimer.lock().drain();
        if dropped > 0 {
            debug!(dropped, "reclaimed bank references");
        }
    }
}

impl Drop for Synth {
    fn drop(&mut self) {
        self.reclaim();
    }
}

impl std::fmt::Debug for Synth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synth")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

fn check_key(key: u8) -> Result<()> {
    if key > 127 {
        return Err(SynthError::InvalidKey(key));
    }
    Ok(())
}

/// Best preset for (bank_number, program) across `banks`, newest bank first.
fn best_match(
    banks: &BankTable,
    bank_number: u16,
    program: u8,
) -> Option<(BankId, usize, MatchQuality)> {
    let mut best: Option<(BankId, usize, MatchQuality)> = None;
    for (id, bank) in banks.newest_first() {
        if let Some((preset, quality)) = match_in(bank, bank_number, program) {
            if best.map_or(true, |(_, _, q)| quality > q) {
                best = Some((id, preset, quality));
            }
            if quality == MatchQuality::Exact {
                break;
            }
        }
    }
    best
}

impl SynthState {
    fn add_bank(
        &mut self,
        bank: &Arc<InstrumentBank>,
        update_presets: bool,
    ) -> Result<(BankId, Vec<Rebind>)> {
        let id = self.banks.insert(Arc::clone(bank))?;
        let mut rebound = Vec::new();
        if !update_presets {
            return Ok((id, rebound));
        }

        for channel in &mut self.channels {
            let Some((preset, quality)) = match_in(bank, channel.bank_number(), channel.program())
            else {
                continue;
            };
            if channel.offer(id, preset, quality) {
                rebound.push((channel.index(), Some((id, preset, quality))));
            }
        }
        Ok((id, rebound))
    }

    fn unload(
        &mut self,
        bank_id: BankId,
        update_presets: bool,
    ) -> Result<(Arc<InstrumentBank>, usize, Vec<Rebind>)> {
        let bank = self
            .banks
            .remove(bank_id)
            .ok_or(SynthError::UnknownBank(bank_id))?;
        let releasing = self.pool.force_release_bank(bank_id, FORCED_RELEASE);
        let mut rebound = Vec::new();

        for channel in self
            .channels
            .iter_mut()
            .filter(|c| c.binding().bank_id() == Some(bank_id))
        {
            let found = if update_presets {
                best_match(&self.banks, channel.bank_number(), channel.program())
            } else {
                None
            };
            channel.resolve_to(found);
            rebound.push((channel.index(), found));
        }
        Ok((bank, releasing, rebound))
    }

    /// Returns the search result when the binding had to be re-resolved.
    fn program_change(
        &mut self,
        channel: usize,
        program: u8,
    ) -> Option<Option<(BankId, usize, MatchQuality)>> {
        let ch = &mut self.channels[channel];
        ch.set_program(program);

        if let Binding::Selected { bank_id, .. } = ch.binding() {
            if let Some(preset) = self
                .banks
                .get(bank_id)
                .and_then(|b| b.preset_index(ch.bank_number(), program))
            {
                ch.select(bank_id, preset, ch.bank_number(), program);
                return None;
            }
        }

        let found = best_match(&self.banks, ch.bank_number(), program);
        ch.resolve_to(found);
        Some(found)
    }

    fn note_on(&mut self, channel: usize, key: u8, velocity: u8) -> NoteReport {
        let mut report = NoteReport::default();
        let Some((bank_id, preset)) = self.channels[channel].binding().target() else {
            return report;
        };
        let Some(bank) = self.banks.get(bank_id).cloned() else {
            return report;
        };
        let Some(preset) = bank.presets().get(preset) else {
            return report;
        };

        let serial = self.next_serial;
        self.next_serial += 1;

        let layers = preset.matching(key, velocity).count();
        for (started, zone) in preset.matching(key, velocity).enumerate() {
            let Some((slot, stolen)) = self.pool.allocate(serial, &mut self.retired) else {
                report.dropped_layers = layers - started;
                break;
            };
            report.stolen.extend(stolen);
            self.pool.start(
                slot,
                channel,
                key,
                velocity,
                serial,
                bank_id,
                Arc::clone(&bank),
                zone,
            );
        }
        report
    }

    /// Mix `frames` frames and hand each one to `sink` as (index, left, right).
    fn render(&mut self, frames: usize, mut sink: impl FnMut(usize, i16, i16)) {
        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(MAX_BLOCK_SIZE);
            let left = &mut self.left[..n];
            let right = &mut self.right[..n];
            left.fill(0.0);
            right.fill(0.0);

            self.pool.render(
                left,
                right,
                &mut self.scratch,
                &self.channels,
                self.interpolation,
                &mut self.retired,
            );

            for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
                sink(done + i, to_i16(l * self.gain), to_i16(r * self.gain));
            }
            done += n;
        }
    }
}
