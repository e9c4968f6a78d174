use std::sync::Arc;

use crate::{
    bank::{BankId, InstrumentBank, LoopMode, Zone},
    dsp::{
        envelope::{Envelope, EnvelopeStage},
        interpolate::SampleCursor,
        mix::{db_to_gain, pan_gains, sum_scaled_in_place, velocity_gain},
        Interpolation,
    },
    synth::channel::ChannelMix,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VoiceState {
    Free,       // Available for allocation
    Attacking,  // Envelope delay or attack
    Sustaining, // Key held, envelope past its attack
    Releasing,  // Key released, envelope falling
}

/// Reclamation priority. The smallest key is stolen first: releasing voices
/// before held ones, then the oldest note, the softest, the lowest slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StealKey {
    held: bool,
    serial: u64,
    velocity: u8,
    slot: usize,
}

/// One sounding zone: a sample cursor, its envelope, and the bank it reads.
pub struct Voice {
    state: VoiceState,
    channel: usize,
    key: u8,
    velocity: u8,
    serial: u64,

    bank_id: Option<BankId>,
    bank: Option<Arc<InstrumentBank>>,

    root_key: u8,
    tune_cents: f32,
    scale_tuning: f32,
    loop_mode: LoopMode,
    rate_ratio: f64,
    gain: f32,
    pan: f32,

    output_rate: f32,
    cursor: SampleCursor,
    envelope: Envelope,
}

impl Voice {
    pub fn new(output_rate: f32) -> Self {
        Self {
            state: VoiceState::Free,
            channel: 0,
            key: 0,
            velocity: 0,
            serial: 0,
            bank_id: None,
            bank: None,
            root_key: 60,
            tune_cents: 0.0,
            scale_tuning: 100.0,
            loop_mode: LoopMode::NoLoop,
            rate_ratio: 1.0,
            gain: 0.0,
            pan: 0.0,
            output_rate,
            cursor: SampleCursor::idle(),
            envelope: Envelope::new(output_rate),
        }
    }

    /// Start playing `zone` from `bank`. Must only be called on a free voice.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        channel: usize,
        key: u8,
        velocity: u8,
        serial: u64,
        bank_id: BankId,
        bank: Arc<InstrumentBank>,
        zone: &Zone,
    ) {
        debug_assert!(self.is_free());

        self.channel = channel;
        self.key = key;
        self.velocity = velocity;
        self.serial = serial;

        self.root_key = zone.root_key;
        self.tune_cents = zone.tune_cents;
        self.scale_tuning = zone.scale_tuning;
        self.loop_mode = zone.loop_mode;
        self.rate_ratio = zone.sample.sample_rate as f64 / self.output_rate as f64;
        self.gain = velocity_gain(velocity) * db_to_gain(zone.attenuation_db);
        self.pan = zone.pan;

        self.cursor = SampleCursor::new(zone.sample.start..zone.sample.end, zone.loop_range());
        self.envelope.note_on(zone.envelope);

        self.bank_id = Some(bank_id);
        self.bank = Some(bank);
        self.state = VoiceState::Attacking;
    }

    /// Key released: enter the envelope's release stage.
    pub fn release(&mut self) {
        if !self.is_held() {
            return;
        }
        self.envelope.note_off();
        if self.loop_mode == LoopMode::UntilRelease {
            self.cursor.stop_looping();
        }
        self.state = VoiceState::Releasing;
    }

    /// Release within `seconds`, whatever the zone's release time.
    pub fn force_release(&mut self, seconds: f32) {
        if self.is_free() {
            return;
        }
        self.envelope.force_release(seconds);
        if self.loop_mode == LoopMode::UntilRelease {
            self.cursor.stop_looping();
        }
        self.state = VoiceState::Releasing;
    }

    /// Add this voice's output into the stereo bus. Returns `true` once the
    /// voice has nothing left to play.
    pub fn render(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        scratch: &mut [f32],
        mix: ChannelMix,
        interpolation: Interpolation,
    ) -> bool {
        let Some(bank) = self.bank.as_deref() else {
            return true;
        };
        let data = bank.samples();

        let cents = (self.key as f32 - self.root_key as f32) * self.scale_tuning
            + self.tune_cents
            + mix.bend_cents;
        let step = (cents as f64 / 1200.0).exp2() * self.rate_ratio;

        for out in scratch.iter_mut() {
            let level = self.envelope.next_sample();
            *out = self.cursor.read(data, interpolation) * level;
            self.cursor.advance(step);
        }

        let amp = self.gain * mix.gain;
        let (pan_l, pan_r) = pan_gains(self.pan + mix.pan);
        sum_scaled_in_place(left, scratch, amp * pan_l);
        sum_scaled_in_place(right, scratch, amp * pan_r);

        if self.state == VoiceState::Attacking
            && !matches!(
                self.envelope.stage(),
                EnvelopeStage::Delay | EnvelopeStage::Attack
            )
        {
            self.state = VoiceState::Sustaining;
        }

        !self.envelope.is_active() || self.cursor.is_finished()
    }

    /// Return to the free list, handing back the bank reference.
    #[must_use]
    pub fn free(&mut self) -> Option<Arc<InstrumentBank>> {
        self.state = VoiceState::Free;
        self.envelope.reset();
        self.cursor = SampleCursor::idle();
        self.bank_id = None;
        self.key = 0;
        self.velocity = 0;
        self.bank.take()
    }

    pub fn steal_key(&self, slot: usize) -> StealKey {
        StealKey {
            held: self.is_held(),
            serial: self.serial,
            velocity: self.velocity,
            slot,
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_held(&self) -> bool {
        matches!(self.state, VoiceState::Attacking | VoiceState::Sustaining)
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn bank_id(&self) -> Option<BankId> {
        self.bank_id
    }

    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }
}
