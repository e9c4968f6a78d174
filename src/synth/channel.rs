//! Per-channel program binding and controller state.

use crate::bank::{BankId, InstrumentBank};

/// MIDI channel 10 (index 9) plays the percussion bank by convention.
pub const DRUM_CHANNEL: usize = 9;
pub const DRUM_BANK: u16 = 128;

pub mod cc {
    pub const BANK_SELECT: u8 = 0;
    pub const VOLUME: u8 = 7;
    pub const PAN: u8 = 10;
    pub const EXPRESSION: u8 = 11;
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const RESET_CONTROLLERS: u8 = 121;
    pub const ALL_NOTES_OFF: u8 = 123;
}

pub const PITCH_BEND_CENTRE: u16 = 8192;

/// How well a bank's preset answers a channel's wanted (bank, program).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchQuality {
    Nothing,
    /// The bank's first playable preset.
    AnyPreset,
    /// Same program under another bank number, lowest bank number first.
    SameProgram,
    Exact,
}

/// Which preset a channel plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Chosen by program select; loads never move it.
    Selected { bank_id: BankId, preset: usize },
    /// Chosen automatically from the loaded banks.
    Resolved {
        bank_id: BankId,
        preset: usize,
        quality: MatchQuality,
    },
    /// Notes on this channel are silent until it is reprogrammed.
    NoInstrument,
}

impl Binding {
    pub fn target(&self) -> Option<(BankId, usize)> {
        match *self {
            Binding::Selected { bank_id, preset } | Binding::Resolved { bank_id, preset, .. } => {
                Some((bank_id, preset))
            }
            Binding::NoInstrument => None,
        }
    }

    pub fn bank_id(&self) -> Option<BankId> {
        self.target().map(|(id, _)| id)
    }

    fn quality(&self) -> MatchQuality {
        match *self {
            Binding::Selected { .. } => MatchQuality::Exact,
            Binding::Resolved { quality, .. } => quality,
            Binding::NoInstrument => MatchQuality::Nothing,
        }
    }
}

/// Find the best preset for (bank_number, program) inside one bank.
pub fn match_in(bank: &InstrumentBank, bank_number: u16, program: u8) -> Option<(usize, MatchQuality)> {
    if let Some(i) = bank.preset_index(bank_number, program) {
        return Some((i, MatchQuality::Exact));
    }
    if let Some(i) = bank.program_fallback(program) {
        return Some((i, MatchQuality::SameProgram));
    }
    bank.first_playable().map(|i| (i, MatchQuality::AnyPreset))
}

/// Controller values that shape every voice on the channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelMix {
    pub gain: f32,
    pub pan: f32,
    pub bend_cents: f32,
}

#[derive(Debug, Clone)]
pub struct Channel {
    index: usize,
    bank_number: u16,
    program: u8,
    binding: Binding,
    controllers: [u8; 128],
    pitch_bend: u16,
    bend_range_semitones: f32,
}

impl Channel {
    pub fn new(index: usize) -> Self {
        let mut channel = Self {
            index,
            bank_number: if index == DRUM_CHANNEL { DRUM_BANK } else { 0 },
            program: 0,
            binding: Binding::NoInstrument,
            controllers: [0; 128],
            pitch_bend: PITCH_BEND_CENTRE,
            bend_range_semitones: 2.0,
        };
        channel.reset_controllers();
        channel
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bank_number(&self) -> u16 {
        self.bank_number
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn controller(&self, controller: u8) -> u8 {
        self.controllers[controller as usize & 0x7f]
    }

    pub fn pitch_bend(&self) -> u16 {
        self.pitch_bend
    }

    pub fn select(&mut self, bank_id: BankId, preset: usize, bank_number: u16, program: u8) {
        self.bank_number = bank_number;
        self.program = program;
        self.binding = Binding::Selected { bank_id, preset };
    }

    pub fn set_program(&mut self, program: u8) {
        self.program = program;
    }

    /// Adopt `candidate` from a newly loaded bank if it beats the current
    /// automatic binding. An exact match always wins; explicit selections
    /// are never replaced.
    pub fn offer(&mut self, bank_id: BankId, preset: usize, quality: MatchQuality) -> bool {
        if matches!(self.binding, Binding::Selected { .. }) || quality == MatchQuality::Nothing {
            return false;
        }
        if quality == MatchQuality::Exact || quality > self.binding.quality() {
            self.binding = Binding::Resolved {
                bank_id,
                preset,
                quality,
            };
            return true;
        }
        false
    }

    pub fn resolve_to(&mut self, found: Option<(BankId, usize, MatchQuality)>) {
        self.binding = match found {
            Some((bank_id, preset, quality)) => Binding::Resolved {
                bank_id,
                preset,
                quality,
            },
            None => Binding::NoInstrument,
        };
    }

    /// Store a controller value. Bank select only takes effect at the next
    /// program change.
    pub fn set_controller(&mut self, controller: u8, value: u8) {
        let controller = controller & 0x7f;
        let value = value & 0x7f;
        self.controllers[controller as usize] = value;
        if controller == cc::BANK_SELECT {
            self.bank_number = if self.index == DRUM_CHANNEL && value == 0 {
                DRUM_BANK
            } else {
                value as u16
            };
        }
    }

    pub fn set_pitch_bend(&mut self, value: u16) {
        self.pitch_bend = value.min(0x3fff);
    }

    pub fn reset_controllers(&mut self) {
        self.controllers[cc::VOLUME as usize] = 100;
        self.controllers[cc::PAN as usize] = 64;
        self.controllers[cc::EXPRESSION as usize] = 127;
        self.pitch_bend = PITCH_BEND_CENTRE;
    }

    pub fn mix(&self) -> ChannelMix {
        let volume = self.controllers[cc::VOLUME as usize] as f32 / 127.0;
        let expression = self.controllers[cc::EXPRESSION as usize] as f32 / 127.0;
        let pan = (self.controllers[cc::PAN as usize] as f32 - 64.0) / 63.0;
        let bend = (self.pitch_bend as f32 - PITCH_BEND_CENTRE as f32) / PITCH_BEND_CENTRE as f32;

        ChannelMix {
            gain: volume * volume * expression * expression,
            pan: pan.clamp(-1.0, 1.0),
            bend_cents: bend * self.bend_range_semitones * 100.0,
        }
    }
}
