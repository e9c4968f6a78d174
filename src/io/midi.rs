/// A channel voice message, already split into its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// 14-bit value, 8192 = centre.
    PitchBend { channel: u8, value: u16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    /// Decode one channel voice message. Running status, system messages and
    /// the messages the synth does not act on (aftertouch) yield `None`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if status & 0x80 == 0 {
            return None;
        }
        let channel = status & 0x0f;
        let d0 = data.first().map(|b| b & 0x7f);
        let d1 = data.get(1).map(|b| b & 0x7f);

        match status & 0xf0 {
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: d0?,
                velocity: d1?,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                key: d0?,
                velocity: d1?,
            }),
            0xb0 => Some(MidiEvent::ControlChange {
                channel,
                controller: d0?,
                value: d1?,
            }),
            0xc0 => Some(MidiEvent::ProgramChange {
                channel,
                program: d0?,
            }),
            0xe0 => Some(MidiEvent::PitchBend {
                channel,
                value: (d1? as u16) << 7 | d0? as u16,
            }),
            _ => None,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }
}
