//! Computer keyboard → MIDI key, laid out like two piano octaves.
//!
//!   w e   t y u   o p
//!  a s d f g h j k l ;

const LAYOUT: [(char, u8); 17] = [
    ('a', 0),
    ('w', 1),
    ('s', 2),
    ('e', 3),
    ('d', 4),
    ('f', 5),
    ('t', 6),
    ('g', 7),
    ('y', 8),
    ('h', 9),
    ('u', 10),
    ('j', 11),
    ('k', 12),
    ('o', 13),
    ('l', 14),
    ('p', 15),
    (';', 16),
];

const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// MIDI key for `c` in `octave` (C4 = 60), if `c` is mapped and in range.
pub fn key_for(c: char, octave: u8) -> Option<u8> {
    let (_, offset) = LAYOUT
        .iter()
        .find(|(k, _)| *k == c.to_ascii_lowercase())?;
    let key = (octave as u16 + 1) * 12 + *offset as u16;
    u8::try_from(key).ok().filter(|k| *k <= 127)
}

pub fn note_name(key: u8) -> String {
    format!("{}{}", NAMES[key as usize % 12], key as i32 / 12 - 1)
}
