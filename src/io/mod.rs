// Purpose - external event formats fed into the synth

pub mod midi;

pub use midi::MidiEvent;
