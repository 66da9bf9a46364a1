//! DTMF test signal synthesis.

mod keypad;
pub mod noise;
pub mod synth;

pub use keypad::tone_pair;
pub use synth::{mix_into, to_s16le, DtmfSynth, SynthError};
