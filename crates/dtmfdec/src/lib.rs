//! Block-based DTMF keypad tone decoding.
//!
//! Samples are windowed, run through a bank of Goertzel resonators tuned to
//! the eight keypad frequencies, and mapped to at most one key per block.

pub mod detect;
pub mod pcm;

pub use detect::dsp::{ToneEnergyBank, DTMF_FREQS, DTMF_KEYS, HIGH_GROUP_HZ, LOW_GROUP_HZ};
pub use detect::{ConfigError, Decoder, DecoderBuilder, KeyPress};
