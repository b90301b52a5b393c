//! Audio I/O modules
//!
//! Audio decoding using Symphonia and sample-rate conversion using Rubato.

pub mod decoder;
pub mod resample;

pub use decoder::{decode_audio, DecodeOptions, DecodedAudio};
