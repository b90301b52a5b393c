//! Beat-level analysis
//!
//! Meter detection from onset accents.

pub mod time_signature;

pub use time_signature::{
    detect_time_signature, MeterScores, TimeSignature, TimeSignatureEstimate, TimeSignatureReason,
};
