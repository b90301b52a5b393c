//! Audio preprocessing modules
//!
//! This module contains utilities for preparing audio for analysis:
//! - Channel mixing (interleaved to mono)
//! - Silence detection

pub mod channel_mixer;
pub mod silence;
