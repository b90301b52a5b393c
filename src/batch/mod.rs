//! Batch processing
//!
//! - Audio file discovery below a music folder
//! - Parallel analysis with per-file timeouts
//! - Progress events and checkpoint files

pub mod progress;
pub mod runner;
pub mod scanner;

pub use progress::{Checkpoint, ProgressEvent};
pub use runner::{default_jobs, BatchError, BatchReport, BatchRunner};
pub use scanner::{find_audio_files, ScanError, ScanOptions};
