//! Progress events and checkpoint files

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Emitted when a file starts processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 1-based position of the file in start order
    pub current: usize,

    /// Number of files in the batch
    pub total: usize,

    /// `current / total` as a percentage
    pub percent: f32,

    /// File name (without directories)
    pub file: String,
}

impl ProgressEvent {
    /// Build an event for the `current`-th started file
    pub fn new(current: usize, total: usize, path: &Path) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            current as f32 * 100.0 / total as f32
        };
        Self {
            current,
            total,
            percent,
            file: display_name(path),
        }
    }
}

/// File name of a path, falling back to the full path
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Incremental result file rewritten every `every` completed files
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Destination file
    pub path: PathBuf,

    /// Completed files between writes (default: 50)
    pub every: usize,
}

impl Checkpoint {
    /// Checkpoint written every 50 files
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            every: 50,
        }
    }

    /// Change the write interval
    pub fn every(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }

    /// Whether a write is due after `completed` files
    pub fn is_due(&self, completed: usize) -> bool {
        completed > 0 && completed % self.every.max(1) == 0
    }

    /// Rewrite the checkpoint file with `{"analyzed": n, "results": [...]}`
    pub fn write<T: Serialize>(&self, results: &[T]) -> std::io::Result<()> {
        #[derive(Serialize)]
        struct Snapshot<'a, T> {
            analyzed: usize,
            results: &'a [T],
        }

        let json = serde_json::to_string_pretty(&Snapshot {
            analyzed: results.len(),
            results,
        })
        .map_err(std::io::Error::other)?;
        fs::write(&self.path, json)
    }
}
