//! Audio file discovery
//!
//! Recursive walk of a music folder collecting files with a known audio
//! extension. System entries such as `.DS_Store`, `Thumbs.db` and `.git` are
//! skipped along with everything below them.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Extensions analysed by default (compared case-insensitively)
pub const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "flac", "m4a", "ogg", "wma"];

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Scanner options
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Accepted extensions without the dot, lowercase
    pub extensions: Vec<String>,

    /// Entry names that are skipped (with their subtrees)
    pub ignore_names: Vec<String>,

    /// Maximum directory depth below the root (default: unlimited)
    pub max_depth: Option<usize>,

    /// Follow symbolic links (default: false)
    pub follow_links: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore_names: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
            ],
            max_depth: None,
            follow_links: false,
        }
    }
}

impl ScanOptions {
    /// Whether a path carries one of the accepted extensions
    pub fn is_audio_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|accepted| *accepted == ext)
            })
            .unwrap_or(false)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.ignore_names.iter().any(|ignored| name == ignored.as_str())
    }
}

/// Find audio files below `root`
///
/// # Returns
///
/// Matching file paths sorted by path
///
/// # Errors
///
/// Returns `ScanError::PathNotFound` for a missing root and
/// `ScanError::NotADirectory` when the root is a file. Unreadable entries
/// below the root are logged and skipped.
pub fn find_audio_files(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError> {
    if !root.exists() {
        return Err(ScanError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .max_depth(options.max_depth.unwrap_or(usize::MAX))
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !options.is_ignored(e));

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && options.is_audio_path(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                log::warn!("Error accessing entry: {}", e);
            }
        }
    }

    files.sort();

    log::debug!(
        "Found {} audio files under {}",
        files.len(),
        root.display()
    );

    Ok(files)
}
