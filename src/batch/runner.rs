//! Parallel batch analysis with per-file timeouts
//!
//! Files are distributed over a rayon pool. Each file is analysed on its own
//! worker thread so that a decoder stuck on a damaged file can be abandoned
//! once the timeout expires; the pool thread moves on with an error entry.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::progress::{display_name, Checkpoint, ProgressEvent};
use crate::analysis::result::{FileReport, TimeSignatureReport, TrackReport};

/// Default per-file timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of abandoned workers tolerated before files are skipped
pub const DEFAULT_MAX_STALLED: usize = 8;

/// Error entry for files skipped because too many workers are stuck
pub const STALLED_SKIP: &str = "skipped_stalled_workers";

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

/// Error entry for a file that exceeded `limit`
///
/// Whole seconds print as `timeout_60s`, anything else in milliseconds
/// (`timeout_250ms`).
pub fn timeout_label(limit: Duration) -> String {
    if limit.subsec_nanos() == 0 && limit.as_secs() > 0 {
        format!("timeout_{}s", limit.as_secs())
    } else {
        format!("timeout_{}ms", limit.as_millis())
    }
}

/// Whether an error entry means the file was never fully analysed
///
/// Timeouts and skips say nothing about the file itself.
pub fn is_interrupted(error: &str) -> bool {
    error.starts_with("timeout_") || error == STALLED_SKIP
}

/// Batch runner errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// Worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A per-file report the runner can produce on its own for failures
pub trait BatchReport: Serialize + Send + 'static {
    /// Error entry for `path` (timeouts, crashed workers)
    fn from_error(path: &Path, error: String) -> Self;

    /// Whether this entry describes a failure
    fn is_error(&self) -> bool;
}

impl BatchReport for TimeSignatureReport {
    fn from_error(path: &Path, error: String) -> Self {
        TimeSignatureReport::failure(display_name(path), error)
    }

    fn is_error(&self) -> bool {
        TimeSignatureReport::is_error(self)
    }
}

impl BatchReport for FileReport<TrackReport> {
    fn from_error(path: &Path, error: String) -> Self {
        FileReport {
            file: path.display().to_string(),
            report: TrackReport::failure(error),
        }
    }

    fn is_error(&self) -> bool {
        self.report.is_error()
    }
}

/// Number of workers used when none is requested: all cores but one
pub fn default_jobs() -> usize {
    thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Batch runner configuration
#[derive(Debug, Clone)]
pub struct BatchRunner {
    /// Parallel workers (default: CPU count − 1, at least 1)
    pub jobs: usize,

    /// Per-file timeout; `None` waits indefinitely (default: 60 s)
    pub timeout: Option<Duration>,

    /// Incremental result file
    pub checkpoint: Option<Checkpoint>,

    /// Timed out workers that may still be running before the remaining
    /// files are skipped (default: 8)
    pub max_stalled: usize,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout: Some(DEFAULT_TIMEOUT),
            checkpoint: None,
            max_stalled: DEFAULT_MAX_STALLED,
        }
    }
}

impl BatchRunner {
    /// Runner with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers (0 selects the default)
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = if jobs == 0 { default_jobs() } else { jobs };
        self
    }

    /// Set the per-file timeout
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable checkpoint writes
    pub fn checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Limit the number of abandoned workers (at least 1)
    pub fn max_stalled(mut self, max_stalled: usize) -> Self {
        self.max_stalled = max_stalled.max(1);
        self
    }

    /// Analyse every file
    ///
    /// # Arguments
    ///
    /// * `files` - Files to analyse
    /// * `analyze` - Per-file analysis; runs on a dedicated thread
    /// * `on_progress` - Called when a file starts
    ///
    /// # Returns
    ///
    /// One report per file, in the order of `files`. Timed out files yield
    /// [`timeout_label`] errors and crashed workers `worker_panicked`. Once
    /// `max_stalled` timed out workers are still running, further files are
    /// not started and get a [`STALLED_SKIP`] entry.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::ThreadPool` if the pool cannot be created.
    pub fn run<R, F, P>(
        &self,
        files: &[PathBuf],
        analyze: F,
        on_progress: P,
    ) -> Result<Vec<R>, BatchError>
    where
        R: BatchReport,
        F: Fn(&Path) -> R + Send + Sync + 'static,
        P: Fn(&ProgressEvent) + Send + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs.max(1))
            .build()?;

        let total = files.len();
        let analyze = Arc::new(analyze);
        let started = AtomicUsize::new(0);
        let stalled = Arc::new(AtomicUsize::new(0));
        let completed: Mutex<Vec<serde_json::Value>> = Mutex::new(Vec::new());

        log::debug!(
            "Batch of {} files on {} workers (timeout: {:?})",
            total,
            self.jobs,
            self.timeout
        );

        let reports = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let current = started.fetch_add(1, Ordering::SeqCst) + 1;
                    on_progress(&ProgressEvent::new(current, total, path));

                    let report = self.run_one(path, Arc::clone(&analyze), &stalled);
                    self.record(&completed, &report);
                    report
                })
                .collect::<Vec<R>>()
        });

        let failures = reports.iter().filter(|r| r.is_error()).count();
        log::debug!("Batch finished: {} files, {} failures", total, failures);

        Ok(reports)
    }

    fn run_one<R, F>(&self, path: &Path, analyze: Arc<F>, stalled: &Arc<AtomicUsize>) -> R
    where
        R: BatchReport,
        F: Fn(&Path) -> R + Send + Sync + 'static,
    {
        let stuck = stalled.load(Ordering::SeqCst);
        if stuck >= self.max_stalled {
            log::warn!(
                "{}: skipped, {} timed out workers still running",
                path.display(),
                stuck
            );
            return R::from_error(path, STALLED_SKIP.to_string());
        }

        let (tx, rx) = mpsc::channel();
        let owned = path.to_path_buf();
        let state = Arc::new(AtomicU8::new(RUNNING));
        let worker_state = Arc::clone(&state);
        let worker_stalled = Arc::clone(stalled);
        let spawned = thread::Builder::new()
            .name("trackprobe-file".to_string())
            .spawn(move || {
                let report = analyze(&owned);
                // The receiver is gone when the file already timed out
                let _ = tx.send(report);
                if worker_state
                    .compare_exchange(RUNNING, FINISHED, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    worker_stalled.fetch_sub(1, Ordering::SeqCst);
                }
            });

        if let Err(e) = spawned {
            log::warn!("Could not start worker for {}: {}", path.display(), e);
            return R::from_error(path, e.to_string());
        }

        let received = match self.timeout {
            Some(limit) => match rx.recv_timeout(limit) {
                Ok(report) => Ok(report),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    let abandoned = state
                        .compare_exchange(RUNNING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok();
                    if abandoned {
                        stalled.fetch_add(1, Ordering::SeqCst);
                        Err(timeout_label(limit))
                    } else {
                        // Finished between the timeout and the state change
                        rx.recv().map_err(|_| "worker_panicked".to_string())
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => Err("worker_panicked".to_string()),
            },
            None => rx.recv().map_err(|_| "worker_panicked".to_string()),
        };

        received.unwrap_or_else(|error| {
            log::warn!("{}: {}", path.display(), error);
            R::from_error(path, error)
        })
    }

    fn record<R: BatchReport>(&self, completed: &Mutex<Vec<serde_json::Value>>, report: &R) {
        let Some(checkpoint) = &self.checkpoint else {
            return;
        };

        let value = match serde_json::to_value(report) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Could not serialize report for checkpoint: {}", e);
                return;
            }
        };

        let mut done = match completed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        done.push(value);

        if checkpoint.is_due(done.len()) {
            if let Err(e) = checkpoint.write(done.as_slice()) {
                log::warn!(
                    "Failed to write checkpoint {}: {}",
                    checkpoint.path.display(),
                    e
                );
            }
        }
    }
}
