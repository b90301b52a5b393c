//! Time signature detection for every audio file below a folder
//!
//! Usage:
//!   analyze_time_sigs [--jobs N] [--progress-json] [folder]
//!
//! Progress goes to stderr, the final JSON array to stdout. Partial results
//! are saved to the checkpoint file every 50 files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use trackprobe::batch::{find_audio_files, BatchRunner, Checkpoint, ScanOptions};
use trackprobe::{analyze_time_signature_file, AnalysisConfig, TimeSignatureReport};

#[derive(Parser)]
#[command(name = "analyze_time_sigs")]
#[command(version, about = "Detect the time signature (4/4, 3/4, 6/8) of a music folder")]
struct Cli {
    /// Folder to scan recursively
    #[arg(default_value = ".")]
    folder: PathBuf,

    /// Parallel workers (0 = CPU count - 1)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Per-file timeout in seconds (0 = none)
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Checkpoint file rewritten during the run
    #[arg(long, default_value = "time_sig_progress.json")]
    checkpoint: PathBuf,

    /// Files between checkpoint writes
    #[arg(long, default_value_t = 50)]
    checkpoint_every: usize,

    /// Print progress as JSON lines instead of text
    #[arg(long)]
    progress_json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let files = find_audio_files(&cli.folder, &ScanOptions::default())
        .with_context(|| format!("Cannot scan {}", cli.folder.display()))?;
    log::debug!("{} audio files below {}", files.len(), cli.folder.display());

    let config = AnalysisConfig::default();
    let timeout = (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout));
    let progress_json = cli.progress_json;

    let reports = BatchRunner::new()
        .jobs(cli.jobs)
        .timeout(timeout)
        .checkpoint(Checkpoint::new(&cli.checkpoint).every(cli.checkpoint_every))
        .run(
            &files,
            move |path: &Path| {
                let file = trackprobe::batch::progress::display_name(path);
                match analyze_time_signature_file(path, &config) {
                    Ok(estimate) => TimeSignatureReport::from_estimate(file, &estimate),
                    Err(e) => TimeSignatureReport::failure(file, e.to_string()),
                }
            },
            |event| {
                if progress_json {
                    match serde_json::to_string(event) {
                        Ok(line) => eprintln!("{}", line),
                        Err(e) => log::warn!("Cannot encode progress: {}", e),
                    }
                } else {
                    eprintln!("[{}] Analyzing: {}", event.current, event.file);
                }
            },
        )
        .context("Batch analysis failed")?;

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
