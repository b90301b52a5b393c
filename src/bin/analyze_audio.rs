//! Tempo and key analysis for one or more audio files
//!
//! Usage:
//!   analyze_audio <file>                 one JSON object on stdout
//!   analyze_audio [--jobs N] <file>...   one JSON line per file
//!
//! Analysis failures are reported in the JSON output, not via the exit code.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use trackprobe::batch::BatchRunner;
use trackprobe::{analyze_file, AnalysisConfig, FileReport, TrackReport};

#[derive(Parser)]
#[command(name = "analyze_audio")]
#[command(version, about = "Estimate BPM and musical key of audio files")]
struct Cli {
    /// Audio files to analyse
    files: Vec<PathBuf>,

    /// Parallel workers when several files are given (0 = CPU count - 1)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Per-file timeout in seconds when several files are given (0 = none)
    #[arg(long, default_value_t = 60)]
    timeout: u64,

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

fn report_for(path: &Path, config: &AnalysisConfig) -> TrackReport {
    match analyze_file(path, config) {
        Ok(result) => TrackReport::from(&result),
        Err(e) => {
            log::warn!("{}: {}", path.display(), e);
            TrackReport::failure(e.to_string())
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AnalysisConfig::default();

    match cli.files.as_slice() {
        [] => {
            println!("{}", serde_json::json!({ "error": "No audio file specified" }));
            Ok(ExitCode::FAILURE)
        }
        [file] => {
            let report = report_for(file, &config);
            println!("{}", serde_json::to_string(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        files => {
            let timeout = (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout));
            let reports = BatchRunner::new()
                .jobs(cli.jobs)
                .timeout(timeout)
                .run(
                    files,
                    move |path: &Path| FileReport {
                        file: path.display().to_string(),
                        report: report_for(path, &config),
                    },
                    |event| log::debug!("[{}/{}] {}", event.current, event.total, event.file),
                )
                .context("Batch analysis failed")?;

            for report in &reports {
                println!("{}", serde_json::to_string(report)?);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
