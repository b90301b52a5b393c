//! Maintenance of the music player's library database
//!
//! Every subcommand prints one JSON document on stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use trackprobe::batch::BatchRunner;
use trackprobe::library::{parse_column_value, Library};
use trackprobe::{analyze_file, AnalysisConfig, TrackReport};

#[derive(Parser)]
#[command(name = "library_tool")]
#[command(version, about = "Migrate, inspect and update the player library database")]
struct Cli {
    /// Path to the library database
    #[arg(long, env = "TRACKPROBE_DB")]
    db: PathBuf,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create missing tables and columns and run data migrations
    Migrate,

    /// Show table sizes and analysis progress
    Inspect,

    /// List tracks that have not been analysed
    Pending {
        /// Maximum number of tracks
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Analyse pending tracks and store BPM and key
    Analyze {
        /// Parallel workers (0 = CPU count - 1)
        #[arg(short, long, default_value_t = 0)]
        jobs: usize,

        /// Maximum number of tracks
        #[arg(long)]
        limit: Option<usize>,

        /// Per-file timeout in seconds (0 = none)
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Set one column of a track
    Set {
        /// File path of the track row
        #[arg(long)]
        file: String,

        /// Column of the tracks table
        #[arg(long)]
        column: String,

        /// New value ("null", a number or text)
        #[arg(long)]
        value: String,
    },

    /// Apply band name exceptions to track artists
    FixBands,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn analyze_pending(
    library: &Library,
    jobs: usize,
    limit: Option<usize>,
    timeout: u64,
) -> Result<serde_json::Value> {
    let pending = library.pending_tracks(limit)?;
    let files: Vec<PathBuf> = pending.iter().map(|t| PathBuf::from(&t.file_path)).collect();

    let config = AnalysisConfig::default();
    let reports = BatchRunner::new()
        .jobs(jobs)
        .timeout((timeout > 0).then(|| Duration::from_secs(timeout)))
        .run(
            &files,
            move |path: &Path| trackprobe::FileReport {
                file: path.display().to_string(),
                report: match analyze_file(path, &config) {
                    Ok(result) => TrackReport::from(&result),
                    Err(e) => TrackReport::failure(e.to_string()),
                },
            },
            |event| log::debug!("[{}/{}] {}", event.current, event.total, event.file),
        )
        .context("Batch analysis failed")?;

    let mut analyzed = 0;
    let mut failed = 0;
    for (track, report) in pending.iter().zip(&reports) {
        library
            .record_report(&track.file_path, &report.report)
            .with_context(|| format!("Cannot update track {}", track.id))?;
        if report.report.is_error() {
            failed += 1;
        } else {
            analyzed += 1;
        }
    }

    Ok(json!({ "analyzed": analyzed, "failed": failed, "results": reports }))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut library = Library::open(&cli.db)
        .with_context(|| format!("Cannot open library {}", cli.db.display()))?;
    // Inspection reads the database as it is
    if let Command::Inspect = cli.command {
        println!("{}", serde_json::to_string_pretty(&library.inspect()?)?);
        return Ok(());
    }

    let migration = library.ensure_schema().context("Schema migration failed")?;

    let output = match cli.command {
        Command::Migrate => serde_json::to_value(&migration)?,
        Command::Inspect => serde_json::to_value(library.inspect()?)?,
        Command::Pending { limit } => serde_json::to_value(library.pending_tracks(limit)?)?,
        Command::Analyze {
            jobs,
            limit,
            timeout,
        } => analyze_pending(&library, jobs, limit, timeout)?,
        Command::Set {
            file,
            column,
            value,
        } => {
            library.set_column(&file, &column, parse_column_value(&value))?;
            json!({ "updated": file, "column": column, "value": value })
        }
        Command::FixBands => json!({ "changed": library.apply_band_exceptions()? }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
