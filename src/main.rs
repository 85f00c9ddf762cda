//! # history-export CLI
//!
//! Reads a browser history database, joins visits with their URLs and
//! writes the result to CSV.
//!
//! ## Usage
//!
//! ```bash
//! history-export [OPTIONS] [SOURCE] [OUTPUT]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Paths on the command line
//! history-export ./History ./out/visits.csv
//!
//! # Paths from a config file, copying the live database first
//! history-export --config ./export.toml --snapshot
//!
//! # No console previews, verbose logging
//! history-export ./History out.csv --preview-rows 0 --log-level debug
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use history_export::config::{self, Overrides};
use history_export::pipeline;

/// Export browser history visits, joined with their URLs, to CSV.
///
/// Paths may come from the command line or from a TOML config file;
/// command-line values win.
#[derive(Parser)]
#[command(name = "history-export", version, about)]
struct Cli {
    /// Path to the history database (e.g. Chrome/Edge `History`).
    source: Option<PathBuf>,

    /// Path of the CSV file to write. An existing file is replaced.
    output: Option<PathBuf>,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rows of each table to print before and after the join (0 disables).
    #[arg(long)]
    preview_rows: Option<usize>,

    /// Seconds to wait for a locked database before giving up.
    #[arg(long)]
    busy_timeout: Option<u64>,

    /// Copy the database to a temporary directory and read the copy.
    #[arg(long)]
    snapshot: bool,

    /// Log filter when `RUST_LOG` is unset (e.g. `warn`, `debug`).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .with_context(|| format!("Invalid log level: {}", cli.log_level))?;
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(
        cli.config.as_deref(),
        Overrides {
            source: cli.source,
            output: cli.output,
            preview_rows: cli.preview_rows,
            busy_timeout_secs: cli.busy_timeout,
            snapshot: cli.snapshot,
        },
    )?;

    let summary = pipeline::run_export(&cfg).await?;

    eprintln!(
        "Exported {} visits ({} resolved, {} unresolved) to {}",
        summary.visits,
        summary.resolved,
        summary.unresolved,
        summary.destination.display()
    );
    Ok(())
}
