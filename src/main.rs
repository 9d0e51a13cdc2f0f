mod config;
mod coords;
mod error;
mod jpeg;
mod matcher;
mod metadata;
mod processor;
#[cfg(test)]
mod test_support;
mod track;
mod walker;

use crate::config::AppConfig;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

/// Geotag photos from the GPX track recorded while they were taken.
#[derive(Parser, Debug)]
#[command(name = "photo-geotagger", version, about)]
struct Cli {
    /// GPX file with the recorded track
    track: PathBuf,

    /// A photo, or a directory whose photos should be tagged
    photos: PathBuf,

    /// Extra configuration file layered over config/default and friends
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip photos whose nearest track point is more than this many seconds away
    #[arg(long, value_name = "SECS")]
    max_gap: Option<i64>,

    /// Report matches without modifying any photo
    #[arg(long)]
    dry_run: bool,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::new(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if cli.max_gap.is_some() {
        config.max_time_gap_secs = cli.max_gap;
    }
    config.dry_run |= cli.dry_run;

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting photo-geotagger");

    let report = processor::run(&config, &cli.track, &cli.photos)
        .with_context(|| format!("geotagging {:?} from {:?} failed", cli.photos, cli.track))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for photo in &report.photos {
            println!("{}: {}", photo.path.display(), photo.outcome);
        }
        println!(
            "{} tagged, {} skipped, {} failed ({} track samples)",
            report.tagged(),
            report.skipped(),
            report.failed(),
            report.track_samples
        );
    }

    info!("photo-geotagger finished");

    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}
