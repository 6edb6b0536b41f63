use anyhow::{Context, Result};
use apod_sync::{
    config::{Config, Overrides},
    logging, utils, ConsoleReporter, HttpArchive, Synchronizer,
};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apod-sync")]
#[command(about = "Mirror a rolling window of Astronomy Pictures of the Day into a directory")]
#[command(version)]
struct Cli {
    /// Directory holding the images (created if missing)
    #[arg(value_name = "DIR")]
    dir: String,

    /// Download images again even when already present
    #[arg(short, long)]
    force: bool,

    /// Never delete images outside the retention window
    #[arg(long)]
    skip_cleanup: bool,

    /// Keep the days window around every yearly anniversary too
    #[arg(long)]
    square: bool,

    /// Days kept before today (overrides config, default 3)
    #[arg(short, long)]
    days: Option<u32>,

    /// Yearly anniversaries kept (overrides config, default 5)
    #[arg(short, long)]
    years: Option<u32>,

    /// Largest full-size image in bytes; -1 always full size, 0 always thumbnail
    /// (overrides config, default 15000000)
    #[arg(short, long, allow_negative_numbers = true)]
    size_limit: Option<i64>,

    /// Settings file (default: config/settings.toml, then ~/.config/apod-sync/settings.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print debug diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Defaults apply only when no settings file exists
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };

    let overrides = Overrides {
        days: cli.days,
        years: cli.years,
        square: cli.square,
        force: cli.force,
        skip_cleanup: cli.skip_cleanup,
        size_limit: cli.size_limit,
    };
    let options = config.sync_options(utils::expand_path(&cli.dir), &overrides)?;
    let archive = HttpArchive::new(Some(&config.archive.base_url), config.archive.user_agent.as_deref())?;

    let now = Local::now();
    println!("===== {} =====", now.format("%d/%m/%Y %H:%M:%S"));
    tracing::debug!(?options, "Starting sync");

    let mut reporter = ConsoleReporter::stdout();
    let report = Synchronizer::new(&options, &archive)
        .run(now.date_naive(), &mut reporter)
        .await
        .context("Sync aborted")?;

    if !report.skipped.is_empty() {
        println!("{} item(s) skipped, they will be retried on the next run", report.skipped.len());
    }

    Ok(())
}
