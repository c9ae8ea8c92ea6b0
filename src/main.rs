// src/main.rs
mod driver;
mod extractors;
mod fetch;
mod storage;
mod utils;

use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use driver::{BatchDriver, PersistMode, ScanConfig};
use fetch::{HttpFetcher, DEFAULT_BASE_URL};
use utils::AppError;

/// Command Line Interface for the club directory scraper
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the key space, resuming after the last key already in the output
    Scan {
        /// Start from this key and replace the output instead of resuming
        #[arg(long)]
        start: Option<u64>,

        /// Last key to scan
        #[arg(long, default_value_t = driver::DEFAULT_END_KEY)]
        end: u64,

        /// Keys per progress window
        #[arg(long, default_value_t = driver::DEFAULT_BATCH_SIZE)]
        batch_size: u64,

        /// Output CSV file
        #[arg(short, long, default_value = driver::DEFAULT_OUTPUT)]
        output: PathBuf,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Re-scrape START..=END and overwrite those keys in the output
    Range {
        start: u64,

        end: u64,

        /// Output CSV file, rewritten sorted by key
        #[arg(default_value = driver::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Keys per window; the output is rewritten after each one
        #[arg(long, default_value_t = driver::DEFAULT_RANGE_BATCH_SIZE)]
        batch_size: u64,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Merge the outputs of several workers into one file
    Merge {
        output: PathBuf,

        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Site the detail pages are read from (any district mirror works)
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Prerender service; the page URL is appended to it
    #[arg(long)]
    render_endpoint: Option<String>,

    /// Debug mode - save annotated markup of every found club here
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let cli = Cli::parse();
    tracing::debug!("Starting with args: {:?}", cli);

    // 3. Dispatch
    let result = match cli.command {
        Command::Scan { start, end, batch_size, output, fetch } => {
            let config = ScanConfig {
                start_key: start,
                end_key: end,
                batch_size,
                output,
                base_url: fetch.base_url,
                debug_dir: fetch.debug_dir,
            };
            run(config, fetch.render_endpoint, PersistMode::Append).await
        }
        Command::Range { start, end, output, batch_size, fetch } => {
            let config = ScanConfig {
                start_key: Some(start),
                end_key: end,
                batch_size,
                output,
                base_url: fetch.base_url,
                debug_dir: fetch.debug_dir,
            };
            run(config, fetch.render_endpoint, PersistMode::OverwriteByKey).await
        }
        Command::Merge { output, inputs } => storage::merge_outputs(&inputs, &output)
            .map(|rows| tracing::info!("Wrote {} rows to {}", rows, output.display()))
            .map_err(AppError::from),
    };

    if let Err(e) = &result {
        tracing::error!("{}", e);
    }
    result
}

/// Runs one driver with a fresh fetch session until done or Ctrl-C.
async fn run(config: ScanConfig, render_endpoint: Option<String>, mode: PersistMode) -> Result<(), AppError> {
    let fetcher = HttpFetcher::new(render_endpoint)?;
    let driver = BatchDriver::new(&fetcher, config, mode)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interruption requested, saving progress");
            on_interrupt.cancel();
        }
    });

    driver.run(&cancel).await?;
    Ok(())
}
