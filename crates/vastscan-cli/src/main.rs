mod scan;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "vastscan-cli")]
#[command(about = "Resolve ad tag wrapper chains into deduplicable ad records")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a tag URL and emit one JSON line per terminal ad
    Scan {
        /// Top-level tag URL
        url: String,

        /// Run the same tag this many times, numbering each call from 1
        #[arg(long, default_value_t = 1)]
        calls: u32,

        /// Append records to this file instead of writing them to stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override `VASTSCAN_MAX_DEPTH` for this run
        #[arg(long)]
        max_depth: Option<u32>,

        /// Follow sibling wrappers concurrently
        #[arg(long)]
        parallel: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = vastscan_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Scan {
            url,
            calls,
            output,
            max_depth,
            parallel,
        }) => {
            let options = scan::ScanOptions {
                calls,
                output,
                max_depth,
                parallel,
            };
            scan::run_scan(&config, &url, &options).await?;
        }
        None => println!("vastscan-cli: run `vastscan-cli scan <URL>` to resolve a tag"),
    }

    Ok(())
}
