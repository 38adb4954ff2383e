//! sb - blob storage CLI
//!
//! Reads, writes and lists objects in S3 buckets through the portable
//! bucket layer.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use s3blob_cli::commands::{self, Cli};

/// Log filter for `--debug`: our crates at debug, the SDK stays quiet
const DEBUG_FILTER: &str = "warn,sb_core=debug,sb_s3=debug,s3blob_cli=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // Logs go to stderr so they never mix with object data on stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
