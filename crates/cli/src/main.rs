//! space - deploy build artifacts to S3-compatible object storage
//!
//! Pushes files and folders to the bucket of a named environment (dev, live),
//! lists, downloads, tags and removes objects.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod exit_code;
mod output;

use commands::Cli;

/// Filter used by --debug: our crates at debug, dependencies at warn
const DEBUG_FILTER: &str = "warn,space=debug,space_cli=debug,space_core=debug,space_s3=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays clean
    let filter = if cli.debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
