//! bamboo-artifact — keep Bamboo build artifacts installed on this host.
//!
//! # Usage
//!
//! ```text
//! bamboo-artifact apply <manifest.yaml> [--noop]
//! bamboo-artifact status <manifest.yaml> [--check] [--json]
//! ```
//!
//! Logging honours `RUST_LOG`; `--verbose` lowers the default level to debug.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{apply::ApplyArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "bamboo-artifact",
    version,
    about = "Ensure Bamboo build artifacts are downloaded to their target paths",
    long_about = None,
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate every artifact in a manifest and install what is out of date.
    Apply(ApplyArgs),

    /// Show the recorded state of every artifact in a manifest.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Apply(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
