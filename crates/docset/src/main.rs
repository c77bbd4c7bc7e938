//! docset CLI - MyST markdown documentation compiler.
//!
//! Provides commands for:
//! - `build`: Build a documentation set to static HTML and `links.json`
//! - `check-links`: Validate every published cross-link against the link index

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, CheckLinksArgs};
use error::CliError;
use output::Output;

/// docset - MyST markdown documentation compiler.
#[derive(Parser)]
#[command(name = "docset", version, about)]
struct Cli {
    /// Enable verbose output (info logs and timings).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a documentation set.
    Build(BuildArgs),
    /// Validate cross-links published in the link index.
    CheckLinks(CheckLinksArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Build(args) => rt.block_on(args.execute(cli.verbose)),
        Commands::CheckLinks(args) => rt.block_on(args.execute(cli.verbose)),
    }
}
