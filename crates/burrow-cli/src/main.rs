//! `burrow` — an interactive shell over a single-file B-tree record
//! store.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;
mod repl;

#[derive(Parser, Debug)]
#[command(name = "burrow", version, about = "Single-file B-tree record store")]
struct Args {
    /// Path to the database file (created if it does not exist)
    file: PathBuf,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let table = burrow_storage::Table::open(&args.file)
        .with_context(|| format!("opening database file {}", args.file.display()))?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    repl::run(table, &mut stdin.lock(), &mut stdout.lock())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("burrow_cli=debug,burrow_storage=debug")
    } else {
        EnvFilter::from_default_env()
    };
    // The protocol owns stdout, so diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
