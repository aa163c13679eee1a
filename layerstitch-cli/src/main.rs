//! LayerStitch CLI - Command-line interface
//!
//! Stitches a directory of `<prefix>_<x>_<y>_<suffix>.<ext>` tiles into a
//! single image, converting proprietary tiles through an external tool first.

mod commands;
mod error;
mod progress;

use clap::{Parser, Subcommand};
use layerstitch::logging::{default_log_dir, default_log_file, init_logging};
use tokio::runtime::Runtime;
use tracing::info;

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::preview::PreviewArgs;
use commands::stitch::StitchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "layerstitch")]
#[command(version = layerstitch::VERSION)]
#[command(about = "Stitch a grid of map layer tiles into one image", long_about = None)]
struct Cli {
    /// Also print log events to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Hide the progress bar
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the full-resolution image
    Stitch(StitchArgs),

    /// Render a downscaled preview and report the full size
    Preview(PreviewArgs),

    /// Manage the conversion cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View or initialize config.ini
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let _guard = init_logging(&default_log_dir(), default_log_file(), cli.verbose)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    info!(version = layerstitch::VERSION, "LayerStitch starting");

    let quiet = cli.quiet;
    match cli.command {
        Commands::Stitch(args) => with_runtime(|rt| commands::stitch::run(args, rt, quiet)),
        Commands::Preview(args) => with_runtime(|rt| commands::preview::run(args, rt, quiet)),
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { command } => commands::config::run(command),
    }
}

/// Run a pipeline command on a fresh multi-threaded runtime.
fn with_runtime<F>(command: F) -> Result<(), CliError>
where
    F: FnOnce(&Runtime) -> Result<(), CliError>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    command(&runtime)
}
