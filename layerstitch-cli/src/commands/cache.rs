//! Conversion cache management CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use layerstitch::convert::ConversionCache;

use super::common::load_config;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show the cache location and record count
    Status {
        /// Cache directory (defaults to the configured one)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Forget every conversion record so tiles are converted again
    Clear {
        /// Cache directory (defaults to the configured one)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    match action {
        CacheAction::Status { cache_dir } => {
            let cache = open(cache_dir)?;
            println!("Conversion cache: {}", cache.cache_dir().display());
            println!("  Records: {}", cache.len());
            println!("  Record file: {}", cache.record_path().display());
            Ok(())
        }
        CacheAction::Clear { cache_dir } => {
            let cache = open(cache_dir)?;
            println!("Clearing conversion cache at: {}", cache.cache_dir().display());
            let records = cache.len();
            cache
                .clear()
                .map_err(|e| CliError::Cache(e.to_string()))?;
            println!("Removed {} record(s)", records);
            Ok(())
        }
    }
}

fn open(cache_dir: Option<PathBuf>) -> Result<ConversionCache, CliError> {
    let config = load_config(None)?;
    let dir = cache_dir.unwrap_or(config.cache.directory);
    Ok(ConversionCache::open(dir)?.with_raster_extension(config.converter.raster_extension))
}
