//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use layerstitch::config::ConfigFileError;
use layerstitch::convert::ConvertError;
use layerstitch::pipeline::PipelineError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Assembly or preview failed
    Pipeline(PipelineError),
    /// Failed to open or clear the conversion cache
    Cache(String),
    /// Failed to write output file
    FileWrite { path: String, error: String },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Pipeline(PipelineError::Convert(ConvertError::ConverterNotConfigured)) => {
                eprintln!();
                eprintln!("The image directory contains tiles that need conversion.");
                eprintln!("Point LayerStitch at a converter with either:");
                eprintln!("  1. --converter /path/to/converter");
                eprintln!("  2. [converter] path = ... in config.ini");
            }
            CliError::Pipeline(PipelineError::NoTiles { .. }) => {
                eprintln!();
                eprintln!("Tiles must be named <prefix>_<x>_<y>_<suffix>.<ext>, e.g. S_0_0_lco.png");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Pipeline(e) => write!(f, "{}", e),
            CliError::Cache(msg) => write!(f, "Conversion cache error: {}", msg),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}

impl From<ConvertError> for CliError {
    fn from(e: ConvertError) -> Self {
        CliError::Cache(e.to_string())
    }
}
