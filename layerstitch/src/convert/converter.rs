//! External tile-format converter.
//!
//! The [`Converter`] trait is the single seam between the conversion cache
//! and whatever actually produces raster files. [`ExternalConverter`] runs a
//! command-line tool as `<program> <input> <output>`; tests substitute a fake.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use super::ConvertError;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default per-invocation timeout.
pub const DEFAULT_CONVERTER_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a single conversion failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionFailure {
    /// The converter exited with a non-zero status.
    #[error("converter exited with {}: {stderr}", exit_code_label(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    /// The converter did not finish within the timeout.
    #[error("converter timed out after {timeout_secs}s")]
    TimedOut { timeout_secs: u64 },

    /// The converter reported success but the output file is absent.
    #[error("converter produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    /// The converted file could not be moved into the cache.
    #[error("failed to publish {}: {reason}", .path.display())]
    Publish { path: PathBuf, reason: String },

    /// The converter process could not be started.
    #[error("failed to start converter: {0}")]
    Spawn(String),

    /// The source file could not be read for hashing.
    #[error("failed to read {}: {reason}", .path.display())]
    ReadSource { path: PathBuf, reason: String },

    /// The task running this conversion failed.
    #[error("conversion task failed: {0}")]
    Worker(String),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Converts one proprietary tile into a raster file.
///
/// Uses `BoxFuture` so the trait stays dyn-compatible and can be shared as
/// `Arc<dyn Converter>`.
pub trait Converter: Send + Sync {
    /// Convert `input` into `output`.
    ///
    /// Success means the output file exists afterwards.
    fn convert<'a>(
        &'a self,
        input: &'a Path,
        output: &'a Path,
    ) -> BoxFuture<'a, Result<(), ConversionFailure>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Runs an external converter executable.
#[derive(Clone)]
pub struct ExternalConverter {
    program: PathBuf,
    timeout: Duration,
}

impl fmt::Debug for ExternalConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalConverter")
            .field("program", &self.program)
            .field("timeout_secs", &self.timeout.as_secs())
            .finish()
    }
}

impl ExternalConverter {
    /// Create a converter for `program`.
    ///
    /// # Errors
    ///
    /// Fails if `program` does not exist, is not a regular file, or (on
    /// unix) has no execute bit set.
    pub fn new(program: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let program = program.into();
        validate_executable(&program)?;
        Ok(Self {
            program,
            timeout: DEFAULT_CONVERTER_TIMEOUT,
        })
    }

    /// Resolve an optional configured path into a converter.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::ConverterNotConfigured`] for `None`, otherwise
    /// the same errors as [`ExternalConverter::new`].
    pub fn from_configured(program: Option<&Path>) -> Result<Self, ConvertError> {
        let program = program.ok_or(ConvertError::ConverterNotConfigured)?;
        Self::new(program)
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path to the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<(), ConversionFailure> {
        debug!(
            program = %self.program.display(),
            input = %input.display(),
            output = %output.display(),
            "Invoking converter"
        );

        let child = Command::new(&self.program)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ConversionFailure::TimedOut {
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ConversionFailure::Spawn(e.to_string()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ConversionFailure::NonZeroExit {
                code: result.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        if !output.is_file() {
            return Err(ConversionFailure::MissingOutput(output.to_path_buf()));
        }

        Ok(())
    }
}

impl Converter for ExternalConverter {
    fn convert<'a>(
        &'a self,
        input: &'a Path,
        output: &'a Path,
    ) -> BoxFuture<'a, Result<(), ConversionFailure>> {
        Box::pin(self.run(input, output))
    }

    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("converter")
    }
}

fn validate_executable(program: &Path) -> Result<(), ConvertError> {
    let metadata = std::fs::metadata(program)
        .map_err(|_| ConvertError::ConverterNotFound(program.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(ConvertError::NotExecutable(program.to_path_buf()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ConvertError::NotExecutable(program.to_path_buf()));
        }
    }

    Ok(())
}
