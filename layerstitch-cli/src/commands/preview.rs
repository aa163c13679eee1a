//! `layerstitch preview`: render a downscaled canvas and estimate the full one.

use std::path::PathBuf;

use clap::Args;
use tokio::runtime::Runtime;

use super::common::{print_errors, AssemblyArgs};
use crate::error::CliError;
use crate::progress::BarObserver;

/// Arguments for the preview command.
#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub assembly: AssemblyArgs,

    /// Edge length each tile is scaled to
    #[arg(long, short = 's')]
    pub size: Option<u32>,

    /// Save the preview image here
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Run the preview command.
pub fn run(args: PreviewArgs, runtime: &Runtime, quiet: bool) -> Result<(), CliError> {
    let resolved = args.assembly.resolve()?;
    let mut request = resolved.request.clone();
    if let Some(size) = args.size {
        request = request.with_preview_tile_size(size);
    }

    let observer = BarObserver::new(quiet);
    let result = runtime.block_on(
        resolved
            .pipeline
            .preview(&request, &args.assembly.dir, &observer),
    );
    observer.finish();
    let report = result?;

    println!(
        "Preview:    {}x{} ({} tiles)",
        report.preview_size.0, report.preview_size.1, report.tiles_placed
    );
    println!(
        "Full size:  {}x{} (~{:.1} MB uncompressed)",
        report.full_size.0, report.full_size.1, report.estimated_file_size_mb
    );

    if let Some(path) = &args.output {
        report
            .canvas
            .save(path)
            .map_err(|e| CliError::FileWrite {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
        println!("Saved {}", path.display());
    }
    print_errors(&report.errors);

    Ok(())
}
