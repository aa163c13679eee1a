//! `layerstitch stitch`: assemble the full-resolution canvas.

use std::path::PathBuf;

use clap::Args;
use tokio::runtime::Runtime;

use super::common::{print_errors, AssemblyArgs};
use crate::error::CliError;
use crate::progress::BarObserver;

/// Arguments for the stitch command.
#[derive(Debug, Args)]
pub struct StitchArgs {
    #[command(flatten)]
    pub assembly: AssemblyArgs,

    /// Output image path; the format follows the extension (.png, .jpg, .bmp, ...)
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

/// Run the stitch command.
pub fn run(args: StitchArgs, runtime: &Runtime, quiet: bool) -> Result<(), CliError> {
    let resolved = args.assembly.resolve()?;
    let request = &resolved.request;

    println!(
        "Stitching {}x{} grid of '{}' tiles from {}",
        request.grid_size,
        request.grid_size,
        request.prefix,
        args.assembly.dir.display()
    );

    let observer = BarObserver::new(quiet);
    let result = runtime.block_on(resolved.pipeline.assemble(
        request,
        &args.assembly.dir,
        &args.output,
        &observer,
    ));
    observer.finish();
    let report = result?;

    println!();
    println!("Saved {}", report.output_path.display());
    println!(
        "  Canvas:     {}x{} ({}x{} per tile)",
        report.canvas_size.0, report.canvas_size.1, report.tile_size.0, report.tile_size.1
    );
    println!(
        "  Tiles:      {} placed, {} blank",
        report.tiles_placed, report.blank_cells
    );
    if report.conversion.converted + report.conversion.reused > 0 {
        println!(
            "  Conversion: {} converted, {} reused",
            report.conversion.converted, report.conversion.reused
        );
    }
    if !report.out_of_grid.is_empty() {
        println!(
            "  Ignored {} tile(s) outside the grid",
            report.out_of_grid.len()
        );
    }
    if !report.mismatched.is_empty() {
        println!(
            "  Skipped {} tile(s) whose size differs from the first tile",
            report.mismatched.len()
        );
    }
    print_errors(&report.errors);

    Ok(())
}
