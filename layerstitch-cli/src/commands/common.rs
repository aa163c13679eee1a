//! Arguments and setup shared by `stitch` and `preview`.

use std::path::{Path, PathBuf};

use clap::Args;
use layerstitch::color::BackgroundColor;
use layerstitch::config::{config_file_path, ConfigFile};
use layerstitch::pipeline::{AssemblyRequest, FileErrors, Pipeline, PipelineSettings};

use crate::error::CliError;

/// Errors listed individually before the rest are summarized.
const MAX_LISTED_ERRORS: usize = 20;

/// Tile selection and assembly options. Unset options fall back to config.ini.
#[derive(Debug, Args)]
pub struct AssemblyArgs {
    /// Directory containing the tiles
    #[arg(long, short = 'd')]
    pub dir: PathBuf,

    /// Tiles along each canvas edge (1-128)
    #[arg(long, short = 'g')]
    pub grid: Option<u32>,

    /// Pixels cropped from every tile edge (0-32)
    #[arg(long, short = 't')]
    pub trim: Option<u32>,

    /// Layer tag to assemble (e.g. S, M, N)
    #[arg(long, short = 'p')]
    pub prefix: Option<String>,

    /// Fill for cells without a tile (#rrggbb, #rgb, or a color name)
    #[arg(long, short = 'b')]
    pub background: Option<BackgroundColor>,

    /// Converter executable for proprietary tiles
    #[arg(long)]
    pub converter: Option<PathBuf>,

    /// Converter timeout in seconds
    #[arg(long)]
    pub converter_timeout: Option<u64>,

    /// Directory for converted tiles and the conversion record
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Concurrent loads and conversions (1-64)
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Read settings from this config file instead of ~/.layerstitch/config.ini
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Everything needed to run the pipeline once.
pub struct Resolved {
    pub config: ConfigFile,
    pub request: AssemblyRequest,
    pub pipeline: Pipeline,
}

/// Load the config file named by `--config`, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    Ok(ConfigFile::load_from(&path)?)
}

impl AssemblyArgs {
    /// Overlay command-line options on the config file and open the cache.
    pub fn resolve(&self) -> Result<Resolved, CliError> {
        let mut config = load_config(self.config.as_deref())?;
        self.apply_to(&mut config);

        let request = AssemblyRequest {
            grid_size: config.assembly.grid_size,
            trim_pixels: config.assembly.trim_pixels,
            prefix: config.assembly.prefix.clone(),
            background: config.assembly.background,
            preview_tile_size: Some(config.assembly.preview_tile_size),
        };

        let settings = PipelineSettings::from_config(&config);
        let pipeline = Pipeline::open(&config.cache.directory, settings)?;

        Ok(Resolved {
            config,
            request,
            pipeline,
        })
    }

    fn apply_to(&self, config: &mut ConfigFile) {
        if let Some(grid) = self.grid {
            config.assembly.grid_size = grid;
        }
        if let Some(trim) = self.trim {
            config.assembly.trim_pixels = trim;
        }
        if let Some(prefix) = &self.prefix {
            config.assembly.prefix = prefix.clone();
        }
        if let Some(background) = self.background {
            config.assembly.background = background;
        }
        if let Some(converter) = &self.converter {
            config.converter.path = Some(converter.clone());
        }
        if let Some(timeout) = self.converter_timeout {
            config.converter.timeout = timeout;
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache.directory = cache_dir.clone();
        }
        if let Some(workers) = self.workers {
            config.loader.workers = workers;
        }
    }
}

/// Print per-file failures, listing at most a screenful.
pub fn print_errors(errors: &FileErrors) {
    if errors.is_empty() {
        return;
    }
    let messages = errors.messages();
    println!();
    println!("{} file(s) skipped:", messages.len());
    for message in messages.iter().take(MAX_LISTED_ERRORS) {
        println!("  {}", message);
    }
    if messages.len() > MAX_LISTED_ERRORS {
        println!("  ... and {} more (see log)", messages.len() - MAX_LISTED_ERRORS);
    }
}
