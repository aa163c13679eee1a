//! User configuration.
//!
//! Defaults for assembly parameters, the external converter, the conversion
//! cache and the worker pool, overridable through `~/.layerstitch/config.ini`:
//!
//! ```ini
//! [assembly]
//! grid_size = 16
//! prefix = S
//!
//! [converter]
//! path = ~/tools/ImageToPAA
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{AssemblySettings, CacheSettings, ConfigFile, ConverterSettings, LoaderSettings};
