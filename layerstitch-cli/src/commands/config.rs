//! Configuration CLI commands.

use clap::Subcommand;
use layerstitch::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration as config.ini text
    Show,

    /// Write the current configuration, creating config.ini if missing
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = ConfigFile::load()?;
            print!("{}", config.to_ini_string());
            Ok(())
        }
        ConfigCommands::Init => {
            let path = config_file_path();
            let config = ConfigFile::load()?;
            config.save_to(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}
