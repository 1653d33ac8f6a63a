//! Local configuration maintenance. Keys are dot paths into the TOML tree,
//! e.g. `timer.tick_interval_ms` or `server.session_token`.

use clap::Subcommand;
use pomotick_core::{Config, ConfigError};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value
    Get { key: String },
    /// Change one value and write the file
    Set { key: String, value: String },
    /// Print the whole configuration as JSON
    List,
    /// Overwrite the file with defaults
    Reset,
    /// Print where the configuration file lives
    Path,
}

pub fn run(action: ConfigAction) -> CliResult {
    let path = Config::path()?;

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_from(&path)?;
            let value = config.get(&key).ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(&path)?;
            config.apply(&key, &value)?;
            config.save_to(&path)?;
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List => print_json(&Config::load_from(&path)?)?,
        ConfigAction::Reset => {
            Config::default().save_to(&path)?;
            println!("config reset to defaults ({})", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}
