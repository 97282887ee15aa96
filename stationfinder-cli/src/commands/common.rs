//! Helpers shared by the subcommands.

use std::path::{Path, PathBuf};

use stationfinder::config::{ConfigFile, EngineConfig};

use crate::error::CliError;

/// The explicit `--config` path, or `~/.stationfinder/config.ini`.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(ConfigFile::default_path()?),
    }
}

/// Load configuration, using defaults when no file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig, CliError> {
    let path = config_path(explicit)?;
    Ok(ConfigFile::load_or_default(&path)?)
}

/// Human-readable distance: meters below a kilometer, otherwise km.
pub fn format_distance(meters: f64) -> String {
    if meters < 1_000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.1} km", meters / 1_000.0)
    }
}
