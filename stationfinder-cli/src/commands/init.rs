//! Init command - write a default configuration file.

use std::path::Path;

use stationfinder::config::ConfigFile;

use super::common::config_path;
use crate::error::CliError;

pub fn run(explicit: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = config_path(explicit)?;

    if path.exists() && !force {
        println!("Configuration already exists: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    ConfigFile::write_default(&path)?;
    println!("Wrote configuration to {}", path.display());
    println!();
    println!("Set [directions] access_token before using live routing.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_then_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        run(Some(path.as_path()), false).unwrap();
        assert!(path.exists());

        std::fs::write(&path, "; edited\n").unwrap();
        run(Some(path.as_path()), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "; edited\n");

        run(Some(path.as_path()), true).unwrap();
        assert!(ConfigFile::load(&path).is_ok());
    }
}
