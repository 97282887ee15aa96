//! Nearby command - list the closest stations.

use std::path::{Path, PathBuf};

use console::style;
use stationfinder::geo::LatLng;
use stationfinder::station::StationList;

use super::common::{format_distance, load_config};
use crate::error::CliError;

#[derive(Debug)]
pub struct NearbyArgs {
    pub stations: PathBuf,
    /// `(lat, lng)`; the configured fallback location when absent.
    pub position: Option<(f64, f64)>,
    pub limit: usize,
    pub available_only: bool,
}

pub fn run(config_path: Option<&Path>, args: NearbyArgs) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let stations = StationList::load(&args.stations)?;

    let from = match args.position {
        Some((lat, lng)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(CliError::Usage(format!("Coordinate out of range: {}, {}", lat, lng)));
            }
            LatLng::new(lat, lng)
        }
        None => config.map.fallback_location,
    };

    let ranked = stations.nearest(from, args.limit, args.available_only);
    if ranked.is_empty() {
        println!("No stations found near {}", from);
        return Ok(());
    }

    println!("{} near {}", style("Stations").bold(), from);
    println!();
    for entry in ranked {
        let units = if entry.station.has_available_units() {
            style(format!("{} available", entry.station.available_units)).green()
        } else {
            style("empty".to_string()).red()
        };
        println!(
            "  {:>8}  {}  ({})  {}",
            format_distance(entry.distance_m),
            style(&entry.station.name).cyan(),
            entry.station.id,
            units
        );
        if let Some(address) = &entry.station.address {
            println!("            {}", style(address).dim());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_coordinate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stations = dir.path().join("stations.json");
        std::fs::write(&stations, "[]").unwrap();

        let args = NearbyArgs {
            stations,
            position: Some((95.0, 13.0)),
            limit: 3,
            available_only: false,
        };
        let err = run(Some(dir.path().join("config.ini").as_path()), args).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_missing_station_file_is_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = NearbyArgs {
            stations: dir.path().join("missing.json"),
            position: None,
            limit: 3,
            available_only: false,
        };
        let err = run(Some(dir.path().join("config.ini").as_path()), args).unwrap_err();
        assert!(matches!(err, CliError::Engine(_)));
    }
}
