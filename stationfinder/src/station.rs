//! Station records as seen by the core.
//!
//! The core never owns station data. It receives a list from the record store
//! (here: a JSON document) and only keeps ids and last-known coordinates.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geo::LatLng;

/// Opaque station identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub String);

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A rentable-battery station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub available_units: u32,
    #[serde(default)]
    pub address: Option<String>,
}

impl Station {
    /// Station coordinate.
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Whether at least one battery can be rented here.
    pub fn has_available_units(&self) -> bool {
        self.available_units > 0
    }
}

/// A station paired with its distance from a reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedStation<'a> {
    pub station: &'a Station,
    pub distance_m: f64,
}

/// The passively updated station list.
#[derive(Debug, Clone, Default)]
pub struct StationList {
    stations: Vec<Station>,
}

impl StationList {
    /// Wrap an already loaded list.
    pub fn new(stations: Vec<Station>) -> Self {
        Self { stations }
    }

    /// Parse a JSON array of stations.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let stations: Vec<Station> =
            serde_json::from_str(json).map_err(|e| EngineError::Stations(e.to_string()))?;
        Ok(Self::new(stations))
    }

    /// Load a JSON array of stations from disk.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Stations(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn get(&self, id: &StationId) -> Option<&Station> {
        self.stations.iter().find(|s| &s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations nearest to `from`, closest first.
    ///
    /// With `available_only`, stations without units are skipped.
    pub fn nearest(
        &self,
        from: LatLng,
        limit: usize,
        available_only: bool,
    ) -> Vec<RankedStation<'_>> {
        let mut ranked: Vec<RankedStation<'_>> = self
            .stations
            .iter()
            .filter(|s| !available_only || s.has_available_units())
            .map(|station| RankedStation {
                station,
                distance_m: from.distance_to(&station.position()),
            })
            .collect();

        ranked.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        ranked.truncate(limit);
        ranked
    }

    /// Ids present here but missing from `newer`.
    pub fn removed_in<'a>(&'a self, newer: &'a StationList) -> impl Iterator<Item = &'a StationId> {
        self.stations
            .iter()
            .map(|s| &s.id)
            .filter(move |id| newer.get(id).is_none())
    }
}
