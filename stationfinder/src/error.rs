//! Error types for the station finder core.
//!
//! None of these are fatal to the host application. Every variant has a
//! defined degraded behavior in the component that produces it.

use thiserror::Error;

use crate::sensor::SensorKind;
use crate::station::StationId;

/// Errors from the sensor layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorError {
    /// The user (or platform) denied access to the sensor.
    #[error("{0} permission denied")]
    PermissionDenied(SensorKind),

    /// The permission prompt did not resolve within the configured wait.
    #[error("{kind} permission request timed out after {waited_ms}ms")]
    PermissionTimeout { kind: SensorKind, waited_ms: u64 },
}

/// Errors from the directions collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectionsError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status} from directions service")]
    Status { status: u16 },

    /// The response body could not be decoded.
    #[error("Failed to parse directions response: {0}")]
    Parse(String),

    /// The service found no walking route between the two points.
    #[error("No route found")]
    NoRoute,

    /// The request did not finish within the configured wait.
    #[error("Directions request timed out after {0}ms")]
    Timeout(u64),

    /// A recorded route file could not be read.
    #[error("Failed to read route file {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Errors surfaced by the navigation session controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// Navigation needs a last known location to plan from.
    #[error("No known location to navigate from")]
    NoLocation,

    /// The directions service could not produce a route.
    #[error("Route to station {station} unavailable: {source}")]
    RouteUnavailable {
        station: StationId,
        #[source]
        source: DirectionsError,
    },

    /// The station is not part of the current station list.
    #[error("Unknown station: {0}")]
    UnknownStation(StationId),

    /// The operation needs an active session.
    #[error("No active navigation session")]
    NotNavigating,
}

/// Errors from loading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading or writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The INI file could not be parsed.
    #[error("Failed to parse config file: {0}")]
    Parse(String),

    /// A value was present but could not be interpreted.
    #[error("Invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    /// No home directory could be determined for the default path.
    #[error("Could not determine home directory")]
    NoHomeDirectory,
}

impl From<ini::Error> for ConfigError {
    fn from(e: ini::Error) -> Self {
        match e {
            ini::Error::Io(io) => ConfigError::Io(io),
            ini::Error::Parse(p) => ConfigError::Parse(p.to_string()),
        }
    }
}

/// Errors from the engine as a whole.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Navigation failed.
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// A sensor could not be used.
    #[error(transparent)]
    Sensor(#[from] SensorError),

    /// Station data could not be loaded.
    #[error("Failed to load stations: {0}")]
    Stations(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_unavailable_display() {
        let err = NavigationError::RouteUnavailable {
            station: StationId::from("st-7"),
            source: DirectionsError::NoRoute,
        };
        let msg = err.to_string();
        assert!(msg.contains("st-7"));
        assert!(msg.contains("No route found"));
    }

    #[test]
    fn test_route_file_error_display() {
        let err = DirectionsError::Io {
            path: "/tmp/route.json".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read route file /tmp/route.json: not found"
        );
    }

    #[test]
    fn test_permission_timeout_display() {
        let err = SensorError::PermissionTimeout {
            kind: SensorKind::Compass,
            waited_ms: 10_000,
        };
        assert!(err.to_string().contains("compass"));
        assert!(err.to_string().contains("10000ms"));
    }

    #[test]
    fn test_engine_error_from_navigation() {
        let err: EngineError = NavigationError::NoLocation.into();
        assert!(matches!(err, EngineError::Navigation(NavigationError::NoLocation)));
    }
}
