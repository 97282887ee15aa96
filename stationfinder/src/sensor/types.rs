//! Sensor value types.

use serde::{Deserialize, Serialize};

use crate::geo::{normalize_degrees, LatLng};

/// Which sensor a permission or subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Location,
    Compass,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Location => write!(f, "location"),
            SensorKind::Compass => write!(f, "compass"),
        }
    }
}

/// One geolocation fix as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy_meters: f64,
    #[serde(default)]
    pub speed_meters_per_second: Option<f64>,
    #[serde(default)]
    pub gps_heading_degrees: Option<f64>,
    pub timestamp_ms: u64,
}

impl LocationSample {
    /// A bare fix without speed or heading.
    pub fn at(position: LatLng, timestamp_ms: u64) -> Self {
        Self {
            lat: position.lat,
            lng: position.lng,
            accuracy_meters: 5.0,
            speed_meters_per_second: None,
            gps_heading_degrees: None,
            timestamp_ms,
        }
    }

    pub fn with_speed(mut self, mps: f64) -> Self {
        self.speed_meters_per_second = Some(mps);
        self
    }

    pub fn with_gps_heading(mut self, degrees: f64) -> Self {
        self.gps_heading_degrees = Some(degrees);
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// GPS heading if present and finite. Browsers report NaN while stationary.
    pub fn usable_gps_heading(&self) -> Option<f64> {
        self.gps_heading_degrees.filter(|h| h.is_finite())
    }
}

/// A device orientation (compass) reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationReading {
    /// Degrees clockwise from geographic north.
    pub heading_degrees: f64,
    pub timestamp_ms: u64,
}

impl OrientationReading {
    pub fn new(heading_degrees: f64, timestamp_ms: u64) -> Self {
        Self {
            heading_degrees,
            timestamp_ms,
        }
    }
}

/// Raw event pushed by a sensor subscription.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SensorEvent {
    Location(LocationSample),
    Orientation(OrientationReading),
}

impl SensorEvent {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            SensorEvent::Location(s) => s.timestamp_ms,
            SensorEvent::Orientation(o) => o.timestamp_ms,
        }
    }
}

/// Where the current heading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingSource {
    Compass,
    GpsHeading,
    MovementBearing,
    #[default]
    Unknown,
}

impl std::fmt::Display for HeadingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadingSource::Compass => write!(f, "compass"),
            HeadingSource::GpsHeading => write!(f, "gps"),
            HeadingSource::MovementBearing => write!(f, "movement"),
            HeadingSource::Unknown => write!(f, "unknown"),
        }
    }
}

/// Fused facing direction. `degrees` is always in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadingEstimate {
    degrees: f64,
    source: HeadingSource,
}

impl HeadingEstimate {
    pub fn new(degrees: f64, source: HeadingSource) -> Self {
        Self {
            degrees: normalize_degrees(degrees),
            source,
        }
    }

    /// The estimate before any source has produced a value.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    pub fn source(&self) -> HeadingSource {
        self.source
    }

    pub fn is_known(&self) -> bool {
        self.source != HeadingSource::Unknown
    }
}
