//! Mapping surface seam.
//!
//! The mapping SDK is opaque to the core. The core only issues imperative
//! [`MapCommand`]s through [`MapSurface`] and receives [`MapGesture`]s back.
//!
//! # Command Flow
//!
//! ```text
//! FollowModeController ──┐
//! NavigationSession ─────┼──► MapCommand ──► MapSurface (SDK, recorder, logger)
//! StationHighlight ──────┘
//! ```

mod recording;

pub use recording::{RecordingMapSurface, TracingMapSurface};

use crate::context::MapTheme;
use crate::geo::LatLng;
use crate::station::StationId;

/// A camera change. `None` fields keep the current camera value.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraUpdate {
    pub center: Option<LatLng>,
    pub zoom: Option<f64>,
    /// Degrees clockwise from north that point "up" on screen.
    pub bearing: Option<f64>,
    /// Degrees from straight down.
    pub pitch: Option<f64>,
    /// Screen-space offset (x, y) in pixels applied to the center.
    pub offset_px: (f64, f64),
    /// Ease/fly to the target instead of jumping.
    pub animated: bool,
}

impl CameraUpdate {
    /// Center at a zoom with a neutral (north-up, flat) orientation.
    pub fn centered(center: LatLng, zoom: f64) -> Self {
        Self {
            center: Some(center),
            zoom: Some(zoom),
            bearing: Some(0.0),
            pitch: Some(0.0),
            offset_px: (0.0, 0.0),
            animated: true,
        }
    }

    /// Ease bearing and pitch back to neutral without moving the center.
    pub fn neutral() -> Self {
        Self {
            center: None,
            zoom: None,
            bearing: Some(0.0),
            pitch: Some(0.0),
            offset_px: (0.0, 0.0),
            animated: true,
        }
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.offset_px = (x, y);
        self
    }

    pub fn instant(mut self) -> Self {
        self.animated = false;
        self
    }
}

/// Marker slots managed by the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerId {
    /// The user's own position.
    User,
    /// A station on the overview map.
    Station(StationId),
    /// The highlight ring around the selected station.
    Highlight,
}

/// Line layers managed by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    /// Turn-by-turn route of the active navigation session.
    NavigationRoute,
    /// Display-only route to a highlighted station.
    PreviewRoute,
}

/// Imperative command for the mapping surface.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    SetTheme(MapTheme),
    SetCamera(CameraUpdate),
    /// Add the marker, or move it if it already exists.
    PlaceMarker {
        id: MarkerId,
        position: LatLng,
        heading: Option<f64>,
    },
    RemoveMarker(MarkerId),
    AddLine {
        layer: LayerId,
        geometry: Vec<LatLng>,
    },
    RemoveLine(LayerId),
}

/// User-initiated camera gestures reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapGesture {
    Drag,
    Rotate,
    Pitch,
}

impl std::fmt::Display for MapGesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapGesture::Drag => write!(f, "drag"),
            MapGesture::Rotate => write!(f, "rotate"),
            MapGesture::Pitch => write!(f, "pitch"),
        }
    }
}

/// The mapping SDK as seen by the core.
///
/// Implementations use interior mutability; the core only ever holds a
/// shared reference.
pub trait MapSurface: Send + Sync {
    fn apply(&self, command: MapCommand);
}

impl<T: MapSurface + ?Sized> MapSurface for std::sync::Arc<T> {
    fn apply(&self, command: MapCommand) {
        (**self).apply(command)
    }
}
