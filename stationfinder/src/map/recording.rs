//! In-process map surfaces.
//!
//! [`RecordingMapSurface`] keeps every command and the resulting overlay
//! state so callers can assert on what a real SDK would be showing.
//! [`TracingMapSurface`] only logs.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use super::{CameraUpdate, LayerId, MapCommand, MapSurface, MarkerId};
use crate::geo::LatLng;

#[derive(Debug, Default)]
struct RecordingInner {
    commands: Vec<MapCommand>,
    markers: HashMap<MarkerId, LatLng>,
    lines: HashSet<LayerId>,
    line_adds: usize,
}

/// Map surface that records commands and tracks visible overlays.
#[derive(Debug, Default)]
pub struct RecordingMapSurface {
    inner: Mutex<RecordingInner>,
}

impl RecordingMapSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands received so far, oldest first.
    pub fn commands(&self) -> Vec<MapCommand> {
        self.inner.lock().commands.clone()
    }

    /// Camera updates received so far, oldest first.
    pub fn camera_updates(&self) -> Vec<CameraUpdate> {
        self.inner
            .lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                MapCommand::SetCamera(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_camera(&self) -> Option<CameraUpdate> {
        self.camera_updates().pop()
    }

    pub fn camera_update_count(&self) -> usize {
        self.inner
            .lock()
            .commands
            .iter()
            .filter(|c| matches!(c, MapCommand::SetCamera(_)))
            .count()
    }

    /// Line layers currently on the map.
    pub fn active_lines(&self) -> HashSet<LayerId> {
        self.inner.lock().lines.clone()
    }

    /// Total number of line additions, including replaced ones.
    pub fn line_add_count(&self) -> usize {
        self.inner.lock().line_adds
    }

    /// Position of a visible marker.
    pub fn marker(&self, id: &MarkerId) -> Option<LatLng> {
        self.inner.lock().markers.get(id).copied()
    }

    pub fn marker_count(&self) -> usize {
        self.inner.lock().markers.len()
    }

    /// Forget recorded commands but keep overlay state.
    pub fn clear_commands(&self) {
        self.inner.lock().commands.clear();
    }
}

impl MapSurface for RecordingMapSurface {
    fn apply(&self, command: MapCommand) {
        let mut inner = self.inner.lock();
        match &command {
            MapCommand::PlaceMarker { id, position, .. } => {
                inner.markers.insert(id.clone(), *position);
            }
            MapCommand::RemoveMarker(id) => {
                inner.markers.remove(id);
            }
            MapCommand::AddLine { layer, .. } => {
                inner.lines.insert(*layer);
                inner.line_adds += 1;
            }
            MapCommand::RemoveLine(layer) => {
                inner.lines.remove(layer);
            }
            MapCommand::SetTheme(_) | MapCommand::SetCamera(_) => {}
        }
        inner.commands.push(command);
    }
}

/// Map surface that logs every command at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMapSurface;

impl MapSurface for TracingMapSurface {
    fn apply(&self, command: MapCommand) {
        match command {
            MapCommand::SetCamera(update) => tracing::trace!(
                center = ?update.center,
                zoom = ?update.zoom,
                bearing = ?update.bearing,
                pitch = ?update.pitch,
                animated = update.animated,
                "Camera"
            ),
            MapCommand::AddLine { layer, geometry } => {
                tracing::debug!(layer = ?layer, points = geometry.len(), "Line added")
            }
            other => tracing::trace!(command = ?other, "Map command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_markers_and_lines() {
        let map = RecordingMapSurface::new();
        let p = LatLng::new(1.0, 2.0);

        map.apply(MapCommand::PlaceMarker {
            id: MarkerId::User,
            position: p,
            heading: None,
        });
        map.apply(MapCommand::AddLine {
            layer: LayerId::NavigationRoute,
            geometry: vec![p, p],
        });
        assert_eq!(map.marker(&MarkerId::User), Some(p));
        assert!(map.active_lines().contains(&LayerId::NavigationRoute));

        map.apply(MapCommand::RemoveLine(LayerId::NavigationRoute));
        map.apply(MapCommand::RemoveMarker(MarkerId::User));
        assert!(map.active_lines().is_empty());
        assert_eq!(map.marker_count(), 0);
        assert_eq!(map.line_add_count(), 1);
        assert_eq!(map.commands().len(), 4);
    }

    #[test]
    fn test_camera_updates_filtered() {
        let map = RecordingMapSurface::new();
        map.apply(MapCommand::SetCamera(CameraUpdate::neutral()));
        map.apply(MapCommand::RemoveLine(LayerId::PreviewRoute));
        map.apply(MapCommand::SetCamera(CameraUpdate::centered(LatLng::new(0.0, 0.0), 3.0)));

        assert_eq!(map.camera_update_count(), 2);
        assert_eq!(map.last_camera().unwrap().zoom, Some(3.0));
    }
}
