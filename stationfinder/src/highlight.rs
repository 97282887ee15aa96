//! Selected station highlight and camera framing.
//!
//! The coordinator only remembers which station is selected (by id) and
//! where it was last seen. It frames the camera with a fixed vertical offset
//! so the station stays visible above the collapsed panel, and draws a
//! display-only route preview when a location is known.
//!
//! Re-targeting an active navigation session and forcing follow mode to
//! Idle are done by the engine before calling [`StationHighlightCoordinator::select`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::HighlightConfig;
use crate::error::DirectionsError;
use crate::geo::LatLng;
use crate::map::{CameraUpdate, LayerId, MapCommand, MapSurface, MarkerId};
use crate::navigation::DirectionsService;
use crate::station::{Station, StationId};

/// Weak reference to the highlighted station.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedStation {
    pub id: StationId,
    pub name: String,
    pub position: LatLng,
}

impl From<&Station> for SelectedStation {
    fn from(station: &Station) -> Self {
        Self {
            id: station.id.clone(),
            name: station.name.clone(),
            position: station.position(),
        }
    }
}

/// Display-only route summary for the selected station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePreview {
    pub distance_m: f64,
    pub eta_minutes: u32,
}

pub struct StationHighlightCoordinator {
    config: HighlightConfig,
    directions: Arc<dyn DirectionsService>,
    route_timeout: Duration,
    walking_speed_mps: f64,
    selected: Option<SelectedStation>,
    preview: Option<RoutePreview>,
}

impl StationHighlightCoordinator {
    pub fn new(
        config: HighlightConfig,
        directions: Arc<dyn DirectionsService>,
        route_timeout: Duration,
        walking_speed_mps: f64,
    ) -> Self {
        Self {
            config,
            directions,
            route_timeout,
            walking_speed_mps,
            selected: None,
            preview: None,
        }
    }

    pub fn selected(&self) -> Option<&SelectedStation> {
        self.selected.as_ref()
    }

    pub fn preview(&self) -> Option<RoutePreview> {
        self.preview
    }

    /// Highlight `station` and frame the camera on it.
    ///
    /// With a known `origin` a walking route is fetched for display. A failed
    /// preview is logged and otherwise ignored.
    pub async fn select(
        &mut self,
        station: &Station,
        origin: Option<LatLng>,
        map: &dyn MapSurface,
    ) {
        self.mark(station, map);
        self.reframe(map);

        if let Some(origin) = origin {
            match self.fetch_preview(origin, station.position()).await {
                Ok((preview, geometry)) => {
                    map.apply(MapCommand::AddLine {
                        layer: LayerId::PreviewRoute,
                        geometry,
                    });
                    self.preview = Some(preview);
                }
                Err(e) => {
                    tracing::warn!(station = %station.id, error = %e, "Route preview unavailable");
                }
            }
        }
    }

    async fn fetch_preview(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> Result<(RoutePreview, Vec<LatLng>), DirectionsError> {
        let request = self.directions.walking_route(origin, destination);
        let route = tokio::time::timeout(self.route_timeout, request)
            .await
            .map_err(|_| DirectionsError::Timeout(self.route_timeout.as_millis() as u64))??;

        let preview = RoutePreview {
            distance_m: route.total_distance_m,
            eta_minutes: route.eta_minutes(route.total_distance_m, self.walking_speed_mps),
        };
        Ok((preview, route.geometry))
    }

    /// Make `station` the selection and place the highlight marker without
    /// moving the camera.
    pub fn mark(&mut self, station: &Station, map: &dyn MapSurface) {
        self.hide_preview(map);
        let selected = SelectedStation::from(station);
        tracing::info!(station = %selected.id, name = %selected.name, "Station selected");
        map.apply(MapCommand::PlaceMarker {
            id: MarkerId::Highlight,
            position: selected.position,
            heading: None,
        });
        self.selected = Some(selected);
    }

    /// Frame the camera on the selection, offset above the panel.
    pub fn reframe(&self, map: &dyn MapSurface) {
        let Some(selected) = &self.selected else {
            return;
        };
        map.apply(MapCommand::SetCamera(
            CameraUpdate::centered(selected.position, self.config.zoom)
                .with_offset(0.0, -self.config.vertical_offset_px),
        ));
    }

    /// Remove the display-only route, keeping the selection.
    pub fn hide_preview(&mut self, map: &dyn MapSurface) {
        if self.preview.take().is_some() {
            map.apply(MapCommand::RemoveLine(LayerId::PreviewRoute));
        }
    }

    /// Drop the selection and re-center on `recenter_on`.
    pub fn clear(&mut self, recenter_on: LatLng, map: &dyn MapSurface) -> Option<SelectedStation> {
        let selected = self.selected.take()?;
        self.hide_preview(map);
        map.apply(MapCommand::RemoveMarker(MarkerId::Highlight));
        map.apply(MapCommand::SetCamera(CameraUpdate::centered(recenter_on, self.config.zoom)));
        tracing::info!(station = %selected.id, "Station selection cleared");
        Some(selected)
    }

    /// Follow a station's new coordinate after the list was refreshed.
    pub fn update_position(&mut self, station: &Station) {
        if let Some(selected) = self.selected.as_mut().filter(|s| s.id == station.id) {
            selected.position = station.position();
            selected.name = station.name.clone();
        }
    }
}

impl std::fmt::Debug for StationHighlightCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationHighlightCoordinator")
            .field("selected", &self.selected)
            .field("preview", &self.preview)
            .finish()
    }
}
