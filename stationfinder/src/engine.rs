//! The station map engine.
//!
//! Owns every controller plus the [`SessionContext`] and runs them as one
//! single-threaded, event-driven unit.
//!
//! # Architecture
//!
//! ```text
//!  SensorPlatform ──SensorEvent──┐
//!                                ▼
//!  UI / host ──────MapEvent──► StationMapEngine ──MapCommand──► MapSurface
//!                                │  ├─ SensorFusionEngine
//!                                │  ├─ FollowModeController
//!                                │  ├─ NavigationSessionController
//!                                │  ├─ PanelGestureController
//!                                │  └─ StationHighlightCoordinator
//!                                └──EngineSnapshot (watch)──► renderers
//! ```
//!
//! # Camera Ownership
//!
//! Follow mode, station focus and navigation never drive the camera at the
//! same time. Selecting a station or starting navigation forces follow mode
//! to Idle first.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::context::SessionContext;
use crate::error::{EngineError, NavigationError};
use crate::follow::{FollowMode, FollowModeController};
use crate::geo::LatLng;
use crate::highlight::StationHighlightCoordinator;
use crate::map::{CameraUpdate, MapCommand, MapGesture, MapSurface, MarkerId};
use crate::navigation::{
    DirectionsService, NavigationSessionController, SessionState, SpeechSynthesizer, VoiceAnnouncer,
};
use crate::panel::{PanelGestureController, PanelOutcome, PanelState, PanelVisualState};
use crate::sensor::{
    FusedFix, HeadingEstimate, SensorEvent, SensorFusionEngine, SensorKind, SensorPlatform,
    TrackingConsumer,
};
use crate::station::{Station, StationId, StationList};

/// Input to the engine from the host UI.
#[derive(Debug, Clone)]
pub enum MapEvent {
    /// Raw sensor event, normally delivered by a subscription.
    Sensor(SensorEvent),
    /// The user started moving the camera by hand.
    Gesture(MapGesture),
    /// The single follow-mode control button.
    ControlButton,
    SelectStation(StationId),
    ClearSelection,
    StartNavigation(StationId),
    StopNavigation,
    ToggleCameraLock,
    PanelDragStart(f64),
    PanelDragMove(f64),
    PanelDragEnd,
    StationsUpdated(StationList),
    RentalConfirmed(StationId),
    RequestPermission(SensorKind),
}

/// Progress of the navigation session as seen by renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationStatus {
    pub destination: StationId,
    pub state: SessionState,
    pub step_index: usize,
    pub instruction: Option<String>,
    pub distance_remaining_m: f64,
    pub eta_minutes: u32,
    pub camera_locked: bool,
}

/// Everything a renderer needs, computed once per update.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub follow_mode: FollowMode,
    pub panel: PanelState,
    pub panel_visual: PanelVisualState,
    pub selected: Option<StationId>,
    pub navigation: Option<NavigationStatus>,
    pub location: Option<LatLng>,
    pub heading: HeadingEstimate,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            follow_mode: FollowMode::Idle,
            panel: PanelState::default(),
            panel_visual: PanelVisualState::Collapsed,
            selected: None,
            navigation: None,
            location: None,
            heading: HeadingEstimate::unknown(),
        }
    }
}

/// Collaborators the engine talks to.
pub struct EngineDependencies {
    pub platform: Arc<dyn SensorPlatform>,
    pub directions: Arc<dyn DirectionsService>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub map: Arc<dyn MapSurface>,
}

pub struct StationMapEngine {
    config: EngineConfig,
    context: SessionContext,
    fusion: SensorFusionEngine,
    follow: FollowModeController,
    navigation: NavigationSessionController,
    panel: PanelGestureController,
    highlight: StationHighlightCoordinator,
    stations: StationList,
    map: Arc<dyn MapSurface>,
    sensor_rx: mpsc::UnboundedReceiver<SensorEvent>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
}

impl StationMapEngine {
    pub fn new(config: EngineConfig, deps: EngineDependencies, stations: StationList) -> Self {
        let (sensor_tx, sensor_rx) = mpsc::unbounded_channel();
        let fusion = SensorFusionEngine::new(config.fusion.clone(), deps.platform, sensor_tx);
        let context = SessionContext::new(
            config.map.theme,
            config.map.fallback_location,
            fusion.location_handle(),
        );
        let navigation = NavigationSessionController::new(
            config.navigation.clone(),
            config.directions.timeout,
            Arc::clone(&deps.directions),
            VoiceAnnouncer::new(deps.speech),
        );
        let highlight = StationHighlightCoordinator::new(
            config.highlight.clone(),
            deps.directions,
            config.directions.timeout,
            config.navigation.walking_speed_mps,
        );
        let (snapshot_tx, _) = watch::channel(EngineSnapshot::default());

        Self {
            follow: FollowModeController::new(config.follow.clone()),
            panel: PanelGestureController::new(config.panel.clone()),
            config,
            context,
            fusion,
            navigation,
            highlight,
            stations,
            map: deps.map,
            sensor_rx,
            snapshot_tx,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn fusion(&self) -> &SensorFusionEngine {
        &self.fusion
    }

    pub fn follow_mode(&self) -> FollowMode {
        self.follow.mode()
    }

    pub fn navigation(&self) -> &NavigationSessionController {
        &self.navigation
    }

    pub fn panel(&self) -> &PanelGestureController {
        &self.panel
    }

    pub fn highlight(&self) -> &StationHighlightCoordinator {
        &self.highlight
    }

    pub fn stations(&self) -> &StationList {
        &self.stations
    }

    /// Receiver of snapshots published after every handled event.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            follow_mode: self.follow.mode(),
            panel: self.panel.state(),
            panel_visual: self.panel.visual_state(),
            selected: self.highlight.selected().map(|s| s.id.clone()),
            navigation: self.navigation.session().map(|s| NavigationStatus {
                destination: s.destination().clone(),
                state: s.state(),
                step_index: s.current_step_index(),
                instruction: s.instruction().map(str::to_string),
                distance_remaining_m: s.distance_remaining_m(),
                eta_minutes: s.eta_minutes(),
                camera_locked: s.camera_locked(),
            }),
            location: self.fusion.latest().map(|fix| fix.sample.position()),
            heading: self.fusion.heading(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Startup and event loop
    // ─────────────────────────────────────────────────────────────────────

    /// Startup sequence: theme, permissions, station markers, first camera.
    ///
    /// Denied permissions are logged; the engine continues with the
    /// fallback coordinate and heading-less markers.
    pub async fn initialize(&mut self) {
        self.context.apply_theme(self.map.as_ref());

        for kind in [SensorKind::Location, SensorKind::Compass] {
            if let Err(e) = self.fusion.request_permission(kind).await {
                tracing::warn!(sensor = %kind, error = %e, "Continuing without sensor");
            }
        }

        self.render_station_markers();
        self.context
            .place_initial_camera(self.map.as_ref(), self.config.follow.center_zoom);
        self.publish();
    }

    /// Process host events and sensor events until `shutdown` fires or the
    /// host channel closes.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<MapEvent>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Station map engine started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::info!("Station map engine shutting down");
                    break;
                }

                Some(event) = self.sensor_rx.recv() => {
                    for event in self.latest_pending(Some(event)) {
                        self.on_sensor_event(event);
                    }
                }

                event = events.recv() => {
                    let Some(event) = event else { break };
                    if let Err(e) = self.handle(event).await {
                        tracing::warn!(error = %e, "Event failed");
                    }
                }
            }
        }

        self.fusion.stop();
        tracing::info!("Station map engine stopped");
    }

    /// Handle sensor events already delivered by open subscriptions.
    ///
    /// Only the newest pending event of each source is fused. Returns how
    /// many were processed.
    pub fn drain_sensor_events(&mut self) -> usize {
        let latest = self.latest_pending(None);
        for event in &latest {
            self.on_sensor_event(*event);
        }
        latest.len()
    }

    /// Collapse the pending sensor backlog to one event per source,
    /// orientation first so the location fix fuses the newest heading.
    fn latest_pending(&mut self, first: Option<SensorEvent>) -> Vec<SensorEvent> {
        let mut location = None;
        let mut orientation = None;
        let mut superseded = 0usize;

        let backlog = std::iter::from_fn(|| self.sensor_rx.try_recv().ok());
        for event in first.into_iter().chain(backlog) {
            let slot = match event {
                SensorEvent::Location(_) => &mut location,
                SensorEvent::Orientation(_) => &mut orientation,
            };
            if slot.replace(event).is_some() {
                superseded += 1;
            }
        }

        if superseded > 0 {
            tracing::debug!(superseded, "Dropped stale sensor samples");
        }
        orientation.into_iter().chain(location).collect()
    }

    /// Apply one host event.
    pub async fn handle(&mut self, event: MapEvent) -> Result<(), EngineError> {
        let result = match event {
            MapEvent::Sensor(event) => {
                self.on_sensor_event(event);
                Ok(())
            }
            MapEvent::Gesture(gesture) => {
                self.on_manual_gesture(gesture);
                Ok(())
            }
            MapEvent::ControlButton => {
                self.press_control();
                Ok(())
            }
            MapEvent::SelectStation(id) => self.select_station(&id).await,
            MapEvent::ClearSelection => {
                self.clear_selection();
                Ok(())
            }
            MapEvent::StartNavigation(id) => self.start_navigation(&id).await,
            MapEvent::StopNavigation => {
                self.stop_navigation();
                Ok(())
            }
            MapEvent::ToggleCameraLock => self.toggle_camera_lock().map(|_| ()),
            MapEvent::PanelDragStart(y) => {
                self.panel.drag_start(y);
                Ok(())
            }
            MapEvent::PanelDragMove(y) => {
                self.panel.drag_move(y);
                Ok(())
            }
            MapEvent::PanelDragEnd => {
                self.panel_drag_end();
                Ok(())
            }
            MapEvent::StationsUpdated(list) => {
                self.stations_updated(list);
                Ok(())
            }
            MapEvent::RentalConfirmed(id) => self.on_rental_confirmed(&id).await,
            MapEvent::RequestPermission(kind) => self.request_permission(kind).await,
        };
        self.publish();
        result
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sensors
    // ─────────────────────────────────────────────────────────────────────

    /// Fuse a sensor event and fan the fix out to the map and controllers.
    ///
    /// Location samples drive follow mode and navigation progress. A compass
    /// reading only turns the user marker, plus the camera in 3D follow.
    pub fn on_sensor_event(&mut self, event: SensorEvent) -> Option<FusedFix> {
        let fix = self.fusion.ingest(event)?;

        self.map.apply(MapCommand::PlaceMarker {
            id: MarkerId::User,
            position: fix.sample.position(),
            heading: fix.heading.is_known().then(|| fix.heading.degrees()),
        });
        match event {
            SensorEvent::Location(_) => {
                self.follow.on_fix(&fix, self.map.as_ref());
                self.navigation.on_fix(&fix, self.map.as_ref());
            }
            SensorEvent::Orientation(_) => self.follow.on_heading(&fix, self.map.as_ref()),
        }
        self.publish();
        Some(fix)
    }

    /// Ask again for a sensor permission.
    pub async fn request_permission(&mut self, kind: SensorKind) -> Result<(), EngineError> {
        self.fusion.request_permission(kind).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Follow mode
    // ─────────────────────────────────────────────────────────────────────

    pub fn press_control(&mut self) -> FollowMode {
        if self.navigation.is_active() {
            tracing::debug!("Control button ignored while navigating");
            return self.follow.mode();
        }
        let target = self.context.best_known_position();
        self.follow.press_control(target, &mut self.fusion, self.map.as_ref())
    }

    pub fn on_manual_gesture(&mut self, gesture: MapGesture) {
        self.follow
            .on_manual_gesture(gesture, &mut self.fusion, self.map.as_ref());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Station selection
    // ─────────────────────────────────────────────────────────────────────

    fn station(&self, id: &StationId) -> Result<Station, NavigationError> {
        self.stations
            .get(id)
            .cloned()
            .ok_or_else(|| NavigationError::UnknownStation(id.clone()))
    }

    fn current_position(&self) -> Option<LatLng> {
        self.fusion.latest().map(|fix| fix.sample.position())
    }

    /// Highlight a station, or re-target navigation to it when a route is
    /// being followed.
    pub async fn select_station(&mut self, id: &StationId) -> Result<(), EngineError> {
        if self.navigation.is_active() {
            tracing::info!(station = %id, "Selection during navigation re-targets the route");
            return self.start_navigation(id).await;
        }

        let station = self.station(id)?;
        let stale = self
            .navigation
            .session()
            .is_some_and(|session| session.destination() != id);
        if stale {
            // A session left in Planning belongs to the old destination
            self.navigation.stop(&mut self.fusion, self.map.as_ref());
        }

        self.follow.force_idle(&mut self.fusion, self.map.as_ref());
        let origin = self.current_position();
        self.highlight.select(&station, origin, self.map.as_ref()).await;
        self.panel.collapse();
        self.panel.set_dismissible(true);
        Ok(())
    }

    /// Drop the selection, stopping navigation tied to it.
    pub fn clear_selection(&mut self) {
        let tied_to_selection = match (self.highlight.selected(), self.navigation.session()) {
            (Some(selected), Some(session)) => &selected.id == session.destination(),
            _ => false,
        };
        if tied_to_selection {
            self.navigation.stop(&mut self.fusion, self.map.as_ref());
        }

        let recenter_on = self.context.best_known_position();
        self.highlight.clear(recenter_on, self.map.as_ref());
        self.panel.collapse();
        self.panel.set_dismissible(false);
    }

    fn panel_drag_end(&mut self) -> PanelOutcome {
        let outcome = self.panel.drag_end();
        if outcome == PanelOutcome::Dismissed {
            self.clear_selection();
        }
        outcome
    }

    /// Replace the station list and re-render markers.
    pub fn stations_updated(&mut self, list: StationList) {
        let removed: Vec<StationId> = self.stations.removed_in(&list).cloned().collect();
        for id in &removed {
            self.map.apply(MapCommand::RemoveMarker(MarkerId::Station(id.clone())));
        }
        self.stations = list;
        self.render_station_markers();
        tracing::info!(
            stations = self.stations.len(),
            removed = removed.len(),
            "Station list updated"
        );

        let Some(selected) = self.highlight.selected().map(|s| s.id.clone()) else {
            return;
        };
        match self.stations.get(&selected).cloned() {
            Some(station) => self.highlight.update_position(&station),
            None => {
                tracing::info!(station = %selected, "Selected station disappeared");
                self.clear_selection();
            }
        }
    }

    fn render_station_markers(&self) {
        for station in self.stations.iter() {
            self.map.apply(MapCommand::PlaceMarker {
                id: MarkerId::Station(station.id.clone()),
                position: station.position(),
                heading: None,
            });
        }
    }

    /// A rental was confirmed elsewhere; focus the station again.
    pub async fn on_rental_confirmed(&mut self, id: &StationId) -> Result<(), EngineError> {
        tracing::info!(station = %id, "Rental confirmed");
        if self.navigation.session().is_some() {
            self.stop_navigation();
        }
        self.select_station(id).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────

    /// Start (or re-target) navigation to a station.
    pub async fn start_navigation(&mut self, id: &StationId) -> Result<(), EngineError> {
        let station = self.station(id)?;

        // Hold the claim while follow mode lets go so the watch stays open
        self.fusion.acquire(TrackingConsumer::Navigation);
        self.follow.force_idle(&mut self.fusion, self.map.as_ref());
        self.highlight.mark(&station, self.map.as_ref());
        self.panel.set_dismissible(true);

        let origin = self.current_position();
        let result = self
            .navigation
            .start(&station, origin, &mut self.fusion, self.map.as_ref())
            .await;

        if result.is_err() && !self.navigation.is_active() {
            self.fusion.release(TrackingConsumer::Navigation);
        }
        result.map_err(EngineError::from)
    }

    /// Stop navigating and hand the camera back.
    pub fn stop_navigation(&mut self) {
        if self.navigation.stop(&mut self.fusion, self.map.as_ref()).is_none() {
            return;
        }
        if self.highlight.selected().is_some() {
            self.highlight.reframe(self.map.as_ref());
        } else {
            self.map.apply(MapCommand::SetCamera(CameraUpdate::neutral()));
        }
    }

    pub fn toggle_camera_lock(&mut self) -> Result<bool, EngineError> {
        let latest = self.fusion.latest();
        Ok(self.navigation.toggle_camera_lock(latest, self.map.as_ref())?)
    }
}

impl std::fmt::Debug for StationMapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationMapEngine")
            .field("follow", &self.follow)
            .field("navigation", &self.navigation)
            .field("panel", &self.panel)
            .field("highlight", &self.highlight)
            .field("stations", &self.stations.len())
            .finish()
    }
}
