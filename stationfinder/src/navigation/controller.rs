//! Navigation session lifecycle and progress tracking.
//!
//! # State Machine
//!
//! ```text
//!            start(station)
//!   (none) ───────────────► Planning ──route ok──► Active ──within arrival──► Arrived
//!                              │                     │                          │
//!                              └─route failed        └────────── stop() ────────┴──► Cancelled (discarded)
//!                                (stays Planning)
//! ```
//!
//! Starting a new session while one exists tears down the old route overlay
//! and voice queue first. The location subscription is shared with follow
//! mode through the [`TrackingConsumer::Navigation`] claim, so a restart
//! reuses the open watch instead of opening a second one.

use std::sync::Arc;
use std::time::Duration;

use super::directions::DirectionsService;
use super::session::{NavigationSession, SessionState};
use super::voice::VoiceAnnouncer;
use crate::config::NavigationConfig;
use crate::error::{DirectionsError, NavigationError};
use crate::geo::LatLng;
use crate::map::{CameraUpdate, LayerId, MapCommand, MapSurface};
use crate::sensor::{FusedFix, SensorFusionEngine, TrackingConsumer};
use crate::station::{Station, StationId};

/// Outcome of feeding one fused fix into an active session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub distance_remaining_m: f64,
    pub eta_minutes: u32,
    pub step_index: usize,
    /// The step index moved forward on this fix.
    pub advanced: bool,
    /// The session crossed the arrival threshold on this fix.
    pub arrived: bool,
}

/// Owns the (at most one) [`NavigationSession`].
pub struct NavigationSessionController {
    config: NavigationConfig,
    route_timeout: Duration,
    directions: Arc<dyn DirectionsService>,
    voice: VoiceAnnouncer,
    session: Option<NavigationSession>,
}

impl NavigationSessionController {
    pub fn new(
        config: NavigationConfig,
        route_timeout: Duration,
        directions: Arc<dyn DirectionsService>,
        voice: VoiceAnnouncer,
    ) -> Self {
        Self {
            config,
            route_timeout,
            directions,
            voice,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> Option<SessionState> {
        self.session.as_ref().map(NavigationSession::state)
    }

    /// Whether a route is being followed (Active or Arrived).
    pub fn is_active(&self) -> bool {
        matches!(self.state(), Some(SessionState::Active | SessionState::Arrived))
    }

    pub fn voice(&self) -> &VoiceAnnouncer {
        &self.voice
    }

    /// Start navigating to `station` from `origin`.
    ///
    /// Any existing session is replaced. On a route failure the new session
    /// stays in Planning, nothing is drawn and the navigation tracking claim
    /// is released.
    pub async fn start(
        &mut self,
        station: &Station,
        origin: Option<LatLng>,
        fusion: &mut SensorFusionEngine,
        map: &dyn MapSurface,
    ) -> Result<(), NavigationError> {
        let origin = origin.ok_or(NavigationError::NoLocation)?;
        let destination = station.position();

        if let Some(old) = self.session.take() {
            tracing::info!(
                from = %old.destination,
                to = %station.id,
                "Replacing navigation session"
            );
            self.tear_down(&old, map);
        }

        fusion.acquire(TrackingConsumer::Navigation);
        self.session = Some(NavigationSession::planning(
            station.id.clone(),
            station.name.clone(),
            destination,
            origin,
        ));
        tracing::info!(station = %station.id, "Navigation planning");

        let route = match tokio::time::timeout(
            self.route_timeout,
            self.directions.walking_route(origin, destination),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DirectionsError::Timeout(self.route_timeout.as_millis() as u64)),
        };

        let route = match route {
            Ok(route) => route,
            Err(source) => {
                fusion.release(TrackingConsumer::Navigation);
                tracing::warn!(station = %station.id, error = %source, "Route unavailable");
                return Err(NavigationError::RouteUnavailable {
                    station: station.id.clone(),
                    source,
                });
            }
        };

        map.apply(MapCommand::AddLine {
            layer: LayerId::NavigationRoute,
            geometry: route.geometry.clone(),
        });
        map.apply(MapCommand::SetCamera(CameraUpdate::centered(origin, self.config.zoom)));

        let Some(session) = self.session.as_mut() else {
            return Err(NavigationError::NotNavigating);
        };
        session.eta_minutes =
            route.eta_minutes(session.distance_remaining_m, self.config.walking_speed_mps);
        session.route = Some(route);
        Self::transition(session, SessionState::Active);

        if let Some(instruction) = session.instruction() {
            self.voice.announce(instruction);
        }
        Ok(())
    }

    /// Advance the session with a new fused fix.
    ///
    /// Returns `None` when no session is following a route.
    pub fn on_fix(&mut self, fix: &FusedFix, map: &dyn MapSurface) -> Option<ProgressUpdate> {
        let session = self.session.as_mut()?;
        if !matches!(session.state, SessionState::Active | SessionState::Arrived) {
            return None;
        }
        let route = session.route.as_ref()?;

        let position = fix.sample.position();
        session.distance_remaining_m = position.distance_to(&session.destination_position);
        session.eta_minutes =
            route.eta_minutes(session.distance_remaining_m, self.config.walking_speed_mps);

        if !session.camera_locked {
            let mut update = CameraUpdate::centered(position, self.config.zoom);
            if self.config.rotate_with_heading && fix.heading.is_known() {
                update = update.with_bearing(fix.heading.degrees());
            }
            map.apply(MapCommand::SetCamera(update));
        }

        let mut advanced = false;
        while let Some(next) = route.steps.get(session.current_step_index + 1) {
            if position.distance_to(&next.anchor) > self.config.step_advance_radius_m {
                break;
            }
            session.current_step_index += 1;
            advanced = true;
        }
        if advanced {
            tracing::info!(
                step = session.current_step_index,
                distance_m = session.distance_remaining_m,
                "Navigation step advanced"
            );
            if let Some(instruction) = session.instruction() {
                self.voice.announce(instruction);
            }
        }

        let mut arrived = false;
        if session.state == SessionState::Active
            && session.distance_remaining_m <= self.config.arrival_threshold_m
        {
            Self::transition(session, SessionState::Arrived);
            arrived = true;
            if self.config.announce_arrival {
                self.voice
                    .announce(&format!("You have arrived at {}", session.destination_name));
            }
        }

        tracing::debug!(
            distance_m = session.distance_remaining_m,
            eta_min = session.eta_minutes,
            step = session.current_step_index,
            "Navigation progress"
        );

        Some(ProgressUpdate {
            distance_remaining_m: session.distance_remaining_m,
            eta_minutes: session.eta_minutes,
            step_index: session.current_step_index,
            advanced,
            arrived,
        })
    }

    /// Switch between a fixed camera and one that follows progress.
    ///
    /// Never touches the location subscription. Unlocking re-centers on
    /// `latest` right away. Returns whether the camera is now locked.
    pub fn toggle_camera_lock(
        &mut self,
        latest: Option<FusedFix>,
        map: &dyn MapSurface,
    ) -> Result<bool, NavigationError> {
        let session = self
            .session
            .as_mut()
            .filter(|s| matches!(s.state, SessionState::Active | SessionState::Arrived))
            .ok_or(NavigationError::NotNavigating)?;

        session.camera_locked = !session.camera_locked;
        tracing::info!(locked = session.camera_locked, "Navigation camera lock toggled");

        if !session.camera_locked {
            if let Some(fix) = latest {
                map.apply(MapCommand::SetCamera(CameraUpdate::centered(
                    fix.sample.position(),
                    self.config.zoom,
                )));
            }
        }
        Ok(session.camera_locked)
    }

    /// End the session and discard it.
    ///
    /// Returns the destination of the stopped session, if there was one.
    pub fn stop(
        &mut self,
        fusion: &mut SensorFusionEngine,
        map: &dyn MapSurface,
    ) -> Option<StationId> {
        let mut session = self.session.take()?;
        self.tear_down(&session, map);
        Self::transition(&mut session, SessionState::Cancelled);
        fusion.release(TrackingConsumer::Navigation);
        Some(session.destination)
    }

    fn tear_down(&self, session: &NavigationSession, map: &dyn MapSurface) {
        if session.route.is_some() {
            map.apply(MapCommand::RemoveLine(LayerId::NavigationRoute));
        }
        self.voice.silence();
    }

    fn transition(session: &mut NavigationSession, to: SessionState) {
        let from = session.state;
        session.state = to;
        tracing::info!(
            station = %session.destination,
            from = %from,
            to = %to,
            "Navigation session transition"
        );
    }
}

impl std::fmt::Debug for NavigationSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationSessionController")
            .field("session", &self.session)
            .field("voice", &self.voice)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FusionConfig;
    use crate::map::RecordingMapSurface;
    use crate::navigation::directions::StaticDirections;
    use crate::navigation::route::{Route, RouteStep};
    use crate::navigation::voice::SpeechSynthesizer;
    use crate::sensor::{LocationSample, ManualSensorPlatform, SensorKind};
    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct CountingSpeech {
        spoken: Mutex<Vec<String>>,
    }

    impl CountingSpeech {
        fn spoken(&self) -> Vec<String> {
            self.spoken.lock().clone()
        }
    }

    impl SpeechSynthesizer for CountingSpeech {
        fn speak(&self, text: &str) {
            self.spoken.lock().push(text.to_string());
        }

        fn cancel(&self) {}
    }

    struct NeverDirections;

    impl DirectionsService for NeverDirections {
        fn walking_route(
            &self,
            _o: LatLng,
            _d: LatLng,
        ) -> BoxFuture<'_, Result<Route, DirectionsError>> {
            Box::pin(futures::future::pending())
        }
    }

    fn origin() -> LatLng {
        LatLng::new(52.52, 13.405)
    }

    fn station(id: &str, north_m: f64) -> Station {
        let p = origin().offset_meters(north_m, 0.0);
        Station {
            id: StationId::from(id),
            name: format!("Station {}", id),
            lat: p.lat,
            lng: p.lng,
            available_units: 3,
            address: None,
        }
    }

    /// Straight walk north with a step every 100 m.
    fn straight_route(length_m: f64) -> Route {
        let anchors: Vec<LatLng> = (0..=((length_m / 100.0) as usize))
            .map(|i| origin().offset_meters(i as f64 * 100.0, 0.0))
            .collect();
        Route {
            geometry: anchors.clone(),
            total_distance_m: length_m,
            total_duration_s: length_m / 1.4,
            steps: anchors
                .iter()
                .enumerate()
                .map(|(i, a)| RouteStep::new(format!("Step {}", i), *a))
                .collect(),
        }
    }

    struct Fixture {
        controller: NavigationSessionController,
        fusion: SensorFusionEngine,
        platform: Arc<ManualSensorPlatform>,
        map: RecordingMapSurface,
        speech: Arc<CountingSpeech>,
    }

    async fn fixture_with(directions: Arc<dyn DirectionsService>) -> Fixture {
        let platform = Arc::new(ManualSensorPlatform::granting());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut fusion = SensorFusionEngine::new(FusionConfig::default(), platform.clone(), tx);
        fusion.request_permission(SensorKind::Location).await.unwrap();

        let speech = Arc::new(CountingSpeech::default());
        let controller = NavigationSessionController::new(
            NavigationConfig::default(),
            Duration::from_secs(10),
            directions,
            VoiceAnnouncer::new(speech.clone()),
        );
        Fixture {
            controller,
            fusion,
            platform,
            map: RecordingMapSurface::new(),
            speech,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(StaticDirections::new(Ok(straight_route(300.0))))).await
    }

    fn fix_at(f: &mut Fixture, north_m: f64, t: u64) -> FusedFix {
        f.fusion
            .ingest_location(LocationSample::at(origin().offset_meters(north_m, 0.0), t))
    }

    #[tokio::test]
    async fn test_start_requires_location() {
        let mut f = fixture().await;
        let result = f
            .controller
            .start(&station("a", 300.0), None, &mut f.fusion, &f.map)
            .await;
        assert_eq!(result, Err(NavigationError::NoLocation));
        assert!(f.controller.session().is_none());
        assert!(!f.fusion.is_tracking());
    }

    #[tokio::test]
    async fn test_start_activates_and_announces_first_step() {
        let mut f = fixture().await;
        f.controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await
            .unwrap();

        let session = f.controller.session().unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.instruction(), Some("Step 0"));
        assert_eq!(f.speech.spoken(), vec!["Step 0".to_string()]);
        assert!(f.map.active_lines().contains(&LayerId::NavigationRoute));
        assert!(f.fusion.is_claimed_by(TrackingConsumer::Navigation));

        let camera = f.map.last_camera().unwrap();
        assert_eq!(camera.zoom, Some(NavigationConfig::default().zoom));
        assert_eq!(camera.bearing, Some(0.0));
    }

    #[tokio::test]
    async fn test_route_failure_stays_planning() {
        let directions = StaticDirections::new(Err(DirectionsError::NoRoute));
        let mut f = fixture_with(Arc::new(directions)).await;
        let result = f
            .controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await;

        assert!(matches!(
            result,
            Err(NavigationError::RouteUnavailable {
                source: DirectionsError::NoRoute,
                ..
            })
        ));
        assert_eq!(f.controller.state(), Some(SessionState::Planning));
        assert!(f.map.active_lines().is_empty());
        assert!(!f.fusion.is_tracking());
        assert!(f.speech.spoken().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_fetch_is_bounded() {
        let mut f = fixture_with(Arc::new(NeverDirections)).await;
        let result = f
            .controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await;

        assert!(matches!(
            result,
            Err(NavigationError::RouteUnavailable {
                source: DirectionsError::Timeout(10_000),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_each_step_spoken_once() {
        let mut f = fixture().await;
        f.controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await
            .unwrap();

        let mut t = 0;
        for _ in 0..50 {
            t += 100;
            let fix = fix_at(&mut f, 95.0, t);
            f.controller.on_fix(&fix, &f.map);
        }
        assert_eq!(f.speech.spoken(), vec!["Step 0".to_string(), "Step 1".to_string()]);
        assert_eq!(f.controller.session().unwrap().current_step_index(), 1);
    }

    #[tokio::test]
    async fn test_distance_decreases_and_arrival_fires_once() {
        let mut f = fixture().await;
        f.controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await
            .unwrap();

        let mut previous = f64::INFINITY;
        let mut arrivals = 0;
        for i in 1..=40 {
            let fix = fix_at(&mut f, i as f64 * 10.0, i * 1_000);
            let update = f.controller.on_fix(&fix, &f.map).unwrap();
            if i <= 30 {
                assert!(update.distance_remaining_m < previous);
            }
            previous = update.distance_remaining_m;
            if update.arrived {
                arrivals += 1;
            }
        }

        assert_eq!(arrivals, 1);
        assert_eq!(f.controller.state(), Some(SessionState::Arrived));
        let spoken = f.speech.spoken();
        assert_eq!(
            spoken.iter().filter(|s| s.starts_with("You have arrived")).count(),
            1
        );
        assert!(spoken.contains(&"You have arrived at Station a".to_string()));
    }

    #[tokio::test]
    async fn test_locked_camera_keeps_tracking() {
        let mut f = fixture().await;
        f.controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await
            .unwrap();

        assert_eq!(f.controller.toggle_camera_lock(None, &f.map), Ok(true));
        let before = f.map.camera_update_count();
        for i in 1..5 {
            let fix = fix_at(&mut f, i as f64 * 5.0, i * 1_000);
            assert!(f.controller.on_fix(&fix, &f.map).is_some());
        }
        assert_eq!(f.map.camera_update_count(), before);
        assert!(f.fusion.is_tracking());

        let latest = f.fusion.latest();
        assert_eq!(f.controller.toggle_camera_lock(latest, &f.map), Ok(false));
        assert_eq!(
            f.map.last_camera().unwrap().center,
            Some(origin().offset_meters(20.0, 0.0))
        );
        assert!(f.fusion.is_tracking());
    }

    #[tokio::test]
    async fn test_toggle_without_session() {
        let mut f = fixture().await;
        assert_eq!(
            f.controller.toggle_camera_lock(None, &f.map),
            Err(NavigationError::NotNavigating)
        );
    }

    #[tokio::test]
    async fn test_restart_keeps_single_overlay_and_subscription() {
        let mut f = fixture().await;
        f.controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await
            .unwrap();
        f.controller
            .start(&station("b", 200.0), Some(origin()), &mut f.fusion, &f.map)
            .await
            .unwrap();

        assert_eq!(f.controller.session().unwrap().destination(), &StationId::from("b"));
        assert_eq!(f.map.active_lines().len(), 1);
        assert_eq!(f.map.line_add_count(), 2);
        assert_eq!(f.platform.active_subscriptions(SensorKind::Location), 1);
        assert_eq!(f.platform.opened_subscriptions(SensorKind::Location), 1);
    }

    #[tokio::test]
    async fn test_stop_discards_session() {
        let mut f = fixture().await;
        f.controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await
            .unwrap();

        assert_eq!(f.controller.stop(&mut f.fusion, &f.map), Some(StationId::from("a")));
        assert!(f.controller.session().is_none());
        assert!(f.map.active_lines().is_empty());
        assert!(!f.fusion.is_tracking());
        assert_eq!(f.controller.stop(&mut f.fusion, &f.map), None);
    }

    #[tokio::test]
    async fn test_stop_keeps_follow_claim() {
        let mut f = fixture().await;
        f.fusion.acquire(TrackingConsumer::FollowMode);
        f.controller
            .start(&station("a", 300.0), Some(origin()), &mut f.fusion, &f.map)
            .await
            .unwrap();

        f.controller.stop(&mut f.fusion, &f.map);
        assert!(f.fusion.is_tracking());
    }
}
