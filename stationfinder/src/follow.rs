//! Follow mode: how the camera tracks the user.
//!
//! # State Machine
//!
//! ```text
//! Idle --control--> Centered --control--> Following2D --control--> Following3D --control--> Idle
//!   ▲                                                                                      │
//!   └──────────── manual drag / rotate / pitch, station selection, navigation ◄────────────┘
//! ```
//!
//! Centered is a one-shot fly-to and does not track. Both following states
//! hold the shared tracking claim and re-center on every fused fix.
//!
//! A manual camera gesture always wins over automatic following.

use crate::config::FollowConfig;
use crate::geo::LatLng;
use crate::map::{CameraUpdate, MapCommand, MapGesture, MapSurface};
use crate::sensor::{FusedFix, SensorFusionEngine, TrackingConsumer};

/// Camera tracking behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    /// Camera is free; no tracking.
    #[default]
    Idle,
    /// Camera was flown to the user once.
    Centered,
    /// Camera re-centers on every fix, north up, flat.
    Following2D,
    /// Camera re-centers on every fix, pitched, rotated to heading.
    Following3D,
}

impl FollowMode {
    /// State reached by pressing the control button once more.
    pub fn next(self) -> FollowMode {
        match self {
            FollowMode::Idle => FollowMode::Centered,
            FollowMode::Centered => FollowMode::Following2D,
            FollowMode::Following2D => FollowMode::Following3D,
            FollowMode::Following3D => FollowMode::Idle,
        }
    }

    pub fn is_following(self) -> bool {
        matches!(self, FollowMode::Following2D | FollowMode::Following3D)
    }
}

impl std::fmt::Display for FollowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FollowMode::Idle => write!(f, "idle"),
            FollowMode::Centered => write!(f, "centered"),
            FollowMode::Following2D => write!(f, "following-2d"),
            FollowMode::Following3D => write!(f, "following-3d"),
        }
    }
}

/// Owns the [`FollowMode`] and issues the matching camera commands.
#[derive(Debug, Default)]
pub struct FollowModeController {
    mode: FollowMode,
    config: FollowConfig,
}

impl FollowModeController {
    pub fn new(config: FollowConfig) -> Self {
        Self {
            mode: FollowMode::Idle,
            config,
        }
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    /// Handle the single control button.
    ///
    /// `target` is the last known location (or the fallback coordinate) used
    /// for the Centered fly-to.
    pub fn press_control(
        &mut self,
        target: LatLng,
        fusion: &mut SensorFusionEngine,
        map: &dyn MapSurface,
    ) -> FollowMode {
        let next = self.mode.next();

        match next {
            FollowMode::Centered => {
                map.apply(MapCommand::SetCamera(CameraUpdate::centered(
                    target,
                    self.config.center_zoom,
                )));
            }
            FollowMode::Following2D => {
                fusion.acquire(TrackingConsumer::FollowMode);
                map.apply(MapCommand::SetCamera(CameraUpdate::centered(
                    target,
                    self.config.follow_zoom,
                )));
            }
            FollowMode::Following3D => {
                let heading = fusion.heading().degrees();
                map.apply(MapCommand::SetCamera(
                    CameraUpdate::centered(target, self.config.follow_zoom)
                        .with_pitch(self.config.pitch_3d)
                        .with_bearing(heading),
                ));
            }
            FollowMode::Idle => {
                fusion.release(TrackingConsumer::FollowMode);
                map.apply(MapCommand::SetCamera(CameraUpdate::neutral()));
            }
        }

        self.transition(next, "control");
        next
    }

    /// Re-center on a new fix while following.
    pub fn on_fix(&self, fix: &FusedFix, map: &dyn MapSurface) {
        let center = fix.sample.position();
        let update = match self.mode {
            FollowMode::Following2D => CameraUpdate::centered(center, self.config.follow_zoom),
            FollowMode::Following3D => self.heading_up(fix),
            FollowMode::Idle | FollowMode::Centered => return,
        };
        map.apply(MapCommand::SetCamera(update));
    }

    /// Re-bear the camera after a compass-only heading change.
    ///
    /// Only the heading-up 3D mode reacts; position-driven modes wait for
    /// the next location sample.
    pub fn on_heading(&self, fix: &FusedFix, map: &dyn MapSurface) {
        if self.mode == FollowMode::Following3D {
            map.apply(MapCommand::SetCamera(self.heading_up(fix)));
        }
    }

    fn heading_up(&self, fix: &FusedFix) -> CameraUpdate {
        CameraUpdate::centered(fix.sample.position(), self.config.follow_zoom)
            .with_pitch(self.config.pitch_3d)
            .with_bearing(fix.heading.degrees())
    }

    /// A user-initiated camera gesture cancels any following.
    pub fn on_manual_gesture(
        &mut self,
        gesture: MapGesture,
        fusion: &mut SensorFusionEngine,
        map: &dyn MapSurface,
    ) {
        if self.mode == FollowMode::Idle {
            return;
        }
        tracing::debug!(gesture = %gesture, "Manual camera gesture cancels follow mode");
        self.force_idle(fusion, map);
    }

    /// Return to Idle, stopping tracking and easing the camera to neutral.
    ///
    /// Used when another owner (station focus, navigation) takes the camera.
    pub fn force_idle(&mut self, fusion: &mut SensorFusionEngine, map: &dyn MapSurface) {
        if self.mode == FollowMode::Idle {
            return;
        }
        if self.mode.is_following() {
            fusion.release(TrackingConsumer::FollowMode);
        }
        if self.mode == FollowMode::Following3D {
            map.apply(MapCommand::SetCamera(CameraUpdate::neutral()));
        }
        self.transition(FollowMode::Idle, "forced");
    }

    fn transition(&mut self, to: FollowMode, reason: &'static str) {
        let from = self.mode;
        self.mode = to;
        tracing::info!(from = %from, to = %to, reason, "Follow mode transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FusionConfig;
    use crate::map::RecordingMapSurface;
    use crate::sensor::{LocationSample, ManualSensorPlatform, SensorKind};
    use proptest::prelude::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Fixture {
        controller: FollowModeController,
        fusion: SensorFusionEngine,
        platform: Arc<ManualSensorPlatform>,
        map: RecordingMapSurface,
    }

    fn fixture() -> Fixture {
        let platform = Arc::new(ManualSensorPlatform::granting());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut fusion = SensorFusionEngine::new(FusionConfig::default(), platform.clone(), tx);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            fusion.request_permission(SensorKind::Location).await.unwrap();
        });

        Fixture {
            controller: FollowModeController::new(FollowConfig::default()),
            fusion,
            platform,
            map: RecordingMapSurface::new(),
        }
    }

    fn here() -> LatLng {
        LatLng::new(52.52, 13.405)
    }

    #[test]
    fn test_full_cycle() {
        let mut f = fixture();

        let modes: Vec<FollowMode> = (0..4)
            .map(|_| f.controller.press_control(here(), &mut f.fusion, &f.map))
            .collect();
        assert_eq!(
            modes,
            vec![
                FollowMode::Centered,
                FollowMode::Following2D,
                FollowMode::Following3D,
                FollowMode::Idle
            ]
        );
        assert!(!f.fusion.is_tracking());
    }

    #[test]
    fn test_centered_does_not_track() {
        let mut f = fixture();
        f.controller.press_control(here(), &mut f.fusion, &f.map);

        assert!(!f.fusion.is_tracking());
        let camera = f.map.last_camera().unwrap();
        assert_eq!(camera.center, Some(here()));
        assert_eq!(camera.bearing, Some(0.0));
        assert_eq!(camera.pitch, Some(0.0));
    }

    #[test]
    fn test_following_tracks_and_recenters() {
        let mut f = fixture();
        f.controller.press_control(here(), &mut f.fusion, &f.map);
        f.controller.press_control(here(), &mut f.fusion, &f.map);
        assert!(f.fusion.is_tracking());
        assert_eq!(f.platform.active_subscriptions(SensorKind::Location), 1);

        let moved = here().offset_meters(20.0, 0.0);
        let fix = f.fusion.ingest_location(LocationSample::at(moved, 1_000));
        f.controller.on_fix(&fix, &f.map);
        assert_eq!(f.map.last_camera().unwrap().center, Some(moved));
    }

    #[test]
    fn test_3d_rotates_to_heading() {
        let mut f = fixture();
        for _ in 0..3 {
            f.controller.press_control(here(), &mut f.fusion, &f.map);
        }
        let fix = f
            .fusion
            .ingest_location(LocationSample::at(here(), 1_000).with_gps_heading(135.0));
        f.controller.on_fix(&fix, &f.map);

        let camera = f.map.last_camera().unwrap();
        assert_eq!(camera.bearing, Some(135.0));
        assert_eq!(camera.pitch, Some(FollowConfig::default().pitch_3d));
    }

    #[test]
    fn test_on_fix_ignored_when_not_following() {
        let mut f = fixture();
        f.controller.press_control(here(), &mut f.fusion, &f.map);
        let before = f.map.camera_update_count();

        let fix = f.fusion.ingest_location(LocationSample::at(here(), 1_000));
        f.controller.on_fix(&fix, &f.map);
        assert_eq!(f.map.camera_update_count(), before);
    }

    #[test]
    fn test_gesture_cancels_following() {
        let mut f = fixture();
        for _ in 0..3 {
            f.controller.press_control(here(), &mut f.fusion, &f.map);
        }
        assert_eq!(f.controller.mode(), FollowMode::Following3D);

        f.controller.on_manual_gesture(MapGesture::Rotate, &mut f.fusion, &f.map);
        assert_eq!(f.controller.mode(), FollowMode::Idle);
        assert!(!f.fusion.is_tracking());
        assert_eq!(f.map.last_camera().unwrap(), CameraUpdate::neutral());
    }

    proptest! {
        #[test]
        fn test_presses_cycle_and_gestures_force_idle(
            ops in proptest::collection::vec(prop_oneof![Just(None), Just(Some(MapGesture::Drag)),
                Just(Some(MapGesture::Rotate)), Just(Some(MapGesture::Pitch))], 1..30)
        ) {
            let mut f = fixture();
            let mut expected = FollowMode::Idle;
            for op in ops {
                match op {
                    None => {
                        let mode = f.controller.press_control(here(), &mut f.fusion, &f.map);
                        expected = expected.next();
                        prop_assert_eq!(mode, expected);
                    }
                    Some(gesture) => {
                        f.controller.on_manual_gesture(gesture, &mut f.fusion, &f.map);
                        expected = FollowMode::Idle;
                        prop_assert_eq!(f.controller.mode(), FollowMode::Idle);
                    }
                }
                prop_assert_eq!(f.fusion.is_tracking(), expected.is_following());
                prop_assert!(f.platform.active_subscriptions(SensorKind::Location) <= 1);
            }
        }
    }
}
