//! Sensor fusion: one location and one heading from several sources.
//!
//! # Heading Priority
//!
//! Re-evaluated on every sample, first match wins:
//!
//! ```text
//! 1. Compass        compass permission granted AND reading within max age
//! 2. GpsHeading     sample carries a finite GPS heading
//! 3. Movement       moving >= speed threshold since previous sample
//! 4. (retain)       previous estimate; Unknown only before any estimate
//! ```
//!
//! # Tracking Claims
//!
//! Follow mode and navigation both need live location. Each holds a
//! [`TrackingConsumer`] claim; the first claim opens the platform watches and
//! the last release closes them. A second claim never opens a second watch.
//!
//! # Shared Value
//!
//! The latest [`FusedFix`] is published on a `watch` channel. Only this
//! engine writes it; everything else reads through [`LocationHandle`].

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::movement::{MovementConfig, MovementTracker};
use super::permission::{PermissionState, PermissionTracker};
use super::platform::{SensorPlatform, Subscription};
use super::types::{
    HeadingEstimate, HeadingSource, LocationSample, OrientationReading, SensorEvent, SensorKind,
};
use crate::config::FusionConfig;
use crate::error::SensorError;

/// A location sample together with the heading fused at that instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedFix {
    pub sample: LocationSample,
    pub heading: HeadingEstimate,
}

/// Read-only view of the latest fused fix.
#[derive(Debug, Clone)]
pub struct LocationHandle {
    rx: watch::Receiver<Option<FusedFix>>,
}

impl LocationHandle {
    /// Create a writer/reader pair. The writer belongs to the fusion engine.
    pub fn channel() -> (watch::Sender<Option<FusedFix>>, LocationHandle) {
        let (tx, rx) = watch::channel(None);
        (tx, LocationHandle { rx })
    }

    /// Latest fix, if any has been produced.
    pub fn latest(&self) -> Option<FusedFix> {
        *self.rx.borrow()
    }

    /// Wait for the next published fix.
    ///
    /// Returns `None` once the fusion engine is gone.
    pub async fn changed(&mut self) -> Option<FusedFix> {
        self.rx.changed().await.ok()?;
        *self.rx.borrow_and_update()
    }
}

/// Components that may hold the shared tracking subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingConsumer {
    FollowMode,
    Navigation,
}

/// Merges location and orientation streams into fused fixes.
pub struct SensorFusionEngine {
    config: FusionConfig,
    platform: Arc<dyn SensorPlatform>,
    events_tx: mpsc::UnboundedSender<SensorEvent>,

    location_permission: PermissionTracker,
    compass_permission: PermissionTracker,

    location_subscription: Option<Subscription>,
    orientation_subscription: Option<Subscription>,
    consumers: HashSet<TrackingConsumer>,

    latest_orientation: Option<OrientationReading>,
    latest_sample: Option<LocationSample>,
    movement: MovementTracker,
    heading: HeadingEstimate,

    shared: watch::Sender<Option<FusedFix>>,
    handle: LocationHandle,
}

impl std::fmt::Debug for SensorFusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorFusionEngine")
            .field("location_permission", &self.location_permission.state())
            .field("compass_permission", &self.compass_permission.state())
            .field("consumers", &self.consumers)
            .field("heading", &self.heading)
            .finish()
    }
}

impl SensorFusionEngine {
    /// Create an engine delivering raw events to `events_tx`.
    pub fn new(
        config: FusionConfig,
        platform: Arc<dyn SensorPlatform>,
        events_tx: mpsc::UnboundedSender<SensorEvent>,
    ) -> Self {
        let (shared, handle) = LocationHandle::channel();
        let movement = MovementTracker::with_config(MovementConfig {
            min_speed_mps: config.movement_speed_threshold,
            ..Default::default()
        });

        Self {
            config,
            platform,
            events_tx,
            location_permission: PermissionTracker::new(SensorKind::Location),
            compass_permission: PermissionTracker::new(SensorKind::Compass),
            location_subscription: None,
            orientation_subscription: None,
            consumers: HashSet::new(),
            latest_orientation: None,
            latest_sample: None,
            movement,
            heading: HeadingEstimate::unknown(),
            shared,
            handle,
        }
    }

    /// Read-only handle on the fused location.
    pub fn location_handle(&self) -> LocationHandle {
        self.handle.clone()
    }

    pub fn latest(&self) -> Option<FusedFix> {
        self.handle.latest()
    }

    pub fn heading(&self) -> HeadingEstimate {
        self.heading
    }

    pub fn permission(&self, kind: SensorKind) -> PermissionState {
        self.tracker(kind).state()
    }

    /// Distance covered by the recorded samples, in meters.
    pub fn walked_meters(&self) -> f64 {
        self.movement.walked_meters()
    }

    fn tracker(&self, kind: SensorKind) -> &PermissionTracker {
        match kind {
            SensorKind::Location => &self.location_permission,
            SensorKind::Compass => &self.compass_permission,
        }
    }

    fn tracker_mut(&mut self, kind: SensorKind) -> &mut PermissionTracker {
        match kind {
            SensorKind::Location => &mut self.location_permission,
            SensorKind::Compass => &mut self.compass_permission,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────

    /// Ask the platform for access to a sensor, waiting at most the
    /// configured permission timeout.
    ///
    /// Denial and timeout leave the engine usable: location falls back to
    /// the reference coordinate, heading to the remaining sources.
    pub async fn request_permission(&mut self, kind: SensorKind) -> Result<(), SensorError> {
        if !self.tracker_mut(kind).begin_request() {
            return Ok(());
        }

        let timeout = self.config.permission_timeout;
        let answer = tokio::time::timeout(timeout, self.platform.request_permission(kind)).await;

        match answer {
            Ok(granted) => {
                let state = self.tracker_mut(kind).resolve(granted);
                if state == PermissionState::Granted {
                    if !self.consumers.is_empty() {
                        self.start();
                    }
                    Ok(())
                } else {
                    self.on_permission_lost(kind);
                    Err(SensorError::PermissionDenied(kind))
                }
            }
            Err(_) => {
                tracing::warn!(
                    sensor = %kind,
                    timeout_ms = timeout.as_millis() as u64,
                    "Permission request timed out"
                );
                self.tracker_mut(kind).resolve(false);
                self.on_permission_lost(kind);
                Err(SensorError::PermissionTimeout {
                    kind,
                    waited_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    fn on_permission_lost(&mut self, kind: SensorKind) {
        match kind {
            SensorKind::Location => {
                if let Some(sub) = self.location_subscription.take() {
                    sub.cancel();
                }
            }
            SensorKind::Compass => {
                if let Some(sub) = self.orientation_subscription.take() {
                    sub.cancel();
                }
                self.latest_orientation = None;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────

    /// Open the location and orientation watches that are permitted and not
    /// already open.
    pub fn start(&mut self) {
        if self.location_permission.is_granted() && !Self::is_open(&self.location_subscription) {
            self.location_subscription =
                Some(self.platform.subscribe(SensorKind::Location, self.events_tx.clone()));
            tracing::info!("Location tracking started");
        }
        if self.compass_permission.is_granted() && !Self::is_open(&self.orientation_subscription) {
            self.orientation_subscription =
                Some(self.platform.subscribe(SensorKind::Compass, self.events_tx.clone()));
            tracing::info!("Orientation tracking started");
        }
    }

    /// Close both watches. Safe to call when not started.
    pub fn stop(&mut self) {
        let mut stopped = false;
        if let Some(sub) = self.location_subscription.take() {
            sub.cancel();
            stopped = true;
        }
        if let Some(sub) = self.orientation_subscription.take() {
            sub.cancel();
            stopped = true;
        }
        if stopped {
            tracing::info!("Sensor tracking stopped");
        }
    }

    fn is_open(subscription: &Option<Subscription>) -> bool {
        subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Register a consumer of live location, opening watches if needed.
    pub fn acquire(&mut self, consumer: TrackingConsumer) {
        if self.consumers.insert(consumer) {
            tracing::debug!(consumer = ?consumer, "Tracking claim acquired");
        }
        self.start();
    }

    /// Drop a consumer's claim; the last release closes the watches.
    pub fn release(&mut self, consumer: TrackingConsumer) {
        if self.consumers.remove(&consumer) {
            tracing::debug!(consumer = ?consumer, "Tracking claim released");
        }
        if self.consumers.is_empty() {
            self.stop();
        }
    }

    pub fn is_claimed_by(&self, consumer: TrackingConsumer) -> bool {
        self.consumers.contains(&consumer)
    }

    /// Whether a location watch is currently open.
    pub fn is_tracking(&self) -> bool {
        Self::is_open(&self.location_subscription)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Fusion
    // ─────────────────────────────────────────────────────────────────────

    /// Route a raw event to the matching ingest method.
    pub fn ingest(&mut self, event: SensorEvent) -> Option<FusedFix> {
        match event {
            SensorEvent::Location(sample) => Some(self.ingest_location(sample)),
            SensorEvent::Orientation(reading) => self.ingest_orientation(reading),
        }
    }

    /// Fuse a new location sample with the latest orientation reading.
    pub fn ingest_location(&mut self, sample: LocationSample) -> FusedFix {
        let movement_bearing = self.movement.observe(sample);
        self.heading = self.select_heading(&sample, movement_bearing);
        self.latest_sample = Some(sample);

        let fix = FusedFix {
            sample,
            heading: self.heading,
        };
        self.shared.send_replace(Some(fix));

        tracing::trace!(
            lat = sample.lat,
            lng = sample.lng,
            heading = self.heading.degrees(),
            source = %self.heading.source(),
            "Fused fix"
        );
        fix
    }

    /// Record a compass reading.
    ///
    /// Readings are ignored unless compass permission is granted. When a
    /// location is already known the fix is re-published with the new
    /// heading.
    pub fn ingest_orientation(&mut self, reading: OrientationReading) -> Option<FusedFix> {
        if !self.compass_permission.is_granted() || !reading.heading_degrees.is_finite() {
            return None;
        }

        self.latest_orientation = Some(reading);
        self.heading = HeadingEstimate::new(reading.heading_degrees, HeadingSource::Compass);

        let sample = self.latest_sample?;
        let fix = FusedFix {
            sample,
            heading: self.heading,
        };
        self.shared.send_replace(Some(fix));
        Some(fix)
    }

    fn select_heading(
        &self,
        sample: &LocationSample,
        movement_bearing: Option<f64>,
    ) -> HeadingEstimate {
        if let Some(reading) = self.recent_orientation(sample) {
            return HeadingEstimate::new(reading.heading_degrees, HeadingSource::Compass);
        }
        if let Some(gps) = sample.usable_gps_heading() {
            return HeadingEstimate::new(gps, HeadingSource::GpsHeading);
        }
        if let Some(bearing) = movement_bearing {
            return HeadingEstimate::new(bearing, HeadingSource::MovementBearing);
        }
        self.heading
    }

    fn recent_orientation(&self, sample: &LocationSample) -> Option<OrientationReading> {
        if !self.compass_permission.is_granted() {
            return None;
        }
        let max_age_ms = self.config.compass_max_age_ms;
        self.latest_orientation
            .filter(|r| r.timestamp_ms.abs_diff(sample.timestamp_ms) <= max_age_ms)
    }
}

impl Drop for SensorFusionEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
