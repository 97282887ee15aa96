//! Sensor input and fusion.
//!
//! This module turns the platform's raw geolocation and device orientation
//! callbacks into a single best-estimate position and facing direction.
//!
//! # Architecture
//!
//! ```text
//! SensorPlatform ──► Subscription ──► SensorEvent ──► SensorFusionEngine ──► FusedFix
//!  (OS watches)      (cancellable)     (mpsc)          (heading priority)     (watch)
//! ```
//!
//! # Components
//!
//! - [`types`] - `LocationSample`, `OrientationReading`, `HeadingEstimate`
//! - [`permission`] - `PermissionTracker` state machine per sensor
//! - [`movement`] - `MovementTracker` for bearing derived from movement
//! - [`platform`] - `SensorPlatform` trait and `Subscription` handles
//! - [`fusion`] - `SensorFusionEngine` and the shared `LocationHandle`

mod fusion;
mod movement;
mod permission;
mod platform;
mod types;

pub use fusion::{FusedFix, LocationHandle, SensorFusionEngine, TrackingConsumer};
pub use movement::{MovementConfig, MovementTracker};
pub use permission::{PermissionState, PermissionTracker};
pub use platform::{ManualSensorPlatform, PermissionAnswer, SensorPlatform, Subscription};
pub use types::{
    HeadingEstimate, HeadingSource, LocationSample, OrientationReading, SensorEvent, SensorKind,
};
