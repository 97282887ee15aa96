//! The navigation session value.

use super::route::Route;
use crate::geo::LatLng;
use crate::station::StationId;

/// Lifecycle of a [`NavigationSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for (or failed to get) a route.
    Planning,
    /// Route drawn, progress tracked.
    Active,
    /// Within the arrival threshold; waits for an explicit stop.
    Arrived,
    /// Stopped by the caller.
    Cancelled,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Planning => write!(f, "planning"),
            SessionState::Active => write!(f, "active"),
            SessionState::Arrived => write!(f, "arrived"),
            SessionState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Turn-by-turn progress toward one station.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    pub(super) destination: StationId,
    pub(super) destination_name: String,
    pub(super) destination_position: LatLng,
    pub(super) route: Option<Route>,
    pub(super) current_step_index: usize,
    pub(super) distance_remaining_m: f64,
    pub(super) eta_minutes: u32,
    pub(super) camera_locked: bool,
    pub(super) state: SessionState,
}

impl NavigationSession {
    pub(super) fn planning(
        destination: StationId,
        destination_name: String,
        destination_position: LatLng,
        origin: LatLng,
    ) -> Self {
        Self {
            destination,
            destination_name,
            destination_position,
            route: None,
            current_step_index: 0,
            distance_remaining_m: origin.distance_to(&destination_position),
            eta_minutes: 0,
            camera_locked: false,
            state: SessionState::Planning,
        }
    }

    pub fn destination(&self) -> &StationId {
        &self.destination
    }

    pub fn destination_name(&self) -> &str {
        &self.destination_name
    }

    pub fn destination_position(&self) -> LatLng {
        self.destination_position
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    /// Instruction text for the current step.
    pub fn instruction(&self) -> Option<&str> {
        self.route
            .as_ref()?
            .steps
            .get(self.current_step_index)
            .map(|s| s.instruction.as_str())
    }

    pub fn distance_remaining_m(&self) -> f64 {
        self.distance_remaining_m
    }

    pub fn eta_minutes(&self) -> u32 {
        self.eta_minutes
    }

    /// Whether the camera is held fixed while progress updates continue.
    pub fn camera_locked(&self) -> bool {
        self.camera_locked
    }

    pub fn state(&self) -> SessionState {
        self.state
    }
}
