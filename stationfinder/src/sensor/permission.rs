//! Per-sensor permission state.
//!
//! # State Machine
//!
//! ```text
//! NotRequested --request--> Requested --granted--> Granted
//!                               │
//!                               └──denied/timeout──> Denied --re-ask--> Requested
//! ```
//!
//! Transitions only move forward, except that an explicit re-ask may move
//! `Denied` back to `Requested`.

use super::types::SensorKind;

/// Permission state for one sensor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    NotRequested,
    Requested,
    Granted,
    Denied,
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::NotRequested => write!(f, "not-requested"),
            PermissionState::Requested => write!(f, "requested"),
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
        }
    }
}

/// Tracks the permission lifecycle of one sensor.
#[derive(Debug, Clone)]
pub struct PermissionTracker {
    kind: SensorKind,
    state: PermissionState,
}

impl PermissionTracker {
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            state: PermissionState::NotRequested,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }

    pub fn is_granted(&self) -> bool {
        self.state == PermissionState::Granted
    }

    /// Enter `Requested`.
    ///
    /// Returns `false` when no prompt is needed because access is already
    /// granted.
    pub fn begin_request(&mut self) -> bool {
        match self.state {
            PermissionState::Granted => false,
            PermissionState::NotRequested
            | PermissionState::Denied
            | PermissionState::Requested => {
                self.state = PermissionState::Requested;
                true
            }
        }
    }

    /// Record the platform's answer to a pending request.
    pub fn resolve(&mut self, granted: bool) -> PermissionState {
        if self.state != PermissionState::Requested {
            tracing::warn!(
                sensor = %self.kind,
                state = %self.state,
                "Permission answer without pending request ignored"
            );
            return self.state;
        }

        let old = self.state;
        self.state = if granted {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        tracing::info!(sensor = %self.kind, from = %old, to = %self.state, "Permission resolved");
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_then_grant() {
        let mut t = PermissionTracker::new(SensorKind::Location);
        assert_eq!(t.state(), PermissionState::NotRequested);
        assert!(t.begin_request());
        assert_eq!(t.state(), PermissionState::Requested);
        assert_eq!(t.resolve(true), PermissionState::Granted);
        assert!(t.is_granted());
    }

    #[test]
    fn test_granted_needs_no_prompt() {
        let mut t = PermissionTracker::new(SensorKind::Compass);
        t.begin_request();
        t.resolve(true);
        assert!(!t.begin_request());
        assert_eq!(t.state(), PermissionState::Granted);
    }

    #[test]
    fn test_denied_can_be_reasked() {
        let mut t = PermissionTracker::new(SensorKind::Compass);
        t.begin_request();
        assert_eq!(t.resolve(false), PermissionState::Denied);
        assert!(t.begin_request());
        assert_eq!(t.state(), PermissionState::Requested);
        assert_eq!(t.resolve(true), PermissionState::Granted);
    }

    #[test]
    fn test_resolve_without_request_ignored() {
        let mut t = PermissionTracker::new(SensorKind::Location);
        assert_eq!(t.resolve(true), PermissionState::NotRequested);

        t.begin_request();
        t.resolve(true);
        // A late "denied" cannot move Granted backwards
        assert_eq!(t.resolve(false), PermissionState::Granted);
    }
}
