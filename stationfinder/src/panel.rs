//! Bottom panel drag handling.
//!
//! Converts raw vertical drag positions into the panel's collapsed/expanded
//! state using distance thresholds only; velocity is ignored.
//!
//! # Sign Convention
//!
//! `drag_offset_px = start_y - current_y`, so positive is upward.
//!
//! ```text
//!  Collapsed:  up   ──► accumulate (0 ..= +cap)      release > +expand   ─► Expanded
//!              down ──► accumulate (-cap ..= 0)      release < -dismiss  ─► Dismissed
//!                       only when dismissible,
//!                       otherwise reset to 0
//!  Expanded:   down ──► accumulate (-cap ..= 0)      release < -collapse ─► Collapsed
//!              up   ──► reset to 0
//!  Anything else on release snaps back. The offset is 0 after every release.
//! ```

use crate::config::PanelConfig;

/// Persistent panel state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanelState {
    pub expanded: bool,
    /// Non-zero only while a drag is in progress.
    pub drag_offset_px: f64,
}

/// What a renderer should draw, derived once per update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelVisualState {
    Collapsed,
    Dragging,
    Expanded,
    /// Dragging down far enough that releasing would dismiss.
    Dismissing,
}

/// Whether a drag gesture is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PanelDragPhase {
    #[default]
    Idle,
    Dragging { start_y: f64 },
}

/// Result of releasing a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOutcome {
    Expanded,
    Collapsed,
    /// The panel was dragged away; the caller clears the selection.
    Dismissed,
    /// Threshold not reached; the prior state is kept.
    SnappedBack,
}

impl std::fmt::Display for PanelOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelOutcome::Expanded => write!(f, "expanded"),
            PanelOutcome::Collapsed => write!(f, "collapsed"),
            PanelOutcome::Dismissed => write!(f, "dismissed"),
            PanelOutcome::SnappedBack => write!(f, "snapped-back"),
        }
    }
}

#[derive(Debug, Default)]
pub struct PanelGestureController {
    config: PanelConfig,
    state: PanelState,
    phase: PanelDragPhase,
    dismissible: bool,
}

impl PanelGestureController {
    pub fn new(config: PanelConfig) -> Self {
        Self {
            config,
            state: PanelState::default(),
            phase: PanelDragPhase::Idle,
            dismissible: false,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn phase(&self) -> PanelDragPhase {
        self.phase
    }

    pub fn is_expanded(&self) -> bool {
        self.state.expanded
    }

    /// Allow a downward drag on the collapsed panel to dismiss it.
    pub fn set_dismissible(&mut self, dismissible: bool) {
        self.dismissible = dismissible;
    }

    /// Collapse without a gesture, e.g. when the selection is cleared.
    pub fn collapse(&mut self) {
        self.state = PanelState::default();
        self.phase = PanelDragPhase::Idle;
    }

    pub fn visual_state(&self) -> PanelVisualState {
        match self.phase {
            PanelDragPhase::Idle if self.state.expanded => PanelVisualState::Expanded,
            PanelDragPhase::Idle => PanelVisualState::Collapsed,
            PanelDragPhase::Dragging { .. }
                if !self.state.expanded
                    && self.state.drag_offset_px < -self.config.dismiss_threshold_px =>
            {
                PanelVisualState::Dismissing
            }
            PanelDragPhase::Dragging { .. } => PanelVisualState::Dragging,
        }
    }

    pub fn drag_start(&mut self, y: f64) {
        self.phase = PanelDragPhase::Dragging { start_y: y };
        self.state.drag_offset_px = 0.0;
    }

    /// Update the offset for the current pointer position.
    ///
    /// Returns the offset after applying direction rules and the cap.
    pub fn drag_move(&mut self, y: f64) -> f64 {
        let PanelDragPhase::Dragging { start_y } = self.phase else {
            return 0.0;
        };
        let delta = start_y - y;
        let cap = self.config.drag_cap_px;

        self.state.drag_offset_px = if !delta.is_finite() {
            0.0
        } else if self.state.expanded {
            if delta < 0.0 {
                delta.max(-cap)
            } else {
                0.0
            }
        } else if delta > 0.0 {
            delta.min(cap)
        } else if self.dismissible {
            delta.max(-cap)
        } else {
            0.0
        };
        self.state.drag_offset_px
    }

    /// Finish the drag and settle the panel.
    pub fn drag_end(&mut self) -> PanelOutcome {
        if self.phase == PanelDragPhase::Idle {
            return PanelOutcome::SnappedBack;
        }
        let offset = self.state.drag_offset_px;

        let outcome = if self.state.expanded {
            if offset < -self.config.collapse_threshold_px {
                self.state.expanded = false;
                PanelOutcome::Collapsed
            } else {
                PanelOutcome::SnappedBack
            }
        } else if offset > self.config.expand_threshold_px {
            self.state.expanded = true;
            PanelOutcome::Expanded
        } else if offset < -self.config.dismiss_threshold_px {
            PanelOutcome::Dismissed
        } else {
            PanelOutcome::SnappedBack
        };

        self.state.drag_offset_px = 0.0;
        self.phase = PanelDragPhase::Idle;
        tracing::info!(outcome = %outcome, offset_px = offset, "Panel drag released");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drag(panel: &mut PanelGestureController, up_px: f64) -> PanelOutcome {
        panel.drag_start(500.0);
        panel.drag_move(500.0 - up_px / 2.0);
        panel.drag_move(500.0 - up_px);
        panel.drag_end()
    }

    fn dismissible() -> PanelGestureController {
        let mut panel = PanelGestureController::new(PanelConfig::default());
        panel.set_dismissible(true);
        panel
    }

    #[test]
    fn test_up_100_expands() {
        let mut panel = dismissible();
        assert_eq!(drag(&mut panel, 100.0), PanelOutcome::Expanded);
        assert!(panel.state().expanded);
        assert_eq!(panel.state().drag_offset_px, 0.0);
    }

    #[test]
    fn test_up_50_stays_collapsed() {
        let mut panel = dismissible();
        assert_eq!(drag(&mut panel, 50.0), PanelOutcome::SnappedBack);
        assert!(!panel.state().expanded);
    }

    #[test]
    fn test_down_160_dismisses() {
        let mut panel = dismissible();
        assert_eq!(drag(&mut panel, -160.0), PanelOutcome::Dismissed);
        assert!(!panel.state().expanded);
    }

    #[test]
    fn test_down_100_unchanged() {
        let mut panel = dismissible();
        assert_eq!(drag(&mut panel, -100.0), PanelOutcome::SnappedBack);
        assert_eq!(panel.state(), PanelState::default());
    }

    #[test]
    fn test_down_without_selection_is_wrong_direction() {
        let mut panel = PanelGestureController::new(PanelConfig::default());
        panel.drag_start(500.0);
        assert_eq!(panel.drag_move(700.0), 0.0);
        assert_eq!(panel.drag_end(), PanelOutcome::SnappedBack);
    }

    #[test]
    fn test_expanded_collapses_on_down_drag() {
        let mut panel = dismissible();
        drag(&mut panel, 100.0);

        // Wrong direction gives no partial feedback
        panel.drag_start(500.0);
        assert_eq!(panel.drag_move(400.0), 0.0);
        panel.drag_end();
        assert!(panel.state().expanded);

        assert_eq!(drag(&mut panel, -90.0), PanelOutcome::Collapsed);
        assert!(!panel.state().expanded);
    }

    #[test]
    fn test_expanded_never_dismisses() {
        let mut panel = dismissible();
        drag(&mut panel, 100.0);
        assert_eq!(drag(&mut panel, -400.0), PanelOutcome::Collapsed);
    }

    #[test]
    fn test_offset_is_capped() {
        let mut panel = dismissible();
        panel.drag_start(1_000.0);
        assert_eq!(panel.drag_move(0.0), PanelConfig::default().drag_cap_px);
        assert_eq!(panel.drag_move(2_000.0), -PanelConfig::default().drag_cap_px);
    }

    #[test]
    fn test_visual_states() {
        let mut panel = dismissible();
        assert_eq!(panel.visual_state(), PanelVisualState::Collapsed);

        panel.drag_start(500.0);
        panel.drag_move(450.0);
        assert_eq!(panel.visual_state(), PanelVisualState::Dragging);
        panel.drag_move(700.0);
        assert_eq!(panel.visual_state(), PanelVisualState::Dismissing);
        panel.drag_end();

        drag(&mut panel, 120.0);
        assert_eq!(panel.visual_state(), PanelVisualState::Expanded);
    }

    #[test]
    fn test_move_without_start_is_ignored() {
        let mut panel = dismissible();
        assert_eq!(panel.drag_move(100.0), 0.0);
        assert_eq!(panel.drag_end(), PanelOutcome::SnappedBack);
    }

    proptest! {
        #[test]
        fn test_offset_reset_and_thresholds(
            moves in proptest::collection::vec(-600.0..600.0_f64, 1..10),
            expanded_first in any::<bool>(),
            can_dismiss in any::<bool>(),
        ) {
            let config = PanelConfig::default();
            let mut panel = PanelGestureController::new(config.clone());
            panel.set_dismissible(can_dismiss);
            if expanded_first {
                drag(&mut panel, 200.0);
            }
            let was_expanded = panel.state().expanded;

            panel.drag_start(0.0);
            let mut last = 0.0;
            for y in moves {
                last = panel.drag_move(y);
                prop_assert!(last.abs() <= config.drag_cap_px);
            }
            let outcome = panel.drag_end();

            prop_assert_eq!(panel.state().drag_offset_px, 0.0);
            let expected = if was_expanded {
                if last < -config.collapse_threshold_px {
                    PanelOutcome::Collapsed
                } else {
                    PanelOutcome::SnappedBack
                }
            } else if last > config.expand_threshold_px {
                PanelOutcome::Expanded
            } else if last < -config.dismiss_threshold_px {
                PanelOutcome::Dismissed
            } else {
                PanelOutcome::SnappedBack
            };
            prop_assert_eq!(outcome, expected);
            if !can_dismiss {
                prop_assert_ne!(outcome, PanelOutcome::Dismissed);
            }
        }
    }
}
