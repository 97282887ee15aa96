//! Movement history and bearing derivation.
//!
//! Keeps the most recent location samples so a facing direction can be
//! derived from movement when neither the compass nor the GPS heading is
//! available.
//!
//! # Design
//!
//! - Bearing is taken from the previous sample to the newest one
//! - Only derived while moving at or above the configured speed
//! - Speed is the reported speed, or distance over time when none is reported
//! - History is also used for the walked-distance summary

use std::collections::VecDeque;

use super::types::LocationSample;
use crate::config::DEFAULT_MOVEMENT_SPEED_THRESHOLD;

/// Default number of samples to retain.
const DEFAULT_MAX_SAMPLES: usize = 10;

/// Configuration for movement history.
#[derive(Debug, Clone)]
pub struct MovementConfig {
    /// Maximum samples to retain.
    pub max_samples: usize,
    /// Minimum speed (m/s) for a bearing to be derived.
    pub min_speed_mps: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            min_speed_mps: DEFAULT_MOVEMENT_SPEED_THRESHOLD,
        }
    }
}

/// Recent location samples (oldest first).
#[derive(Debug)]
pub struct MovementTracker {
    samples: VecDeque<LocationSample>,
    config: MovementConfig,
    walked_m: f64,
}

impl Default for MovementTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementTracker {
    pub fn new() -> Self {
        Self::with_config(MovementConfig::default())
    }

    pub fn with_config(config: MovementConfig) -> Self {
        Self {
            samples: VecDeque::with_capacity(config.max_samples),
            config,
            walked_m: 0.0,
        }
    }

    /// Record a sample and return the movement bearing it implies, if any.
    pub fn observe(&mut self, sample: LocationSample) -> Option<f64> {
        let bearing = self
            .samples
            .back()
            .and_then(|previous| self.bearing_between(previous, &sample));

        if let Some(previous) = self.samples.back() {
            self.walked_m += previous.position().distance_to(&sample.position());
        }

        self.samples.push_back(sample);
        while self.samples.len() > self.config.max_samples.max(2) {
            self.samples.pop_front();
        }

        bearing
    }

    fn bearing_between(&self, previous: &LocationSample, current: &LocationSample) -> Option<f64> {
        let distance = previous.position().distance_to(&current.position());
        if distance <= f64::EPSILON {
            return None; // No displacement, bearing undefined
        }

        let speed = match current.speed_meters_per_second.filter(|s| s.is_finite()) {
            Some(reported) => reported,
            None => {
                let dt_ms = current.timestamp_ms.saturating_sub(previous.timestamp_ms);
                if dt_ms == 0 {
                    return None;
                }
                distance / (dt_ms as f64 / 1000.0)
            }
        };

        if speed < self.config.min_speed_mps {
            return None;
        }

        Some(previous.position().bearing_to(&current.position()))
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn latest(&self) -> Option<&LocationSample> {
        self.samples.back()
    }

    /// Total distance covered since the last clear, in meters.
    pub fn walked_meters(&self) -> f64 {
        self.walked_m
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.walked_m = 0.0;
    }
}
