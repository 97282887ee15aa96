//! Walking routes as returned by the directions collaborator.

use serde::Deserialize;

use crate::error::DirectionsError;
use crate::geo::LatLng;

/// One turn-by-turn instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    /// Text shown and spoken to the user.
    pub instruction: String,
    /// Point at which the instruction applies.
    pub anchor: LatLng,
}

impl RouteStep {
    pub fn new(instruction: impl Into<String>, anchor: LatLng) -> Self {
        Self {
            instruction: instruction.into(),
            anchor,
        }
    }
}

/// A walking route between two coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Polyline for rendering, origin first.
    pub geometry: Vec<LatLng>,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub steps: Vec<RouteStep>,
}

impl Route {
    /// Estimated minutes for the remaining distance, rounded up.
    ///
    /// Scales the route's own duration by the remaining fraction; without a
    /// usable duration, falls back to `walking_speed_mps`.
    pub fn eta_minutes(&self, remaining_m: f64, walking_speed_mps: f64) -> u32 {
        let remaining_m = remaining_m.max(0.0);
        let seconds = if self.total_duration_s > 0.0 && self.total_distance_m > 0.0 {
            self.total_duration_s * (remaining_m / self.total_distance_m).min(1.0)
        } else if walking_speed_mps > 0.0 {
            remaining_m / walking_speed_mps
        } else {
            0.0
        };
        (seconds / 60.0).ceil() as u32
    }

    /// Decode a Mapbox Directions v5 response (`geometries=geojson`,
    /// `steps=true`) into the first route it contains.
    pub fn from_directions_json(body: &[u8]) -> Result<Route, DirectionsError> {
        let response: DirectionsResponse =
            serde_json::from_slice(body).map_err(|e| DirectionsError::Parse(e.to_string()))?;

        if response.code != "Ok" {
            return Err(match response.code.as_str() {
                "NoRoute" | "NoSegment" => DirectionsError::NoRoute,
                other => DirectionsError::Parse(format!(
                    "service returned code {}: {}",
                    other,
                    response.message.unwrap_or_default()
                )),
            });
        }

        let route = response.routes.into_iter().next().ok_or(DirectionsError::NoRoute)?;
        let geometry: Vec<LatLng> = route
            .geometry
            .coordinates
            .iter()
            .map(|&[lng, lat]| LatLng::new(lat, lng))
            .collect();
        if geometry.len() < 2 {
            return Err(DirectionsError::NoRoute);
        }

        let steps = route
            .legs
            .into_iter()
            .flat_map(|leg| leg.steps)
            .map(|step| {
                let [lng, lat] = step.maneuver.location;
                RouteStep::new(step.maneuver.instruction, LatLng::new(lat, lng))
            })
            .collect();

        Ok(Route {
            geometry,
            total_distance_m: route.distance,
            total_duration_s: route.duration,
            steps,
        })
    }
}

// Wire format

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<WireRoute>,
}

#[derive(Debug, Deserialize)]
struct WireRoute {
    distance: f64,
    duration: f64,
    geometry: WireGeometry,
    #[serde(default)]
    legs: Vec<WireLeg>,
}

#[derive(Debug, Deserialize)]
struct WireGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct WireLeg {
    #[serde(default)]
    steps: Vec<WireStep>,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    maneuver: WireManeuver,
}

#[derive(Debug, Deserialize)]
struct WireManeuver {
    instruction: String,
    location: [f64; 2],
}
