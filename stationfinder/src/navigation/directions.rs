//! Directions service abstraction for testability.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;

use super::route::Route;
use crate::config::DirectionsConfig;
use crate::error::DirectionsError;
use crate::geo::LatLng;

/// Trait for walking-route lookups.
///
/// This abstraction allows the navigation controller to be driven by a real
/// HTTP service, a recorded route file, or a test double.
pub trait DirectionsService: Send + Sync {
    /// Requests a walking route.
    ///
    /// # Arguments
    ///
    /// * `origin` - Where the user is now
    /// * `destination` - The station coordinate
    fn walking_route(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> BoxFuture<'_, Result<Route, DirectionsError>>;
}

/// Directions client for the Mapbox Directions v5 HTTP API using reqwest.
pub struct HttpDirectionsClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl HttpDirectionsClient {
    /// Creates a client from configuration.
    pub fn new(config: &DirectionsConfig) -> Result<Self, DirectionsError> {
        Self::with_timeout(config, config.timeout)
    }

    /// Creates a client with a custom transport timeout.
    pub fn with_timeout(
        config: &DirectionsConfig,
        timeout: Duration,
    ) -> Result<Self, DirectionsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectionsError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            timeout,
        })
    }

    /// Request URL for a route. Coordinates are `lng,lat` pairs; query
    /// values are percent-encoded.
    pub fn route_url(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> Result<reqwest::Url, DirectionsError> {
        let path = format!(
            "{}/{},{};{},{}",
            self.base_url, origin.lng, origin.lat, destination.lng, destination.lat
        );
        let mut params = vec![
            ("steps", "true"),
            ("geometries", "geojson"),
            ("overview", "full"),
        ];
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.as_str()));
        }
        reqwest::Url::parse_with_params(&path, &params)
            .map_err(|e| DirectionsError::Http(format!("Invalid directions URL: {}", e)))
    }

    async fn fetch(&self, origin: LatLng, destination: LatLng) -> Result<Route, DirectionsError> {
        let url = self.route_url(origin, destination)?;
        tracing::debug!(origin = %origin, destination = %destination, "Requesting walking route");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DirectionsError::Timeout(self.timeout.as_millis() as u64)
            } else {
                DirectionsError::Http(format!("Request failed: {}", e))
            }
        })?;

        // Mapbox answers NoRoute with a 4xx and a JSON body
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| DirectionsError::Http(format!("Failed to read response: {}", e)))?;

        match Route::from_directions_json(&body) {
            Ok(route) if status.is_success() => Ok(route),
            Err(DirectionsError::NoRoute) => Err(DirectionsError::NoRoute),
            _ if !status.is_success() => Err(DirectionsError::Status {
                status: status.as_u16(),
            }),
            result => result,
        }
    }
}

impl DirectionsService for HttpDirectionsClient {
    fn walking_route(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> BoxFuture<'_, Result<Route, DirectionsError>> {
        Box::pin(self.fetch(origin, destination))
    }
}

/// Directions service that always answers with the same result.
///
/// Backs offline replay from a recorded route file.
pub struct StaticDirections {
    result: Result<Route, DirectionsError>,
    requests: AtomicUsize,
}

impl StaticDirections {
    pub fn new(result: Result<Route, DirectionsError>) -> Self {
        Self {
            result,
            requests: AtomicUsize::new(0),
        }
    }

    /// Load a recorded Mapbox Directions response.
    pub fn from_file(path: &std::path::Path) -> Result<Self, DirectionsError> {
        let body = std::fs::read(path).map_err(|e| DirectionsError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(Ok(Route::from_directions_json(&body)?)))
    }

    /// Number of routes requested so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl DirectionsService for StaticDirections {
    fn walking_route(
        &self,
        _origin: LatLng,
        _destination: LatLng,
    ) -> BoxFuture<'_, Result<Route, DirectionsError>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let result = self.result.clone();
        Box::pin(async move { result })
    }
}
