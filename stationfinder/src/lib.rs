//! StationFinder - live location following and walking navigation to
//! battery-sharing stations.
//!
//! This library holds the map-view core: sensor fusion, the follow-mode
//! camera state machine, turn-by-turn navigation sessions, the draggable
//! station panel and station highlighting. The mapping SDK, the directions
//! service, speech output and the platform sensors are collaborators behind
//! traits.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stationfinder::config::EngineConfig;
//! use stationfinder::engine::{EngineDependencies, MapEvent, StationMapEngine};
//! use stationfinder::map::TracingMapSurface;
//! use stationfinder::navigation::{StaticDirections, TracingSpeech};
//! use stationfinder::error::DirectionsError;
//! use stationfinder::sensor::ManualSensorPlatform;
//! use stationfinder::station::StationList;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let deps = EngineDependencies {
//!     platform: Arc::new(ManualSensorPlatform::granting()),
//!     directions: Arc::new(StaticDirections::new(Err(DirectionsError::NoRoute))),
//!     speech: Arc::new(TracingSpeech),
//!     map: Arc::new(TracingMapSurface),
//! };
//! let mut engine = StationMapEngine::new(EngineConfig::default(), deps, StationList::default());
//! engine.initialize().await;
//! engine.handle(MapEvent::ControlButton).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod follow;
pub mod geo;
pub mod highlight;
pub mod map;
pub mod navigation;
pub mod panel;
pub mod sensor;
pub mod station;

pub use engine::{EngineSnapshot, MapEvent, StationMapEngine};
pub use error::{EngineError, NavigationError, SensorError};
pub use geo::LatLng;
