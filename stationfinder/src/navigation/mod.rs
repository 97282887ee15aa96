//! Turn-by-turn walking navigation.
//!
//! # Architecture
//!
//! ```text
//!                         ┌──────────────────────────────┐
//!  DirectionsService ───► │ NavigationSessionController  │ ───► MapCommand (route line, camera)
//!  (HTTP / static)        │   NavigationSession          │ ───► VoiceAnnouncer ───► SpeechSynthesizer
//!  FusedFix ────────────► │   (at most one)              │
//!                         └──────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`route`] - `Route` and the Mapbox Directions wire format
//! - [`directions`] - `DirectionsService` trait, HTTP and static implementations
//! - [`voice`] - single-slot speech queue
//! - [`session`] - `NavigationSession` value and `SessionState`
//! - [`controller`] - session lifecycle, progress, step advancement, arrival

mod controller;
mod directions;
mod route;
mod session;
mod voice;

pub use controller::{NavigationSessionController, ProgressUpdate};
pub use directions::{DirectionsService, HttpDirectionsClient, StaticDirections};
pub use route::{Route, RouteStep};
pub use session::{NavigationSession, SessionState};
pub use voice::{SpeechSynthesizer, TracingSpeech, VoiceAnnouncer};
