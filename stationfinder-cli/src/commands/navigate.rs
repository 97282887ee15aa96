//! Navigate command - replay a recorded walk through the navigation engine.
//!
//! The track is a JSON array of sensor events as delivered by the platform:
//!
//! ```json
//! [
//!   { "type": "location", "lat": 52.52, "lng": 13.405, "timestampMs": 0 },
//!   { "type": "orientation", "headingDegrees": 12.0, "timestampMs": 400 }
//! ]
//! ```
//!
//! The first location fix plans the route; the remaining events are pushed
//! through the sensor watch opened by the session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use console::style;
use stationfinder::engine::{EngineDependencies, MapEvent, StationMapEngine};
use stationfinder::map::RecordingMapSurface;
use stationfinder::navigation::{
    DirectionsService, HttpDirectionsClient, SessionState, SpeechSynthesizer, StaticDirections,
};
use stationfinder::sensor::{ManualSensorPlatform, SensorEvent};
use stationfinder::station::{StationId, StationList};

use super::common::{format_distance, load_config};
use crate::error::CliError;

#[derive(Debug)]
pub struct NavigateArgs {
    pub stations: PathBuf,
    pub station: String,
    pub track: PathBuf,
    pub route: Option<PathBuf>,
    pub access_token: Option<String>,
    /// Replay speed multiplier; 0 or less replays without pauses.
    pub speed: f64,
}

/// Prints spoken instructions to the terminal.
struct ConsoleSpeech;

impl SpeechSynthesizer for ConsoleSpeech {
    fn speak(&self, text: &str) {
        println!("  {} {}", style("▶").magenta(), text);
    }

    fn cancel(&self) {}
}

pub fn load_track(path: &Path) -> Result<Vec<SensorEvent>, CliError> {
    let track_err = |reason: String| CliError::Track {
        path: path.display().to_string(),
        reason,
    };
    let json = std::fs::read_to_string(path).map_err(|e| track_err(e.to_string()))?;
    let mut events: Vec<SensorEvent> =
        serde_json::from_str(&json).map_err(|e| track_err(e.to_string()))?;
    events.sort_by_key(SensorEvent::timestamp_ms);
    Ok(events)
}

pub fn run(config_path: Option<&Path>, args: NavigateArgs) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(replay(config_path, args))
}

async fn replay(config_path: Option<&Path>, args: NavigateArgs) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if args.access_token.is_some() {
        config.directions.access_token = args.access_token.clone();
    }

    let stations = StationList::load(&args.stations)?;
    let destination = StationId::from(args.station.as_str());
    let name = stations
        .get(&destination)
        .map(|s| s.name.clone())
        .ok_or_else(|| CliError::Usage(format!("Unknown station: {}", destination)))?;

    let track = load_track(&args.track)?;
    let split = track
        .iter()
        .position(|e| matches!(e, SensorEvent::Location(_)))
        .ok_or_else(|| CliError::Track {
            path: args.track.display().to_string(),
            reason: "no location fix".to_string(),
        })?;

    let directions: Arc<dyn DirectionsService> = match &args.route {
        Some(path) => Arc::new(StaticDirections::from_file(path)?),
        None => Arc::new(HttpDirectionsClient::new(&config.directions)?),
    };

    let platform = Arc::new(ManualSensorPlatform::granting());
    let map = Arc::new(RecordingMapSurface::new());
    let deps = EngineDependencies {
        platform: platform.clone(),
        directions,
        speech: Arc::new(ConsoleSpeech),
        map: map.clone(),
    };
    let mut engine = StationMapEngine::new(config, deps, stations);
    engine.initialize().await;

    for event in &track[..=split] {
        engine.handle(MapEvent::Sensor(*event)).await?;
    }

    println!("{} {} ({})", style("Navigating to").bold(), style(&name).cyan(), destination);
    engine.start_navigation(&destination).await?;

    let mut previous_ms = track[split].timestamp_ms();
    let mut arrived_at = None;
    for event in &track[split + 1..] {
        if args.speed > 0.0 {
            let gap_ms = event.timestamp_ms().saturating_sub(previous_ms) as f64 / args.speed;
            tokio::time::sleep(Duration::from_millis(gap_ms as u64)).await;
        }
        previous_ms = event.timestamp_ms();

        if platform.push(*event) {
            engine.drain_sensor_events();
        } else {
            engine.handle(MapEvent::Sensor(*event)).await?;
        }

        let snapshot = engine.snapshot();
        if arrived_at.is_none()
            && snapshot
                .navigation
                .as_ref()
                .is_some_and(|n| n.state == SessionState::Arrived)
        {
            arrived_at = Some(event.timestamp_ms());
        }
    }

    let snapshot = engine.snapshot();
    println!();
    match (snapshot.navigation, arrived_at) {
        (Some(status), Some(at_ms)) => {
            println!(
                "{} after {:.0} s, {} from the station",
                style("Arrived").green().bold(),
                at_ms.saturating_sub(track[split].timestamp_ms()) as f64 / 1_000.0,
                format_distance(status.distance_remaining_m)
            );
        }
        (Some(status), None) => {
            println!(
                "{} {} remaining, about {} min (step {})",
                style("Track ended:").yellow().bold(),
                format_distance(status.distance_remaining_m),
                status.eta_minutes,
                status.step_index + 1
            );
        }
        (None, _) => println!("{}", style("Navigation ended without a session").yellow()),
    }
    println!("Walked {}", format_distance(engine.fusion().walked_meters()));
    println!(
        "{} instructions spoken, {} camera moves, {} route overlay(s) drawn",
        engine.navigation().voice().spoken_count(),
        map.camera_update_count(),
        map.line_add_count()
    );

    engine.stop_navigation();
    Ok(())
}
