//! Explicitly owned session context.
//!
//! Values that outlive a single screen (theme, the fallback reference
//! coordinate, the read-only view of the fused location) are held here and
//! handed to the engine at construction instead of living in globals. The
//! startup order is fixed: theme is applied before the first camera command,
//! and the first camera placement uses the fused location if one exists,
//! otherwise the fallback.

use std::str::FromStr;

use crate::geo::LatLng;
use crate::map::{CameraUpdate, MapCommand, MapSurface};
use crate::sensor::LocationHandle;

/// Map style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapTheme {
    #[default]
    Light,
    Dark,
}

impl MapTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapTheme::Light => "light",
            MapTheme::Dark => "dark",
        }
    }
}

impl std::fmt::Display for MapTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(MapTheme::Light),
            "dark" => Ok(MapTheme::Dark),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

/// Session-scoped state shared by the engine's components.
#[derive(Debug, Clone)]
pub struct SessionContext {
    theme: MapTheme,
    fallback: LatLng,
    location: LocationHandle,
}

impl SessionContext {
    pub fn new(theme: MapTheme, fallback: LatLng, location: LocationHandle) -> Self {
        Self {
            theme,
            fallback,
            location,
        }
    }

    pub fn theme(&self) -> MapTheme {
        self.theme
    }

    /// Reference coordinate used when no location is known.
    pub fn fallback(&self) -> LatLng {
        self.fallback
    }

    /// Read-only view of the fused location.
    pub fn location(&self) -> &LocationHandle {
        &self.location
    }

    /// Latest fused coordinate, or the fallback.
    pub fn best_known_position(&self) -> LatLng {
        self.location
            .latest()
            .map(|fix| fix.sample.position())
            .unwrap_or(self.fallback)
    }

    /// First step of the startup sequence: style the map before anything
    /// is drawn.
    pub fn apply_theme(&self, map: &dyn MapSurface) {
        map.apply(MapCommand::SetTheme(self.theme));
    }

    /// Last step of the startup sequence, after location permission has
    /// resolved.
    pub fn place_initial_camera(&self, map: &dyn MapSurface, zoom: f64) {
        let center = self.best_known_position();
        map.apply(MapCommand::SetCamera(CameraUpdate::centered(center, zoom).instant()));
        tracing::info!(theme = %self.theme, center = %center, "Map initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::RecordingMapSurface;
    use crate::sensor::LocationHandle;

    #[test]
    fn test_theme_from_str() {
        assert_eq!("Dark".parse::<MapTheme>().unwrap(), MapTheme::Dark);
        assert_eq!(" light ".parse::<MapTheme>().unwrap(), MapTheme::Light);
        assert!("sepia".parse::<MapTheme>().is_err());
    }

    #[test]
    fn test_theme_applied_before_first_camera() {
        let (_tx, handle) = LocationHandle::channel();
        let fallback = LatLng::new(48.137, 11.575);
        let context = SessionContext::new(MapTheme::Dark, fallback, handle);
        let map = RecordingMapSurface::new();

        context.apply_theme(&map);
        context.place_initial_camera(&map, 14.0);

        let commands = map.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], MapCommand::SetTheme(MapTheme::Dark));
        match &commands[1] {
            MapCommand::SetCamera(update) => assert_eq!(update.center, Some(fallback)),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
