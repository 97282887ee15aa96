//! Configuration for the station finder core.
//!
//! Every tunable lives here as a `DEFAULT_*` constant plus a field on the
//! matching component config. [`ConfigFile`] maps an INI file onto
//! [`EngineConfig`]; keys that are absent keep their defaults.
//!
//! # File Format
//!
//! ```ini
//! [fusion]
//! compass_max_age_ms = 2000
//! movement_speed_threshold = 0.5
//! permission_timeout_secs = 10
//!
//! [navigation]
//! arrival_threshold_m = 25
//! step_advance_radius_m = 20
//!
//! [directions]
//! base_url = https://api.mapbox.com/directions/v5/mapbox/walking
//! access_token = pk.xxx
//!
//! [map]
//! theme = dark
//! fallback_lat = 52.52
//! fallback_lng = 13.405
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use crate::context::MapTheme;
use crate::error::ConfigError;
use crate::geo::LatLng;

// ==================== Sensor Fusion ====================

/// Maximum age difference between a compass reading and a location sample
/// for the reading to still count as "recent".
pub const DEFAULT_COMPASS_MAX_AGE_MS: u64 = 2_000;

/// Minimum speed (m/s) before a bearing is derived from movement.
pub const DEFAULT_MOVEMENT_SPEED_THRESHOLD: f64 = 0.5;

/// Bounded wait for a permission prompt.
pub const DEFAULT_PERMISSION_TIMEOUT_SECS: u64 = 10;

// ==================== Follow Mode ====================

/// Zoom used by "center on me".
pub const DEFAULT_CENTER_ZOOM: f64 = 16.0;

/// Zoom used while following.
pub const DEFAULT_FOLLOW_ZOOM: f64 = 17.0;

/// Camera pitch in 3D follow mode (degrees).
pub const DEFAULT_FOLLOW_3D_PITCH: f64 = 60.0;

// ==================== Navigation ====================

/// Camera zoom during turn-by-turn navigation.
pub const DEFAULT_NAVIGATION_ZOOM: f64 = 18.0;

/// Distance to the next step's anchor at which the step becomes current.
pub const DEFAULT_STEP_ADVANCE_RADIUS_M: f64 = 20.0;

/// Distance to the destination below which the user has arrived.
pub const DEFAULT_ARRIVAL_THRESHOLD_M: f64 = 25.0;

/// Walking speed used for ETA when the route carries no duration.
pub const DEFAULT_WALKING_SPEED_MPS: f64 = 1.4;

/// Bounded wait for a route request.
pub const DEFAULT_ROUTE_TIMEOUT_SECS: u64 = 10;

// ==================== Panel ====================

/// Upward drag (px) needed to expand a collapsed panel.
pub const DEFAULT_EXPAND_THRESHOLD_PX: f64 = 80.0;

/// Downward drag (px) needed to collapse an expanded panel.
pub const DEFAULT_COLLAPSE_THRESHOLD_PX: f64 = 80.0;

/// Downward drag (px) on a collapsed panel that dismisses it.
pub const DEFAULT_DISMISS_THRESHOLD_PX: f64 = 150.0;

/// Maximum drag offset magnitude (px) in either direction.
pub const DEFAULT_DRAG_CAP_PX: f64 = 250.0;

// ==================== Station Highlight ====================

/// Vertical screen offset (px) keeping a highlighted station above the panel.
pub const DEFAULT_HIGHLIGHT_OFFSET_PX: f64 = 120.0;

/// Zoom used when framing a highlighted station.
pub const DEFAULT_HIGHLIGHT_ZOOM: f64 = 16.0;

// ==================== Directions / Map ====================

/// Default walking directions endpoint (Mapbox Directions v5).
pub const DEFAULT_DIRECTIONS_BASE_URL: &str = "https://api.mapbox.com/directions/v5/mapbox/walking";

/// Reference coordinate used when no location is known (Berlin Mitte).
pub const DEFAULT_FALLBACK_LOCATION: LatLng = LatLng::new(52.5200, 13.4050);

/// Sensor fusion configuration.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// See [`DEFAULT_COMPASS_MAX_AGE_MS`].
    pub compass_max_age_ms: u64,
    /// See [`DEFAULT_MOVEMENT_SPEED_THRESHOLD`].
    pub movement_speed_threshold: f64,
    /// See [`DEFAULT_PERMISSION_TIMEOUT_SECS`].
    pub permission_timeout: Duration,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            compass_max_age_ms: DEFAULT_COMPASS_MAX_AGE_MS,
            movement_speed_threshold: DEFAULT_MOVEMENT_SPEED_THRESHOLD,
            permission_timeout: Duration::from_secs(DEFAULT_PERMISSION_TIMEOUT_SECS),
        }
    }
}

impl FusionConfig {
    pub fn with_compass_max_age_ms(mut self, ms: u64) -> Self {
        self.compass_max_age_ms = ms;
        self
    }

    pub fn with_permission_timeout(mut self, timeout: Duration) -> Self {
        self.permission_timeout = timeout;
        self
    }
}

/// Follow mode camera configuration.
#[derive(Debug, Clone)]
pub struct FollowConfig {
    pub center_zoom: f64,
    pub follow_zoom: f64,
    pub pitch_3d: f64,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            center_zoom: DEFAULT_CENTER_ZOOM,
            follow_zoom: DEFAULT_FOLLOW_ZOOM,
            pitch_3d: DEFAULT_FOLLOW_3D_PITCH,
        }
    }
}

/// Navigation session configuration.
#[derive(Debug, Clone)]
pub struct NavigationConfig {
    pub zoom: f64,
    pub step_advance_radius_m: f64,
    pub arrival_threshold_m: f64,
    pub walking_speed_mps: f64,
    /// Rotate the camera to the fused heading while following during navigation.
    pub rotate_with_heading: bool,
    /// Speak an arrival message when the threshold is crossed.
    pub announce_arrival: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_NAVIGATION_ZOOM,
            step_advance_radius_m: DEFAULT_STEP_ADVANCE_RADIUS_M,
            arrival_threshold_m: DEFAULT_ARRIVAL_THRESHOLD_M,
            walking_speed_mps: DEFAULT_WALKING_SPEED_MPS,
            rotate_with_heading: true,
            announce_arrival: true,
        }
    }
}

impl NavigationConfig {
    pub fn with_arrival_threshold_m(mut self, meters: f64) -> Self {
        self.arrival_threshold_m = meters;
        self
    }

    pub fn with_step_advance_radius_m(mut self, meters: f64) -> Self {
        self.step_advance_radius_m = meters;
        self
    }
}

/// Bottom panel drag thresholds.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub expand_threshold_px: f64,
    pub collapse_threshold_px: f64,
    pub dismiss_threshold_px: f64,
    pub drag_cap_px: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            expand_threshold_px: DEFAULT_EXPAND_THRESHOLD_PX,
            collapse_threshold_px: DEFAULT_COLLAPSE_THRESHOLD_PX,
            dismiss_threshold_px: DEFAULT_DISMISS_THRESHOLD_PX,
            drag_cap_px: DEFAULT_DRAG_CAP_PX,
        }
    }
}

/// Station highlight framing.
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    pub vertical_offset_px: f64,
    pub zoom: f64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            vertical_offset_px: DEFAULT_HIGHLIGHT_OFFSET_PX,
            zoom: DEFAULT_HIGHLIGHT_ZOOM,
        }
    }
}

/// Directions service settings.
#[derive(Debug, Clone)]
pub struct DirectionsConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTIONS_BASE_URL.to_string(),
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_ROUTE_TIMEOUT_SECS),
        }
    }
}

/// Map presentation settings.
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub theme: MapTheme,
    pub fallback_location: LatLng,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            theme: MapTheme::Light,
            fallback_location: DEFAULT_FALLBACK_LOCATION,
        }
    }
}

/// Top-level configuration for [`crate::engine::StationMapEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub fusion: FusionConfig,
    pub follow: FollowConfig,
    pub navigation: NavigationConfig,
    pub panel: PanelConfig,
    pub highlight: HighlightConfig,
    pub directions: DirectionsConfig,
    pub map: MapConfig,
}

/// INI-backed configuration file.
pub struct ConfigFile;

impl ConfigFile {
    /// `~/.stationfinder/config.ini`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".stationfinder").join("config.ini"))
            .ok_or(ConfigError::NoHomeDirectory)
    }

    /// Load a config file, falling back to defaults for absent keys.
    pub fn load(path: &Path) -> Result<EngineConfig, ConfigError> {
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Parse config from INI text.
    pub fn parse(text: &str) -> Result<EngineConfig, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    /// Load `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<EngineConfig, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(EngineConfig::default())
        }
    }

    /// Write a default config file, creating parent directories.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_contents())?;
        Ok(())
    }

    fn default_contents() -> String {
        format!(
            "; Station finder configuration\n\
             \n\
             [fusion]\n\
             compass_max_age_ms = {}\n\
             movement_speed_threshold = {}\n\
             permission_timeout_secs = {}\n\
             \n\
             [follow]\n\
             center_zoom = {}\n\
             follow_zoom = {}\n\
             pitch_3d = {}\n\
             \n\
             [navigation]\n\
             zoom = {}\n\
             step_advance_radius_m = {}\n\
             arrival_threshold_m = {}\n\
             walking_speed_mps = {}\n\
             rotate_with_heading = true\n\
             announce_arrival = true\n\
             \n\
             [panel]\n\
             expand_threshold_px = {}\n\
             collapse_threshold_px = {}\n\
             dismiss_threshold_px = {}\n\
             drag_cap_px = {}\n\
             \n\
             [highlight]\n\
             vertical_offset_px = {}\n\
             zoom = {}\n\
             \n\
             [directions]\n\
             base_url = {}\n\
             ; access_token = \n\
             timeout_secs = {}\n\
             \n\
             [map]\n\
             theme = light\n\
             fallback_lat = {}\n\
             fallback_lng = {}\n",
            DEFAULT_COMPASS_MAX_AGE_MS,
            DEFAULT_MOVEMENT_SPEED_THRESHOLD,
            DEFAULT_PERMISSION_TIMEOUT_SECS,
            DEFAULT_CENTER_ZOOM,
            DEFAULT_FOLLOW_ZOOM,
            DEFAULT_FOLLOW_3D_PITCH,
            DEFAULT_NAVIGATION_ZOOM,
            DEFAULT_STEP_ADVANCE_RADIUS_M,
            DEFAULT_ARRIVAL_THRESHOLD_M,
            DEFAULT_WALKING_SPEED_MPS,
            DEFAULT_EXPAND_THRESHOLD_PX,
            DEFAULT_COLLAPSE_THRESHOLD_PX,
            DEFAULT_DISMISS_THRESHOLD_PX,
            DEFAULT_DRAG_CAP_PX,
            DEFAULT_HIGHLIGHT_OFFSET_PX,
            DEFAULT_HIGHLIGHT_ZOOM,
            DEFAULT_DIRECTIONS_BASE_URL,
            DEFAULT_ROUTE_TIMEOUT_SECS,
            DEFAULT_FALLBACK_LOCATION.lat,
            DEFAULT_FALLBACK_LOCATION.lng,
        )
    }

    fn from_ini(ini: &Ini) -> Result<EngineConfig, ConfigError> {
        let mut config = EngineConfig::default();
        let reader = IniReader { ini };

        // [fusion]
        reader.set(
            "fusion",
            "compass_max_age_ms",
            &mut config.fusion.compass_max_age_ms,
        )?;
        reader.set(
            "fusion",
            "movement_speed_threshold",
            &mut config.fusion.movement_speed_threshold,
        )?;
        if let Some(secs) = reader.get::<u64>("fusion", "permission_timeout_secs")? {
            config.fusion.permission_timeout = Duration::from_secs(secs);
        }

        // [follow]
        reader.set("follow", "center_zoom", &mut config.follow.center_zoom)?;
        reader.set("follow", "follow_zoom", &mut config.follow.follow_zoom)?;
        reader.set("follow", "pitch_3d", &mut config.follow.pitch_3d)?;

        // [navigation]
        let nav = &mut config.navigation;
        reader.set("navigation", "zoom", &mut nav.zoom)?;
        reader.set("navigation", "step_advance_radius_m", &mut nav.step_advance_radius_m)?;
        reader.set("navigation", "arrival_threshold_m", &mut nav.arrival_threshold_m)?;
        reader.set("navigation", "walking_speed_mps", &mut nav.walking_speed_mps)?;
        reader.set("navigation", "rotate_with_heading", &mut nav.rotate_with_heading)?;
        reader.set("navigation", "announce_arrival", &mut nav.announce_arrival)?;

        // [panel]
        let panel = &mut config.panel;
        reader.set("panel", "expand_threshold_px", &mut panel.expand_threshold_px)?;
        reader.set("panel", "collapse_threshold_px", &mut panel.collapse_threshold_px)?;
        reader.set("panel", "dismiss_threshold_px", &mut panel.dismiss_threshold_px)?;
        reader.set("panel", "drag_cap_px", &mut panel.drag_cap_px)?;

        // [highlight]
        reader.set(
            "highlight",
            "vertical_offset_px",
            &mut config.highlight.vertical_offset_px,
        )?;
        reader.set("highlight", "zoom", &mut config.highlight.zoom)?;

        // [directions]
        reader.set("directions", "base_url", &mut config.directions.base_url)?;
        if let Some(token) = reader.get::<String>("directions", "access_token")? {
            if !token.is_empty() {
                config.directions.access_token = Some(token);
            }
        }
        if let Some(secs) = reader.get::<u64>("directions", "timeout_secs")? {
            config.directions.timeout = Duration::from_secs(secs);
        }

        // [map]
        reader.set("map", "theme", &mut config.map.theme)?;
        reader.set("map", "fallback_lat", &mut config.map.fallback_location.lat)?;
        reader.set("map", "fallback_lng", &mut config.map.fallback_location.lng)?;

        Ok(config)
    }
}

struct IniReader<'a> {
    ini: &'a Ini,
}

impl IniReader<'_> {
    fn get<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
        let Some(raw) = self.ini.section(Some(section)).and_then(|s| s.get(key)) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
            })
    }

    fn set<T: FromStr>(&self, section: &str, key: &str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.get(section, key)? {
            *target = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.panel.expand_threshold_px, 80.0);
        assert_eq!(config.panel.dismiss_threshold_px, 150.0);
        assert_eq!(config.fusion.movement_speed_threshold, 0.5);
        assert_eq!(config.map.theme, MapTheme::Light);
        assert!(config.directions.access_token.is_none());
    }

    #[test]
    fn test_parse_overrides_and_keeps_defaults() {
        let config = ConfigFile::parse(
            "[navigation]\n\
             arrival_threshold_m = 30\n\
             announce_arrival = false\n\
             [map]\n\
             theme = dark\n\
             fallback_lat = 48.1\n\
             [directions]\n\
             access_token = pk.test\n\
             timeout_secs = 3\n",
        )
        .unwrap();

        assert_eq!(config.navigation.arrival_threshold_m, 30.0);
        assert!(!config.navigation.announce_arrival);
        assert_eq!(config.navigation.step_advance_radius_m, DEFAULT_STEP_ADVANCE_RADIUS_M);
        assert_eq!(config.map.theme, MapTheme::Dark);
        assert_eq!(config.map.fallback_location.lat, 48.1);
        assert_eq!(config.map.fallback_location.lng, DEFAULT_FALLBACK_LOCATION.lng);
        assert_eq!(config.directions.access_token.as_deref(), Some("pk.test"));
        assert_eq!(config.directions.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_parse_invalid_value() {
        let result = ConfigFile::parse("[panel]\nexpand_threshold_px = lots\n");
        match result {
            Err(ConfigError::InvalidValue { section, key, value }) => {
                assert_eq!(section, "panel");
                assert_eq!(key, "expand_threshold_px");
                assert_eq!(value, "lots");
            }
            other => panic!("expected InvalidValue, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        ConfigFile::write_default(&path).unwrap();
        let config = ConfigFile::load(&path).unwrap();

        assert_eq!(config.panel.drag_cap_px, DEFAULT_DRAG_CAP_PX);
        assert_eq!(config.directions.base_url, DEFAULT_DIRECTIONS_BASE_URL);
        assert_eq!(config.fusion.permission_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_or_default(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config.navigation.zoom, DEFAULT_NAVIGATION_ZOOM);
    }
}
