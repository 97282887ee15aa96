//! CLI error type.

use stationfinder::error::{ConfigError, DirectionsError, EngineError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or written.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid command-line input.
    #[error("{0}")]
    Usage(String),

    /// Engine or station data failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Directions client could not be built or the route file was unusable.
    #[error("Directions error: {0}")]
    Directions(#[from] DirectionsError),

    /// Sensor track could not be read.
    #[error("Failed to read track {path}: {reason}")]
    Track { path: String, reason: String },

    /// Logging could not be set up.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Runtime could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
