//! StationFinder CLI - Command-line interface
//!
//! Lists nearby battery-sharing stations and replays recorded walks through
//! the live navigation engine.

mod commands;
mod error;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::navigate::NavigateArgs;
use commands::nearby::NearbyArgs;

#[derive(Debug, Parser)]
#[command(name = "stationfinder", version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.stationfinder/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the stations closest to a coordinate
    Nearby {
        /// JSON file with the station list
        #[arg(long)]
        stations: PathBuf,

        /// Latitude (default: configured fallback location)
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude (default: configured fallback location)
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,

        /// Maximum number of stations to list
        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Only list stations with batteries available
        #[arg(long)]
        available: bool,
    },

    /// Replay a recorded sensor track while navigating to a station
    Navigate {
        /// JSON file with the station list
        #[arg(long)]
        stations: PathBuf,

        /// Destination station id
        #[arg(long)]
        station: String,

        /// JSON file with recorded location/orientation events
        #[arg(long)]
        track: PathBuf,

        /// Recorded Mapbox Directions response to use instead of the HTTP service
        #[arg(long)]
        route: Option<PathBuf>,

        /// Directions API access token (overrides config)
        #[arg(long, env = "STATIONFINDER_ACCESS_TOKEN")]
        access_token: Option<String>,

        /// Replay speed multiplier; 0 replays as fast as possible
        #[arg(long, default_value_t = 0.0)]
        speed: f64,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Nearby {
            stations,
            lat,
            lng,
            limit,
            available,
        } => commands::nearby::run(
            cli.config.as_deref(),
            NearbyArgs {
                stations,
                position: lat.zip(lng),
                limit,
                available_only: available,
            },
        ),
        Commands::Navigate {
            stations,
            station,
            track,
            route,
            access_token,
            speed,
        } => commands::navigate::run(
            cli.config.as_deref(),
            NavigateArgs {
                stations,
                station,
                track,
                route,
                access_token,
                speed,
            },
        ),
        Commands::Init { force } => commands::init::run(cli.config.as_deref(), force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{} {}", console::style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
