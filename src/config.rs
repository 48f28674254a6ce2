use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::geo::BoundingRegion;
use crate::paths;
use crate::trail::DEFAULT_TRAIL_FRACTION;

/// Which presentation the viewer runs.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Animate snapshots pushed by a snapshot feed.
    #[default]
    Live,
    /// Animate procedurally generated flights.
    Simulation,
}

#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub mode: Mode,
    pub feed: FeedConfig,
    pub map: MapConfig,
    pub simulation: SimulationConfig,
    pub trail: TrailConfig,
    pub server: ServerConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    /// Websocket endpoint of the snapshot feed.
    pub endpoint_url: String,
    /// Interval at which the feed produces frames.
    pub poll_interval_secs: u64,
    /// How much history the trail and the frame buffer cover.
    pub history_window_secs: u64,
    /// Time to glide from the current position to a new target.
    pub interpolation_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "ws://127.0.0.1:8765".to_string(),
            poll_interval_secs: 5,
            history_window_secs: 1800,
            interpolation_ms: 2000,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn history_window(&self) -> Duration {
        Duration::from_secs(self.history_window_secs)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub bounds: BoundingRegion,
    /// Animation tick rate.
    pub tick_hz: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            bounds: BoundingRegion::default(),
            tick_hz: 60.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub flight_count: usize,
    /// Visible trail length as a fraction of the whole route.
    pub trail_fraction: f64,
    /// Number of points generated per synthesized path.
    pub path_points: usize,
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    /// Upper bound of the random delay before a recycled flight departs again.
    pub max_start_delay_secs: f64,
    /// Fixed RNG seed for reproducible traffic. Random when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            flight_count: 40,
            trail_fraction: DEFAULT_TRAIL_FRACTION,
            path_points: 160,
            min_duration_secs: 60.0,
            max_duration_secs: 180.0,
            max_start_delay_secs: 8.0,
            seed: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrailConfig {
    pub enabled: bool,
    /// Opacity of the newest trail segment.
    pub head_alpha: f32,
    /// Opacity of the oldest trail segment.
    pub tail_alpha: f32,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            head_alpha: 0.9,
            tail_alpha: 0.05,
        }
    }
}

/// Settings for the `snapshot_feed` server binary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub opensky_url: String,
    pub request_timeout_secs: u64,
    /// Consecutive upstream failures before switching to demo traffic.
    pub max_failures: u32,
    pub demo_flights: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8765".to_string(),
            opensky_url: "https://opensky-network.org/api/states/all".to_string(),
            request_timeout_secs: 30,
            max_failures: 3,
            demo_flights: 45,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.map.bounds.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "bounding region {:?} is empty or inverted",
                self.map.bounds
            )));
        }
        if self.feed.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("feed.poll_interval_secs must be positive".into()));
        }
        if self.map.tick_hz <= 0.0 {
            return Err(ConfigError::Invalid("map.tick_hz must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.simulation.trail_fraction) {
            return Err(ConfigError::Invalid("simulation.trail_fraction must be within [0, 1]".into()));
        }
        if self.simulation.min_duration_secs <= 0.0
            || self.simulation.max_duration_secs < self.simulation.min_duration_secs
        {
            return Err(ConfigError::Invalid("simulation durations are inconsistent".into()));
        }
        Ok(())
    }
}

/// Read and validate a config file.
pub fn try_load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Load the config at `path`, falling back to defaults on any error.
/// A missing file is created with the defaults.
pub fn load_config(path: &Path) -> AppConfig {
    if path.exists() {
        match try_load_config(path) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                return config;
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                return AppConfig::default();
            }
        }
    }

    let config = AppConfig::default();
    if let Err(e) = save_config(&config, path) {
        error!("Failed to write default config: {}", e);
    }
    config
}

pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config)?;
    paths::ensure_parent_dir(path)?;
    fs::write(path, contents)?;
    info!("Saved config to {:?}", path);
    Ok(())
}
