// config.rs

use crate::error::{Result, TrafficError};
use crate::global_variables::{DEFAULT_ARRIVAL_PROBABILITY, DEFAULT_TICK_PERIOD_MS};
use crate::simulation_engine::viewport::Bounds;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings. Every field has a default, so an empty JSON object is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub tick_period_ms: u64,
    /// Fixed seed for arrivals and generated hourly profiles. Absent means OS entropy.
    pub seed: Option<u64>,
    pub arrival_probability: f64,
    /// Viewport applied at start-up. Absent means the whole catalog.
    pub initial_viewport: Option<Bounds>,
    /// JSON intersection catalog replacing the built-in one.
    pub catalog_path: Option<PathBuf>,
    /// CSV file receiving one row per working-set member per tick.
    pub trace_csv: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            seed: None,
            arrival_probability: DEFAULT_ARRIVAL_PROBABILITY,
            initial_viewport: None,
            catalog_path: None,
            trace_csv: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = read_file(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_period_ms == 0 {
            return Err(TrafficError::InvalidConfig(
                "tick_period_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.arrival_probability) {
            return Err(TrafficError::InvalidConfig(format!(
                "arrival_probability {} is outside [0, 1]",
                self.arrival_probability
            )));
        }
        if let Some(bounds) = &self.initial_viewport {
            if bounds.north < bounds.south || bounds.east < bounds.west {
                return Err(TrafficError::InvalidConfig(format!(
                    "initial_viewport is inverted: {:?}",
                    bounds
                )));
            }
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| TrafficError::Io {
        path: path.to_path_buf(),
        source,
    })
}
