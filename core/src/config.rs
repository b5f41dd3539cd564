use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Search configuration file. The three counts are mandatory; every other key
/// falls back to the engine defaults when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    pub number_ants: usize,
    pub number_features: usize,
    pub top_features: usize,
    #[serde(default)]
    pub number_cycles: Option<usize>,
    #[serde(default)]
    pub decay_rate: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub initial_pheromone: Option<f64>,
    #[serde(default)]
    pub explore_exploit_coeff: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SearchConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
