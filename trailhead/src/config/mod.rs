//! Runtime configuration for the dialogue engine's collaborators.
//!
//! Everything here is passed explicitly into constructors; the core never
//! reads ambient process state, which keeps it testable with substitute
//! collaborators.

use serde::Deserialize;
use std::path::Path;

use crate::capabilities::{PlacesConfig, WeatherConfig};
use crate::llm::LlmConfig;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrailheadConfig {
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub places: PlacesConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl TrailheadConfig {
    /// Load from a TOML file; absent sections fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
