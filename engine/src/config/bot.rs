//! Versioned top-level configuration

use crate::config::{IndicatorConfig, LiveConfig, ParameterSet, ScoreWeights, SearchConfig, SimConfig};
use crate::error::EngineError;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current configuration schema version
pub const CONFIG_VERSION: u32 = 1;

/// Everything the CLI and the live trader need, in one document
///
/// `version` is required in files so that a future schema change cannot be
/// read silently with the wrong meaning; all other sections fall back to
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub version: u32,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default)]
    pub params: ParameterSet,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub live: LiveConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            indicators: IndicatorConfig::default(),
            weights: ScoreWeights::default(),
            params: ParameterSet::default(),
            sim: SimConfig::default(),
            search: SearchConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

impl BotConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BotConfig = serde_json::from_str(json).context("invalid config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("failed to load config {}", path.display()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.version != CONFIG_VERSION {
            return Err(EngineError::UnsupportedConfigVersion {
                found: self.version,
                expected: CONFIG_VERSION,
            });
        }
        self.indicators.validate()?;
        self.weights.validate()?;
        self.params.validate()?;
        self.sim.validate()?;
        self.search.validate()?;
        self.live.validate()
    }
}
