//! TOML configuration
//!
//! ```toml
//! [heuristics]
//! dbscan_eps = 0.8
//! default_cluster_count = 4
//!
//! [insight]
//! example_records = 10
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use clustx_core::{Error, HeuristicsConfig, Result};
use clustx_insight::InsightConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub heuristics: HeuristicsConfig,
    pub insight: InsightConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Parse(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.heuristics.validate()?;
        self.insight.validate()
    }
}
