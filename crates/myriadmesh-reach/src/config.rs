//! Link cost configuration

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{ReachError, Result};
use crate::history::ReachHistory;

/// Line cost of a wired link
pub const DEFAULT_LINE_COST: i16 = 96;

/// Line costs applied when computing link metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCostConfig {
    /// Cost for links without an interface override
    #[serde(default = "default_line_cost")]
    pub line_cost: i16,

    /// Per-interface overrides, keyed by interface name
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceCostConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceCostConfig {
    /// Override the default line cost on this interface (optional)
    #[serde(default)]
    pub line_cost: Option<i16>,
}

fn default_line_cost() -> i16 {
    DEFAULT_LINE_COST
}

impl Default for LinkCostConfig {
    fn default() -> Self {
        Self {
            line_cost: DEFAULT_LINE_COST,
            interfaces: BTreeMap::new(),
        }
    }
}

impl LinkCostConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: LinkCostConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> AnyResult<Self> {
        if !path.exists() {
            anyhow::bail!("Link cost configuration not found: {}", path.display());
        }

        let contents =
            fs::read_to_string(path).context("Failed to read link cost configuration")?;
        let config =
            Self::from_yaml_str(&contents).context("Failed to parse link cost configuration")?;

        debug!(
            path = %path.display(),
            line_cost = config.line_cost,
            overrides = config.interfaces.len(),
            "Loaded link cost configuration"
        );
        Ok(config)
    }

    /// Reject negative line costs
    pub fn validate(&self) -> Result<()> {
        if self.line_cost < 0 {
            return Err(ReachError::InvalidLineCost {
                interface: "default".to_string(),
                cost: self.line_cost,
            });
        }

        for (name, iface) in &self.interfaces {
            if let Some(cost) = iface.line_cost.filter(|cost| *cost < 0) {
                return Err(ReachError::InvalidLineCost {
                    interface: name.clone(),
                    cost,
                });
            }
        }

        Ok(())
    }

    /// Line cost for `interface`, falling back to the default
    pub fn line_cost_for(&self, interface: &str) -> i16 {
        self.interfaces
            .get(interface)
            .and_then(|iface| iface.line_cost)
            .unwrap_or(self.line_cost)
    }

    /// Metric of a link on `interface` with the given reachability and delay
    pub fn link_metric(&self, interface: &str, history: &ReachHistory, delay: u32) -> Result<u16> {
        history.try_metric(self.line_cost_for(interface), delay)
    }
}
