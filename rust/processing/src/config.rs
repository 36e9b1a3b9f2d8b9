// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Puncher configuration loaded from environment variables or JSON.

use crate::error::{Error, Result};
use holepunch_geometry::TreeConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_LEAF_CAPACITY: usize = 50;
const DEFAULT_ATOMIC_VOLUME: f64 = 1e-6;

/// Puncher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuncherConfig {
    /// Triangle count above which a tree leaf splits.
    pub leaf_capacity: usize,
    /// Box volume at or below which a tree node keeps no geometry.
    pub atomic_volume: f64,
}

impl Default for PuncherConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            atomic_volume: DEFAULT_ATOMIC_VOLUME,
        }
    }
}

impl PuncherConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            leaf_capacity: std::env::var("HOLEPUNCH_LEAF_CAPACITY")
                .unwrap_or_else(|_| DEFAULT_LEAF_CAPACITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_LEAF_CAPACITY),
            atomic_volume: std::env::var("HOLEPUNCH_ATOMIC_VOLUME")
                .unwrap_or_else(|_| DEFAULT_ATOMIC_VOLUME.to_string())
                .parse()
                .unwrap_or(DEFAULT_ATOMIC_VOLUME),
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PuncherConfig =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            leaf_capacity: self.leaf_capacity,
            atomic_volume: self.atomic_volume,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.tree_config()
            .validate()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let config = PuncherConfig::from_json(r#"{ "leaf_capacity": 8 }"#).unwrap();
        assert_eq!(config.leaf_capacity, 8);
        assert_eq!(config.atomic_volume, DEFAULT_ATOMIC_VOLUME);

        assert!(matches!(
            PuncherConfig::from_json(r#"{ "leaf_capacity": 0 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(PuncherConfig::from_json("leaf_capacity = 8").is_err());
    }
}
