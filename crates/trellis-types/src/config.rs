//! Engine configuration, loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrellisError};

/// Tunables for selector matching and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Match class and ID selectors ASCII case-insensitively, as HTML
    /// quirks mode does. Standards mode compares them exactly.
    pub quirks_mode: bool,
    /// Use the ancestor Bloom filter to reject descendant selectors early
    /// while styling a subtree.
    pub ancestor_filter: bool,
    /// Longest selector chain (in compounds) the parser accepts.
    pub max_selector_compounds: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quirks_mode: false,
            ancestor_filter: true,
            max_selector_compounds: 32,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        log::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_selector_compounds == 0 {
            return Err(TrellisError::Config(
                "max_selector_compounds must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
