//! CLI configuration

use std::path::Path;

use roster_client::StoreConfig;
use roster_sdk::{ResolveMode, RosterConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Contents of `roster.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub roster: RosterConfig,
}

/// Command-line values that win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub mode: Option<ResolveMode>,
}

impl CliConfig {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: CliConfig = toml::from_str(content)?;
        config.roster.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(base_url) = overrides.base_url {
            self.store.base_url = base_url;
        }
        if let Some(mode) = overrides.mode {
            self.roster.resolve_mode = mode;
        }
    }
}
