//! Roster configuration

use std::fmt;
use std::str::FromStr;

use roster_client::MemberRole;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};

/// How experience references are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Substitute every reference right after load
    #[default]
    Eager,
    /// Query a user's experiences when their row is expanded
    Lazy,
}

impl FromStr for ResolveMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eager" => Ok(ResolveMode::Eager),
            "lazy" => Ok(ResolveMode::Lazy),
            other => Err(format!("unknown resolve mode '{}', expected eager or lazy", other)),
        }
    }
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveMode::Eager => f.write_str("eager"),
            ResolveMode::Lazy => f.write_str("lazy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub resolve_mode: ResolveMode,

    /// Concurrent `get` calls during eager resolution
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Role matched by lazy per-user queries
    #[serde(default)]
    pub member_role: MemberRole,
}

fn default_max_in_flight() -> usize { 8 }

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            resolve_mode: ResolveMode::default(),
            max_in_flight: default_max_in_flight(),
            member_role: MemberRole::default(),
        }
    }
}

impl RosterConfig {
    pub fn eager() -> Self {
        Self::default()
    }

    pub fn lazy() -> Self {
        Self {
            resolve_mode: ResolveMode::Lazy,
            ..Default::default()
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(RosterError::Config("max_in_flight must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: RosterConfig = toml::from_str("").unwrap();
        assert_eq!(config, RosterConfig::default());
        assert_eq!(config.resolve_mode, ResolveMode::Eager);
        assert_eq!(config.member_role, MemberRole::Any);
    }

    #[test]
    fn test_lazy_from_toml() {
        let config: RosterConfig = toml::from_str(
            r#"
resolve_mode = "lazy"
max_in_flight = 2
member_role = "owner"
"#,
        )
        .unwrap();

        assert_eq!(config.resolve_mode, ResolveMode::Lazy);
        assert_eq!(config.max_in_flight, 2);
        assert_eq!(config.member_role, MemberRole::Owner);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("LAZY".parse::<ResolveMode>().unwrap(), ResolveMode::Lazy);
        assert!("sometimes".parse::<ResolveMode>().is_err());
    }

    #[test]
    fn test_zero_in_flight_rejected() {
        assert!(RosterConfig::default().with_max_in_flight(0).validate().is_err());
    }
}
