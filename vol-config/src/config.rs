//! Volume provisioning configuration.
//!
//! ```yaml
//! strategy: common
//! ephemeral_override: true
//! claim:
//!   name: claim-workspace
//!   quantity: 10Gi
//!   access_mode: ReadWriteOnce
//!   precreate_subpaths: true
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vol_core::error::VolumeError;

/// Registry key of the no-op strategy.
pub const NONE_STRATEGY: &str = "none";
/// Registry key of the transient, emptyDir-backed strategy.
pub const EMPTY_DIR_STRATEGY: &str = "emptyDir";
/// Registry key of the durable claim strategy.
pub const COMMON_STRATEGY: &str = "common";

/// Kubernetes access mode of a persistent claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    #[default]
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::ReadWriteOnce => write!(f, "ReadWriteOnce"),
            AccessMode::ReadOnlyMany => write!(f, "ReadOnlyMany"),
            AccessMode::ReadWriteMany => write!(f, "ReadWriteMany"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ReadWriteOnce" => Ok(AccessMode::ReadWriteOnce),
            "ReadOnlyMany" => Ok(AccessMode::ReadOnlyMany),
            "ReadWriteMany" => Ok(AccessMode::ReadWriteMany),
            _ => Err(VolumeError::Config(format!(
                "Invalid access mode '{}'. Use ReadWriteOnce, ReadOnlyMany or ReadWriteMany",
                s
            ))),
        }
    }
}

/// Settings for claims and generated mount names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimSettings {
    /// Prefix of every generated claim and mount name
    #[serde(default = "default_claim_name")]
    pub name: String,

    /// Requested capacity of new claims
    #[serde(default = "default_quantity")]
    pub quantity: String,

    #[serde(default)]
    pub access_mode: AccessMode,

    /// Record workspace sub-paths for creation before pods start
    #[serde(default = "default_true")]
    pub precreate_subpaths: bool,
}

fn default_claim_name() -> String {
    "claim-workspace".to_string()
}

fn default_quantity() -> String {
    "10Gi".to_string()
}

fn default_true() -> bool {
    true
}

fn default_strategy() -> String {
    COMMON_STRATEGY.to_string()
}

impl Default for ClaimSettings {
    fn default() -> Self {
        Self {
            name: default_claim_name(),
            quantity: default_quantity(),
            access_mode: AccessMode::default(),
            precreate_subpaths: true,
        }
    }
}

/// Root configuration of the volume provisioning engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumesConfig {
    /// Registry key of the strategy to use
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Route workspaces without `mountSources: true` to transient storage
    #[serde(default = "default_true")]
    pub ephemeral_override: bool,

    #[serde(default)]
    pub claim: ClaimSettings,
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            ephemeral_override: true,
            claim: ClaimSettings::default(),
        }
    }
}

impl VolumesConfig {
    /// Config using the given strategy key and defaults elsewhere.
    pub fn with_strategy(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Default::default()
        }
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> vol_core::Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }
}
