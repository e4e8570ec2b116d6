// Standard library imports
use std::env;
use std::fs;
use std::path::Path;

// External crate imports
use tracing::debug;

// Internal imports
use crate::config::VolumesConfig;
use vol_core::error::{Result, VolumeError};

pub const ENV_STRATEGY: &str = "VOL_STRATEGY";
pub const ENV_EPHEMERAL_OVERRIDE: &str = "VOL_EPHEMERAL_OVERRIDE";
pub const ENV_CLAIM_NAME: &str = "VOL_CLAIM_NAME";
pub const ENV_CLAIM_QUANTITY: &str = "VOL_CLAIM_QUANTITY";
pub const ENV_CLAIM_ACCESS_MODE: &str = "VOL_CLAIM_ACCESS_MODE";
pub const ENV_PRECREATE_SUBPATHS: &str = "VOL_PRECREATE_SUBPATHS";

/// Loads [`VolumesConfig`] with a fixed priority chain:
/// 1. **Defaults** for every field.
/// 2. **File:** the YAML file, when a path is given.
/// 3. **Environment:** `VOL_*` variables override individual fields.
///
/// The result is validated before it is returned.
#[derive(Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, path: Option<&Path>) -> Result<VolumesConfig> {
        let mut config = match path {
            Some(path) => self.load_file(path)?,
            None => VolumesConfig::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn load_file(&self, path: &Path) -> Result<VolumesConfig> {
        debug!("Loading volumes config from: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            VolumeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        VolumesConfig::from_yaml(&contents).map_err(|e| {
            VolumeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(VolumeError::Config(format!(
            "Invalid boolean '{}' for {}",
            value, key
        ))),
    }
}

/// Apply `VOL_*` environment overrides on top of `config`.
pub fn apply_env_overrides(config: &mut VolumesConfig) -> Result<()> {
    if let Ok(strategy) = env::var(ENV_STRATEGY) {
        config.strategy = strategy;
    }
    if let Ok(value) = env::var(ENV_EPHEMERAL_OVERRIDE) {
        config.ephemeral_override = parse_bool(ENV_EPHEMERAL_OVERRIDE, &value)?;
    }
    if let Ok(name) = env::var(ENV_CLAIM_NAME) {
        config.claim.name = name;
    }
    if let Ok(quantity) = env::var(ENV_CLAIM_QUANTITY) {
        config.claim.quantity = quantity;
    }
    if let Ok(mode) = env::var(ENV_CLAIM_ACCESS_MODE) {
        config.claim.access_mode = mode.parse()?;
    }
    if let Ok(value) = env::var(ENV_PRECREATE_SUBPATHS) {
        config.claim.precreate_subpaths = parse_bool(ENV_PRECREATE_SUBPATHS, &value)?;
    }
    Ok(())
}

impl VolumesConfig {
    /// Load from an optional YAML file plus environment overrides, validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        ConfigLoader::new().load(path)
    }
}
