use crate::config::{ClaimSettings, VolumesConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use vol_core::error::{Result, VolumeError};
use vol_core::names::NAME_SUFFIX_LENGTH;

/// Longest Kubernetes object name a generated claim may have.
pub const MAX_OBJECT_NAME_LENGTH: usize = 63;

/// Lowercase RFC 1123 label, the shape every generated name must keep
static NAME_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$")
        .expect("Name prefix regex should compile - this is a static pattern")
});

/// Kubernetes resource quantity, e.g. `10Gi`, `500M`, `1.5Ti`
static QUANTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+)?(Ki|Mi|Gi|Ti|Pi|Ei|k|M|G|T|P|E)?$")
        .expect("Quantity regex should compile - this is a static pattern")
});

/// Validate a prefix used for generated claim and mount names.
pub fn validate_name_prefix(prefix: &str) -> Result<()> {
    if prefix.trim().is_empty() {
        return Err(VolumeError::Config(
            "Missing required field: claim.name (naming prefix)".to_string(),
        ));
    }

    if !NAME_PREFIX_REGEX.is_match(prefix) {
        return Err(VolumeError::Config(format!(
            "Invalid claim name prefix '{}': use lowercase letters, digits and '-'",
            prefix
        )));
    }

    let max_prefix = MAX_OBJECT_NAME_LENGTH - NAME_SUFFIX_LENGTH - 1;
    if prefix.len() > max_prefix {
        return Err(VolumeError::Config(format!(
            "Claim name prefix '{}' is {} characters; at most {} are allowed",
            prefix,
            prefix.len(),
            max_prefix
        )));
    }

    Ok(())
}

/// Validate a requested claim capacity.
pub fn validate_quantity(quantity: &str) -> Result<()> {
    if !QUANTITY_REGEX.is_match(quantity) {
        return Err(VolumeError::Config(format!(
            "Invalid claim quantity '{}'",
            quantity
        )));
    }
    Ok(())
}

pub struct ConfigValidator<'a> {
    config: &'a VolumesConfig,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(config: &'a VolumesConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_strategy()?;
        self.validate_claim(&self.config.claim)?;
        Ok(())
    }

    fn validate_strategy(&self) -> Result<()> {
        if self.config.strategy.trim().is_empty() {
            return Err(VolumeError::Config(
                "Missing required field: strategy".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_claim(&self, claim: &ClaimSettings) -> Result<()> {
        validate_name_prefix(&claim.name)?;
        validate_quantity(&claim.quantity)?;
        Ok(())
    }
}

impl VolumesConfig {
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::new(self).validate()
    }
}
