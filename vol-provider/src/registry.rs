//! Named-strategy registry.

use crate::directory::{ClaimDirectory, WorkspaceStore};
use crate::strategy::{
    DurableClaimStrategy, EmptyDirStrategy, EphemeralOverrideStrategy, NoneStrategy,
    VolumesStrategy,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use vol_config::{VolumesConfig, COMMON_STRATEGY, EMPTY_DIR_STRATEGY, NONE_STRATEGY};
use vol_core::error::{Result, VolumeError};

/// External collaborators the built-in strategies need.
#[derive(Clone)]
pub struct StrategyDeps {
    pub claims: Arc<dyn ClaimDirectory>,
    pub workspaces: Arc<dyn WorkspaceStore>,
}

impl StrategyDeps {
    pub fn new(claims: Arc<dyn ClaimDirectory>, workspaces: Arc<dyn WorkspaceStore>) -> Self {
        Self { claims, workspaces }
    }
}

/// Strategies keyed by policy string.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn VolumesStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `none`, `emptyDir` and `common`.
    ///
    /// `common` is wrapped in [`EphemeralOverrideStrategy`] when
    /// `config.ephemeral_override` is set.
    pub fn with_defaults(config: &VolumesConfig, deps: &StrategyDeps) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(NONE_STRATEGY, Arc::new(NoneStrategy::new()));
        registry.register(
            EMPTY_DIR_STRATEGY,
            Arc::new(EmptyDirStrategy::new(config.claim.name.clone())?),
        );

        let durable = DurableClaimStrategy::new(&config.claim, deps.claims.clone())?;
        let common: Arc<dyn VolumesStrategy> = if config.ephemeral_override {
            Arc::new(EphemeralOverrideStrategy::new(
                Box::new(durable),
                EmptyDirStrategy::new(config.claim.name.clone())?,
                deps.workspaces.clone(),
            ))
        } else {
            Arc::new(durable)
        };
        registry.register(COMMON_STRATEGY, common);

        Ok(registry)
    }

    /// Adds or replaces the strategy under `key`.
    pub fn register(&mut self, key: impl Into<String>, strategy: Arc<dyn VolumesStrategy>) {
        let key = key.into();
        debug!("Registering volumes strategy {}", key);
        self.strategies.insert(key, strategy);
    }

    pub fn get(&self, key: &str) -> Result<Arc<dyn VolumesStrategy>> {
        self.strategies.get(key).cloned().ok_or_else(|| {
            VolumeError::Config(format!(
                "Unknown volumes strategy: {} (available: {})",
                key,
                self.keys().join(", ")
            ))
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }
}

/// Creates the strategy selected by `config.strategy`.
pub fn get_strategy(config: &VolumesConfig, deps: &StrategyDeps) -> Result<Arc<dyn VolumesStrategy>> {
    StrategyRegistry::with_defaults(config, deps)?.get(&config.strategy)
}
