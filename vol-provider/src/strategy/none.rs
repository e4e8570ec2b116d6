use super::VolumesStrategy;
use crate::workload::{RuntimeIdentity, WorkloadEnvironment};
use vol_config::NONE_STRATEGY;
use vol_core::error::Result;

/// Leaves the document untouched: declared volumes get no backing storage.
#[derive(Debug, Default, Clone)]
pub struct NoneStrategy;

impl NoneStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl VolumesStrategy for NoneStrategy {
    fn name(&self) -> &'static str {
        NONE_STRATEGY
    }

    fn prepare(&self, _env: &mut WorkloadEnvironment, _workspace_id: &str) -> Result<()> {
        Ok(())
    }

    fn provision(&self, _env: &mut WorkloadEnvironment, _identity: &RuntimeIdentity) -> Result<()> {
        Ok(())
    }

    fn cleanup(&self, _workspace_id: &str) -> Result<()> {
        Ok(())
    }
}
