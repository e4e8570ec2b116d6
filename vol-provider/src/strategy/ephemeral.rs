use super::{EmptyDirStrategy, VolumesStrategy};
use crate::directory::{WorkspaceStore, MOUNT_SOURCES_ATTRIBUTE};
use crate::workload::{RuntimeIdentity, WorkloadEnvironment};
use std::sync::Arc;
use tracing::debug;
use vol_core::error::{Result, VolumeError};

/// Routes each workspace to durable or transient storage.
///
/// A workspace is ephemeral unless its `mountSources` attribute parses as
/// `true`. A missing attribute, any other value, or a workspace the store
/// does not know all count as ephemeral. Ephemeral workspaces get the
/// `emptyDir` strategy for all three operations; the rest are delegated to
/// the wrapped durable strategy unchanged.
pub struct EphemeralOverrideStrategy {
    durable: Box<dyn VolumesStrategy>,
    transient: EmptyDirStrategy,
    workspaces: Arc<dyn WorkspaceStore>,
}

impl EphemeralOverrideStrategy {
    pub fn new(
        durable: Box<dyn VolumesStrategy>,
        transient: EmptyDirStrategy,
        workspaces: Arc<dyn WorkspaceStore>,
    ) -> Self {
        Self {
            durable,
            transient,
            workspaces,
        }
    }

    /// Whether `workspace_id` should get transient storage.
    ///
    /// Store failures other than "not found" are returned as infrastructure
    /// errors: guessing would route the workspace to the wrong storage.
    pub fn is_ephemeral(&self, workspace_id: &str) -> Result<bool> {
        match self
            .workspaces
            .get_attribute(workspace_id, MOUNT_SOURCES_ATTRIBUTE)
        {
            Ok(value) => Ok(!parse_bool(value.as_deref())),
            Err(e) if e.is_not_found() => {
                debug!("Workspace {} not found; treating as ephemeral", workspace_id);
                Ok(true)
            }
            Err(e) => Err(VolumeError::Infrastructure(format!(
                "Failed to load workspace info for {}: {}",
                workspace_id, e
            ))),
        }
    }

    fn route(&self, workspace_id: &str) -> Result<&dyn VolumesStrategy> {
        if self.is_ephemeral(workspace_id)? {
            Ok(&self.transient)
        } else {
            Ok(self.durable.as_ref())
        }
    }
}

/// `true` only for a case-insensitive "true".
fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

impl VolumesStrategy for EphemeralOverrideStrategy {
    fn name(&self) -> &'static str {
        self.durable.name()
    }

    fn prepare(&self, env: &mut WorkloadEnvironment, workspace_id: &str) -> Result<()> {
        self.route(workspace_id)?.prepare(env, workspace_id)
    }

    fn provision(&self, env: &mut WorkloadEnvironment, identity: &RuntimeIdentity) -> Result<()> {
        self.route(&identity.workspace_id)?.provision(env, identity)
    }

    fn cleanup(&self, workspace_id: &str) -> Result<()> {
        self.route(workspace_id)?.cleanup(workspace_id)
    }

    fn resolve(&self, workspace_id: &str) -> Result<Option<&dyn VolumesStrategy>> {
        self.route(workspace_id).map(Some)
    }
}
