//! Collaborators the strategies consult: the cluster's claim directory and
//! the workspace metadata store. Both are blocking from the engine's point of
//! view and are expected to handle their own retries.

use crate::workload::PersistentVolumeClaim;
use vol_core::error::Result;

/// Label carrying the owning workspace id.
pub const WORKSPACE_ID_LABEL: &str = "volumes.workspace.io/workspace-id";

/// Label carrying the logical volume name a claim backs.
pub const VOLUME_NAME_LABEL: &str = "volumes.workspace.io/volume-name";

/// Workspace attribute that asks for sources to be persisted.
pub const MOUNT_SOURCES_ATTRIBUTE: &str = "mountSources";

/// Storage objects already present in the cluster namespace.
pub trait ClaimDirectory: Send + Sync {
    /// All claims whose label `key` equals `value`.
    fn list_by_label(&self, key: &str, value: &str) -> Result<Vec<PersistentVolumeClaim>>;

    /// Delete all claims whose label `key` equals `value`, returning their names.
    fn delete_by_label(&self, key: &str, value: &str) -> Result<Vec<String>>;
}

/// Workspace metadata lookups.
pub trait WorkspaceStore: Send + Sync {
    /// Value of attribute `key` of the workspace's config.
    ///
    /// Returns `Err(VolumeError::NotFound)` for an unknown workspace and
    /// `Err(VolumeError::Infrastructure)` when the store cannot be queried.
    fn get_attribute(&self, workspace_id: &str, key: &str) -> Result<Option<String>>;
}
