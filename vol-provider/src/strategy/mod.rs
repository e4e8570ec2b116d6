//! Workspace volume strategies.
//!
//! A strategy maps the volumes each machine declares onto backing storage and
//! rewrites the desired workload document accordingly. Strategies never talk
//! to the cluster to create objects; they only decide what should exist.

use crate::workload::{MachineConfig, Pod, RuntimeIdentity, VolumeDeclaration, WorkloadEnvironment};
use std::collections::BTreeMap;
use tracing::debug;
use vol_core::error::Result;

pub mod durable;
pub mod empty_dir;
pub mod ephemeral;
pub mod none;

pub use durable::DurableClaimStrategy;
pub use empty_dir::EmptyDirStrategy;
pub use ephemeral::EphemeralOverrideStrategy;
pub use none::NoneStrategy;

/// The core trait for all volume strategies.
///
/// Calls for one workspace are made sequentially by a single caller; the
/// document is never shared between workspaces.
pub trait VolumesStrategy: Send + Sync {
    /// Registry key of the strategy (e.g., "none", "emptyDir").
    fn name(&self) -> &'static str;

    /// Hook run once per pass before the first `provision`.
    fn prepare(&self, env: &mut WorkloadEnvironment, workspace_id: &str) -> Result<()>;

    /// Bind every declared volume of every machine to backing storage.
    ///
    /// Calling it again on the same document must not add duplicate pod
    /// volumes, claims, or mounts.
    fn provision(&self, env: &mut WorkloadEnvironment, identity: &RuntimeIdentity) -> Result<()>;

    /// Release durable storage created for the workspace.
    fn cleanup(&self, workspace_id: &str) -> Result<()>;

    /// The strategy this one routes `workspace_id` to, if it substitutes per workspace.
    ///
    /// Lets a caller resolve the substitution once per pass instead of on
    /// every operation.
    fn resolve(&self, _workspace_id: &str) -> Result<Option<&dyn VolumesStrategy>> {
        Ok(None)
    }
}

/// One declared volume of one container, as seen while walking a document.
pub(crate) struct DeclaredVolume<'a> {
    pub machine_name: &'a str,
    pub volume_name: &'a str,
    pub declaration: &'a VolumeDeclaration,
}

/// Calls `visit` for every declared volume of every container, in pod-name,
/// container, then volume-name order.
///
/// Containers whose machine declares nothing are skipped.
pub(crate) fn for_each_declared_volume<F>(
    pods: &mut BTreeMap<String, Pod>,
    machines: &BTreeMap<String, MachineConfig>,
    mut visit: F,
) -> Result<()>
where
    F: FnMut(&mut Pod, usize, DeclaredVolume<'_>) -> Result<()>,
{
    for pod in pods.values_mut() {
        for index in 0..pod.spec.containers.len() {
            let machine_name = pod.machine_name(&pod.spec.containers[index].name);
            let Some(machine) = machines.get(&machine_name) else {
                debug!("No machine config for {}; nothing to mount", machine_name);
                continue;
            };
            for (volume_name, declaration) in &machine.volumes {
                visit(
                    pod,
                    index,
                    DeclaredVolume {
                        machine_name: &machine_name,
                        volume_name,
                        declaration,
                    },
                )?;
            }
        }
    }
    Ok(())
}
