use super::{for_each_declared_volume, VolumesStrategy};
use crate::workload::{PodVolume, RuntimeIdentity, VolumeMount, WorkloadEnvironment};
use tracing::debug;
use vol_config::validate::validate_name_prefix;
use vol_config::EMPTY_DIR_STRATEGY;
use vol_core::error::Result;
use vol_core::names::{generate_name, sub_path};

/// Backs every declared volume with an `emptyDir` that lives as long as the pod.
///
/// Nothing durable is created, so `prepare` and `cleanup` have nothing to do
/// and data does not survive a workspace restart.
#[derive(Debug, Clone)]
pub struct EmptyDirStrategy {
    volume_name_prefix: String,
}

impl EmptyDirStrategy {
    /// Fails with a configuration error when the prefix is blank or not a valid name.
    pub fn new(volume_name_prefix: impl Into<String>) -> Result<Self> {
        let volume_name_prefix = volume_name_prefix.into();
        validate_name_prefix(&volume_name_prefix)?;
        Ok(Self { volume_name_prefix })
    }

    pub fn volume_name_prefix(&self) -> &str {
        &self.volume_name_prefix
    }
}

impl VolumesStrategy for EmptyDirStrategy {
    fn name(&self) -> &'static str {
        EMPTY_DIR_STRATEGY
    }

    fn prepare(&self, _env: &mut WorkloadEnvironment, _workspace_id: &str) -> Result<()> {
        Ok(())
    }

    fn provision(&self, env: &mut WorkloadEnvironment, identity: &RuntimeIdentity) -> Result<()> {
        let workspace_id = identity.workspace_id.as_str();
        let WorkloadEnvironment { pods, machines, .. } = env;

        for_each_declared_volume(pods, machines, |pod, index, volume| {
            let container = &mut pod.spec.containers[index];
            let path = volume.declaration.path.as_str();
            if container.has_mount_path(path) {
                debug!(
                    "{} already mounted in {}; skipping",
                    path, volume.machine_name
                );
                return Ok(());
            }

            let unique_name = generate_name(&self.volume_name_prefix);
            container.add_mount_if_absent(VolumeMount::new(
                unique_name.clone(),
                path,
                sub_path(workspace_id, volume.volume_name, volume.machine_name),
            ));
            pod.spec.add_volume_if_absent(PodVolume::empty_dir(unique_name));
            Ok(())
        })
    }

    fn cleanup(&self, _workspace_id: &str) -> Result<()> {
        Ok(())
    }
}
