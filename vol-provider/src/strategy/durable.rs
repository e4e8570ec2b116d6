use super::{for_each_declared_volume, VolumesStrategy};
use crate::directory::{ClaimDirectory, VOLUME_NAME_LABEL, WORKSPACE_ID_LABEL};
use crate::workload::{
    PersistentVolumeClaim, PodVolume, RuntimeIdentity, VolumeMount, WorkloadEnvironment,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use vol_config::validate::{validate_name_prefix, validate_quantity};
use vol_config::{AccessMode, ClaimSettings, COMMON_STRATEGY};
use vol_core::error::Result;
use vol_core::names::{generate_name, sub_path};

/// Backs each logical volume of a workspace with its own persistent claim.
///
/// Claims outlive the pod and are reused on every later pass: before creating
/// one, `provision` looks for a claim already on the cluster for the same
/// workspace and volume name, then for one added to the document earlier in
/// the same pass.
pub struct DurableClaimStrategy {
    claim_name_prefix: String,
    quantity: String,
    access_mode: AccessMode,
    precreate_subpaths: bool,
    claims: Arc<dyn ClaimDirectory>,
}

impl std::fmt::Debug for DurableClaimStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableClaimStrategy")
            .field("claim_name_prefix", &self.claim_name_prefix)
            .field("quantity", &self.quantity)
            .field("access_mode", &self.access_mode)
            .field("precreate_subpaths", &self.precreate_subpaths)
            .finish_non_exhaustive()
    }
}

impl DurableClaimStrategy {
    /// Fails with a configuration error when the prefix or quantity is invalid.
    pub fn new(settings: &ClaimSettings, claims: Arc<dyn ClaimDirectory>) -> Result<Self> {
        validate_name_prefix(&settings.name)?;
        validate_quantity(&settings.quantity)?;
        Ok(Self {
            claim_name_prefix: settings.name.clone(),
            quantity: settings.quantity.clone(),
            access_mode: settings.access_mode,
            precreate_subpaths: settings.precreate_subpaths,
            claims,
        })
    }

    fn new_claim(&self, workspace_id: &str, volume_name: &str) -> PersistentVolumeClaim {
        PersistentVolumeClaim::new(
            generate_name(&self.claim_name_prefix),
            self.access_mode,
            self.quantity.clone(),
        )
        .with_label(WORKSPACE_ID_LABEL, workspace_id)
        .with_label(VOLUME_NAME_LABEL, volume_name)
    }
}

/// Groups claims by their volume-name label.
///
/// Claims without the label cannot be matched to a volume and are ignored.
fn group_by_volume_name<'a>(
    claims: impl IntoIterator<Item = &'a PersistentVolumeClaim>,
) -> HashMap<String, String> {
    claims
        .into_iter()
        .filter_map(|claim| {
            claim
                .label(VOLUME_NAME_LABEL)
                .map(|volume| (volume.to_string(), claim.name().to_string()))
        })
        .collect()
}

impl VolumesStrategy for DurableClaimStrategy {
    fn name(&self) -> &'static str {
        COMMON_STRATEGY
    }

    fn prepare(&self, env: &mut WorkloadEnvironment, workspace_id: &str) -> Result<()> {
        if !self.precreate_subpaths {
            return Ok(());
        }

        let WorkloadEnvironment {
            pods,
            machines,
            subpaths,
            ..
        } = env;
        for_each_declared_volume(pods, machines, |_, _, volume| {
            subpaths.insert(sub_path(workspace_id, volume.volume_name, volume.machine_name));
            Ok(())
        })?;
        debug!("{} sub-paths queued for workspace {}", subpaths.len(), workspace_id);
        Ok(())
    }

    fn provision(&self, env: &mut WorkloadEnvironment, identity: &RuntimeIdentity) -> Result<()> {
        let workspace_id = identity.workspace_id.as_str();

        let on_cluster = self.claims.list_by_label(WORKSPACE_ID_LABEL, workspace_id)?;
        let existing = group_by_volume_name(
            on_cluster
                .iter()
                .filter(|claim| claim.label(WORKSPACE_ID_LABEL) == Some(workspace_id)),
        );

        let WorkloadEnvironment {
            pods,
            machines,
            persistent_volume_claims,
            ..
        } = env;

        for_each_declared_volume(pods, machines, |pod, index, volume| {
            let path = volume.declaration.path.as_str();
            if pod.spec.containers[index].has_mount_path(path) {
                debug!(
                    "{} already mounted in {}; skipping",
                    path, volume.machine_name
                );
                return Ok(());
            }

            // Claims added by earlier declarations of this pass.
            let provisioned = group_by_volume_name(persistent_volume_claims.values());
            let claim_name = if let Some(name) = existing.get(volume.volume_name) {
                name.clone()
            } else if let Some(name) = provisioned.get(volume.volume_name) {
                name.clone()
            } else {
                let claim = self.new_claim(workspace_id, volume.volume_name);
                let name = claim.name().to_string();
                debug!("New claim {} for volume {}", name, volume.volume_name);
                persistent_volume_claims.insert(name.clone(), claim);
                name
            };

            pod.spec.containers[index].add_mount_if_absent(VolumeMount::new(
                claim_name.clone(),
                path,
                sub_path(workspace_id, volume.volume_name, volume.machine_name),
            ));
            pod.spec.add_volume_if_absent(PodVolume::claim(claim_name));
            Ok(())
        })
    }

    fn cleanup(&self, workspace_id: &str) -> Result<()> {
        let released = self.claims.delete_by_label(WORKSPACE_ID_LABEL, workspace_id)?;
        info!(
            "Released {} claim(s) of workspace {}: {}",
            released.len(),
            workspace_id,
            released.join(", ")
        );
        Ok(())
    }
}
