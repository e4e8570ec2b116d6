//! Desired workload document.
//!
//! An in-memory, Kubernetes-shaped description of one workspace's pods, the
//! volumes each machine declares, and the claims that should exist. Strategies
//! mutate it in place; the caller submits the result to the cluster.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use vol_config::AccessMode;
use vol_core::error::Result;

/// Annotation prefix naming the machine a container belongs to.
///
/// The full key is `volumes.workspace.io/machine-name.<container>`.
pub const MACHINE_NAME_ANNOTATION_PREFIX: &str = "volumes.workspace.io/machine-name.";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

impl VolumeMount {
    pub fn new(
        name: impl Into<String>,
        mount_path: impl Into<String>,
        sub_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mount_path: mount_path.into(),
            sub_path: Some(sub_path.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

impl Container {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume_mounts: Vec::new(),
        }
    }

    /// Whether some mount already binds `mount_path`.
    pub fn has_mount_path(&self, mount_path: &str) -> bool {
        self.volume_mounts.iter().any(|m| m.mount_path == mount_path)
    }

    /// Adds `mount` unless its path is already bound. Returns whether it was added.
    pub fn add_mount_if_absent(&mut self, mount: VolumeMount) -> bool {
        if self.has_mount_path(&mount.mount_path) {
            return false;
        }
        self.volume_mounts.push(mount);
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmptyDirVolumeSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimVolumeSource {
    pub claim_name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

/// Backing store of a pod-level volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    EmptyDir(EmptyDirVolumeSource),
    PersistentVolumeClaim(PersistentVolumeClaimVolumeSource),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodVolume {
    pub name: String,
    #[serde(flatten)]
    pub source: VolumeSource,
}

impl PodVolume {
    pub fn empty_dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::EmptyDir(EmptyDirVolumeSource::default()),
        }
    }

    /// A pod volume named after the claim it references.
    pub fn claim(claim_name: impl Into<String>) -> Self {
        let claim_name = claim_name.into();
        Self {
            name: claim_name.clone(),
            source: VolumeSource::PersistentVolumeClaim(PersistentVolumeClaimVolumeSource {
                claim_name,
                read_only: false,
            }),
        }
    }

    pub fn is_empty_dir(&self) -> bool {
        matches!(self.source, VolumeSource::EmptyDir(_))
    }

    pub fn claim_name(&self) -> Option<&str> {
        match &self.source {
            VolumeSource::PersistentVolumeClaim(pvc) => Some(&pvc.claim_name),
            VolumeSource::EmptyDir(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<PodVolume>,
}

impl PodSpec {
    pub fn has_volume(&self, name: &str) -> bool {
        self.volumes.iter().any(|v| v.name == name)
    }

    /// Adds `volume` unless one with the same name exists. Returns whether it was added.
    pub fn add_volume_if_absent(&mut self, volume: PodVolume) -> bool {
        if self.has_volume(&volume.name) {
            return false;
        }
        self.volumes.push(volume);
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pod {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
}

impl Pod {
    pub fn new(name: impl Into<String>, containers: Vec<Container>) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec: PodSpec {
                containers,
                volumes: Vec::new(),
            },
        }
    }

    /// Tags `container` as belonging to `machine_name`.
    pub fn with_machine_name(mut self, container: &str, machine_name: &str) -> Self {
        self.metadata.annotations.insert(
            format!("{}{}", MACHINE_NAME_ANNOTATION_PREFIX, container),
            machine_name.to_string(),
        );
        self
    }

    /// Machine name of a container: its annotation when present, else `<pod>/<container>`.
    pub fn machine_name(&self, container_name: &str) -> String {
        let key = format!("{}{}", MACHINE_NAME_ANNOTATION_PREFIX, container_name);
        match self.metadata.annotations.get(&key) {
            Some(name) => name.clone(),
            None => format!("{}/{}", self.metadata.name, container_name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSpec {
    pub access_modes: Vec<AccessMode>,
    pub storage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistentVolumeClaim {
    pub metadata: ObjectMeta,
    pub spec: ClaimSpec,
}

impl PersistentVolumeClaim {
    pub fn new(name: impl Into<String>, access_mode: AccessMode, quantity: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec: ClaimSpec {
                access_modes: vec![access_mode],
                storage: quantity.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }

    pub fn put_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.labels.insert(key.into(), value.into());
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put_label(key, value);
        self
    }
}

/// A volume a machine asks for, keyed by logical name in [`MachineConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeDeclaration {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineConfig {
    #[serde(default)]
    pub volumes: BTreeMap<String, VolumeDeclaration>,
}

impl MachineConfig {
    pub fn with_volume(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.volumes
            .insert(name.into(), VolumeDeclaration { path: path.into() });
        self
    }
}

/// Identity of the runtime being provisioned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeIdentity {
    pub workspace_id: String,
    #[serde(default)]
    pub env_name: String,
    #[serde(default)]
    pub owner_id: String,
}

impl RuntimeIdentity {
    pub fn for_workspace(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            ..Default::default()
        }
    }
}

/// The desired state of one workspace for one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadEnvironment {
    #[serde(default)]
    pub pods: BTreeMap<String, Pod>,
    #[serde(default)]
    pub machines: BTreeMap<String, MachineConfig>,
    #[serde(default)]
    pub persistent_volume_claims: BTreeMap<String, PersistentVolumeClaim>,
    /// Sub-paths to create inside durable claims before pods start
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub subpaths: BTreeSet<String>,
}

impl WorkloadEnvironment {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn add_pod(&mut self, pod: Pod) {
        self.pods.insert(pod.metadata.name.clone(), pod);
    }

    pub fn add_machine(&mut self, name: impl Into<String>, machine: MachineConfig) {
        self.machines.insert(name.into(), machine);
    }

    /// Number of pod-level volumes across all pods.
    pub fn volume_count(&self) -> usize {
        self.pods.values().map(|p| p.spec.volumes.len()).sum()
    }

    /// Number of container mounts across all pods.
    pub fn mount_count(&self) -> usize {
        self.pods
            .values()
            .flat_map(|p| p.spec.containers.iter())
            .map(|c| c.volume_mounts.len())
            .sum()
    }

    pub fn claim_names(&self) -> BTreeSet<String> {
        self.persistent_volume_claims.keys().cloned().collect()
    }

    pub fn container_mounts(&self, pod: &str, container: &str) -> Option<&[VolumeMount]> {
        self.pods
            .get(pod)?
            .spec
            .containers
            .iter()
            .find(|c| c.name == container)
            .map(|c| c.volume_mounts.as_slice())
    }

    pub fn pod_volumes(&self, pod: &str) -> Option<&[PodVolume]> {
        self.pods.get(pod).map(|p| p.spec.volumes.as_slice())
    }
}
