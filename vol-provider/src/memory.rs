//! In-memory collaborators.
//!
//! Used by tests and by embedders that want to plan volumes without a
//! cluster. Both types can be told to fail every call to exercise error paths.

use crate::directory::{ClaimDirectory, WorkspaceStore};
use crate::workload::PersistentVolumeClaim;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use vol_core::error::{Result, VolumeError};

fn poisoned(what: &str) -> VolumeError {
    VolumeError::Internal(format!("{} lock poisoned", what))
}

/// Claims held in a map keyed by claim name.
#[derive(Debug, Default)]
pub struct InMemoryClaimDirectory {
    claims: RwLock<BTreeMap<String, PersistentVolumeClaim>>,
    unavailable: AtomicBool,
}

impl InMemoryClaimDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_claims(claims: impl IntoIterator<Item = PersistentVolumeClaim>) -> Self {
        let directory = Self::new();
        for claim in claims {
            directory.insert(claim);
        }
        directory
    }

    pub fn insert(&self, claim: PersistentVolumeClaim) {
        self.claims
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(claim.metadata.name.clone(), claim);
    }

    /// Make every subsequent call fail with an infrastructure error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn names(&self) -> Vec<String> {
        self.claims
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.claims
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VolumeError::Infrastructure(
                "claim directory is unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl ClaimDirectory for InMemoryClaimDirectory {
    fn list_by_label(&self, key: &str, value: &str) -> Result<Vec<PersistentVolumeClaim>> {
        self.check_available()?;
        let claims = self.claims.read().map_err(|_| poisoned("claim directory"))?;
        Ok(claims
            .values()
            .filter(|claim| claim.label(key) == Some(value))
            .cloned()
            .collect())
    }

    fn delete_by_label(&self, key: &str, value: &str) -> Result<Vec<String>> {
        self.check_available()?;
        let mut claims = self.claims.write().map_err(|_| poisoned("claim directory"))?;
        let doomed: Vec<String> = claims
            .values()
            .filter(|claim| claim.label(key) == Some(value))
            .map(|claim| claim.metadata.name.clone())
            .collect();
        for name in &doomed {
            claims.remove(name);
        }
        Ok(doomed)
    }
}

/// Workspace attributes keyed by workspace id.
#[derive(Debug, Default)]
pub struct InMemoryWorkspaceStore {
    workspaces: RwLock<HashMap<String, HashMap<String, String>>>,
    unavailable: AtomicBool,
}

impl InMemoryWorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workspace with no attributes.
    pub fn add_workspace(&self, workspace_id: &str) {
        self.workspaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(workspace_id.to_string())
            .or_default();
    }

    pub fn set_attribute(&self, workspace_id: &str, key: &str, value: &str) {
        self.workspaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(workspace_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn with_attribute(self, workspace_id: &str, key: &str, value: &str) -> Self {
        self.set_attribute(workspace_id, key, value);
        self
    }

    /// Make every subsequent call fail with an infrastructure error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl WorkspaceStore for InMemoryWorkspaceStore {
    fn get_attribute(&self, workspace_id: &str, key: &str) -> Result<Option<String>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VolumeError::Infrastructure(
                "workspace store is unavailable".to_string(),
            ));
        }
        let workspaces = self
            .workspaces
            .read()
            .map_err(|_| poisoned("workspace store"))?;
        let attributes = workspaces
            .get(workspace_id)
            .ok_or_else(|| VolumeError::NotFound(format!("Workspace {}", workspace_id)))?;
        Ok(attributes.get(key).cloned())
    }
}
