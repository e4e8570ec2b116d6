//! Workspace volume provisioning strategies.
//!
//! This library maps the volumes each machine of a workspace declares onto
//! cluster storage. It defines the desired workload document, the
//! collaborator traits for the claim directory and workspace metadata, the
//! strategy trait with its built-in variants, and the registry that selects a
//! strategy by policy string.

pub mod directory;
pub mod memory;
pub mod registry;
pub mod strategy;
pub mod workload;

pub use directory::{ClaimDirectory, WorkspaceStore};
pub use registry::{get_strategy, StrategyDeps, StrategyRegistry};
pub use strategy::{
    DurableClaimStrategy, EmptyDirStrategy, EphemeralOverrideStrategy, NoneStrategy,
    VolumesStrategy,
};
pub use vol_core::error::{Result as VolResult, VolumeError};
pub use workload::{RuntimeIdentity, WorkloadEnvironment};
