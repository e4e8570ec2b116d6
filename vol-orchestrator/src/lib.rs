//! Workspace volume reconciliation
//!
//! Runs the selected volumes strategy against a workspace's desired workload
//! document and releases its storage when the workspace goes away. It is
//! meant to be called by the workload builder right before submission.

pub mod reconciler;

pub use reconciler::{ReconcileReport, VolumeReconciler};
pub use vol_core::error::{Result, VolumeError};
