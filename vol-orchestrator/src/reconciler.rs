use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, Span};
use vol_config::VolumesConfig;
use vol_core::error::Result;
use vol_provider::{get_strategy, RuntimeIdentity, StrategyDeps, VolumesStrategy, WorkloadEnvironment};

/// What one reconciliation pass added to the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub workspace_id: String,
    /// Name of the strategy that actually ran
    pub strategy: String,
    pub claims_added: usize,
    pub volumes_added: usize,
    pub mounts_added: usize,
    /// Sub-paths newly queued for creation
    pub subpaths: Vec<String>,
}

impl ReconcileReport {
    /// True when the pass left the document unchanged.
    pub fn is_noop(&self) -> bool {
        self.claims_added == 0
            && self.volumes_added == 0
            && self.mounts_added == 0
            && self.subpaths.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    claims: usize,
    volumes: usize,
    mounts: usize,
}

impl Snapshot {
    fn of(env: &WorkloadEnvironment) -> Self {
        Self {
            claims: env.persistent_volume_claims.len(),
            volumes: env.volume_count(),
            mounts: env.mount_count(),
        }
    }
}

/// Drives the volume lifecycle of workspaces through one strategy.
#[derive(Clone)]
pub struct VolumeReconciler {
    strategy: Arc<dyn VolumesStrategy>,
}

impl VolumeReconciler {
    pub fn new(strategy: Arc<dyn VolumesStrategy>) -> Self {
        Self { strategy }
    }

    /// Build a reconciler for the strategy `config` selects.
    pub fn from_config(config: &VolumesConfig, deps: &StrategyDeps) -> Result<Self> {
        Ok(Self::new(get_strategy(config, deps)?))
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// The strategy that will serve `workspace_id`, decided once per call.
    fn effective(&self, workspace_id: &str) -> Result<&dyn VolumesStrategy> {
        Ok(self
            .strategy
            .resolve(workspace_id)?
            .unwrap_or(self.strategy.as_ref()))
    }

    /// Run `prepare` then `provision` for the workspace on `env`.
    #[instrument(
        skip(self, env, identity),
        fields(workspace_id = %identity.workspace_id, strategy = tracing::field::Empty)
    )]
    pub fn reconcile(
        &self,
        env: &mut WorkloadEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<ReconcileReport> {
        let workspace_id = identity.workspace_id.as_str();
        let strategy = self.effective(workspace_id)?;
        Span::current().record("strategy", strategy.name());

        let before = Snapshot::of(env);
        let subpaths_before = env.subpaths.clone();

        strategy.prepare(env, workspace_id)?;
        strategy.provision(env, identity)?;

        let after = Snapshot::of(env);
        let report = ReconcileReport {
            workspace_id: workspace_id.to_string(),
            strategy: strategy.name().to_string(),
            claims_added: after.claims.saturating_sub(before.claims),
            volumes_added: after.volumes.saturating_sub(before.volumes),
            mounts_added: after.mounts.saturating_sub(before.mounts),
            subpaths: env.subpaths.difference(&subpaths_before).cloned().collect(),
        };

        if report.is_noop() {
            debug!("Workspace volumes already reconciled");
        } else {
            info!(
                "Reconciled volumes: {} claim(s), {} volume(s), {} mount(s)",
                report.claims_added, report.volumes_added, report.mounts_added
            );
        }
        Ok(report)
    }

    /// Release durable storage of the workspace.
    #[instrument(skip(self), fields(strategy = tracing::field::Empty))]
    pub fn release(&self, workspace_id: &str) -> Result<()> {
        let strategy = self.effective(workspace_id)?;
        Span::current().record("strategy", strategy.name());
        strategy.cleanup(workspace_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vol_provider::NoneStrategy;

    #[test]
    fn test_none_reconciler_reports_noop() {
        let reconciler = VolumeReconciler::new(Arc::new(NoneStrategy::new()));
        let mut env = WorkloadEnvironment::default();

        let report = reconciler
            .reconcile(&mut env, &RuntimeIdentity::for_workspace("ws1"))
            .unwrap();

        assert!(report.is_noop());
        assert_eq!(report.strategy, "none");
        assert_eq!(report.workspace_id, "ws1");
        assert!(reconciler.release("ws1").is_ok());
    }

    #[test]
    fn test_report_serializes_as_json() {
        let report = ReconcileReport {
            workspace_id: "ws1".to_string(),
            strategy: "common".to_string(),
            claims_added: 1,
            volumes_added: 1,
            mounts_added: 2,
            subpaths: vec!["ws1/projects".to_string()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["claims_added"], 1);
        assert_eq!(json["subpaths"][0], "ws1/projects");
    }
}
