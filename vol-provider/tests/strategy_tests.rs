use std::sync::Arc;
use vol_config::VolumesConfig;
use vol_provider::directory::{ClaimDirectory, VOLUME_NAME_LABEL, WORKSPACE_ID_LABEL};
use vol_provider::memory::{InMemoryClaimDirectory, InMemoryWorkspaceStore};
use vol_provider::workload::PersistentVolumeClaim;
use vol_provider::{
    get_strategy, DurableClaimStrategy, RuntimeIdentity, StrategyDeps, VolumesStrategy,
    WorkloadEnvironment,
};

const POD: &str = "workspace-pod";

fn workload() -> WorkloadEnvironment {
    WorkloadEnvironment::from_yaml(include_str!("fixtures/workload.yaml"))
        .expect("workload fixture should parse")
}

fn cluster() -> Arc<InMemoryClaimDirectory> {
    let claims: Vec<PersistentVolumeClaim> =
        serde_yaml_ng::from_str(include_str!("fixtures/cluster_claims.yaml"))
            .expect("claims fixture should parse");
    Arc::new(InMemoryClaimDirectory::with_claims(claims))
}

fn durable(directory: Arc<InMemoryClaimDirectory>) -> DurableClaimStrategy {
    DurableClaimStrategy::new(&VolumesConfig::default().claim, directory)
        .expect("default settings are valid")
}

fn mount_for<'a>(
    env: &'a WorkloadEnvironment,
    container: &str,
    path: &str,
) -> &'a vol_provider::workload::VolumeMount {
    env.container_mounts(POD, container)
        .and_then(|mounts| mounts.iter().find(|m| m.mount_path == path))
        .unwrap_or_else(|| panic!("{} should mount {}", container, path))
}

#[test]
fn test_none_strategy_leaves_document_untouched() {
    let deps = StrategyDeps::new(cluster(), Arc::new(InMemoryWorkspaceStore::new()));
    let strategy = get_strategy(&VolumesConfig::with_strategy("none"), &deps).unwrap();
    let mut env = workload();
    let before = env.clone();

    strategy.prepare(&mut env, "ws1").unwrap();
    strategy
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws1"))
        .unwrap();
    strategy.cleanup("ws1").unwrap();

    assert_eq!(env, before);
}

#[test]
fn test_existing_claim_is_reused() {
    let mut env = workload();
    let strategy = durable(cluster());

    strategy
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws1"))
        .unwrap();

    // "projects" already exists on the cluster for ws1; only "logs" is new
    assert_eq!(env.persistent_volume_claims.len(), 1);
    let new_claim = env.persistent_volume_claims.values().next().unwrap();
    assert_eq!(new_claim.label(VOLUME_NAME_LABEL), Some("logs"));
    assert_eq!(new_claim.label(WORKSPACE_ID_LABEL), Some("ws1"));

    assert_eq!(mount_for(&env, "dev", "/projects").name, "claim-workspace-ab12cd34");
    assert_eq!(
        mount_for(&env, "db", "/var/lib/projects").name,
        "claim-workspace-ab12cd34"
    );

    // Claims of other workspaces are never borrowed
    let volumes = env.pod_volumes(POD).unwrap();
    assert!(volumes
        .iter()
        .all(|v| v.claim_name() != Some("claim-workspace-ef56gh78")));
    assert_eq!(volumes.len(), 2);
}

#[test]
fn test_cluster_claim_wins_over_claim_from_same_pass() {
    let mut env = workload();
    let pass_claim = PersistentVolumeClaim::new("claim-workspace-pass0001", Default::default(), "10Gi")
        .with_label(WORKSPACE_ID_LABEL, "ws1")
        .with_label(VOLUME_NAME_LABEL, "projects");
    env.persistent_volume_claims
        .insert(pass_claim.name().to_string(), pass_claim);

    durable(cluster())
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws1"))
        .unwrap();

    assert_eq!(mount_for(&env, "dev", "/projects").name, "claim-workspace-ab12cd34");
    assert_eq!(
        mount_for(&env, "db", "/var/lib/projects").name,
        "claim-workspace-ab12cd34"
    );
    let volumes = env.pod_volumes(POD).unwrap();
    assert!(volumes
        .iter()
        .any(|v| v.claim_name() == Some("claim-workspace-ab12cd34")));
    assert!(volumes
        .iter()
        .all(|v| v.claim_name() != Some("claim-workspace-pass0001")));
}

#[test]
fn test_logs_subpaths_are_isolated_per_machine() {
    let mut env = workload();
    durable(Arc::new(InMemoryClaimDirectory::new()))
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws1"))
        .unwrap();

    let dev = mount_for(&env, "dev", "/workspace_logs");
    let db = mount_for(&env, "db", "/workspace_logs");
    assert_eq!(dev.name, db.name);
    assert_eq!(dev.sub_path.as_deref(), Some("ws1/logs/dev-machine"));
    assert_eq!(db.sub_path.as_deref(), Some("ws1/logs/db-machine"));
}

#[test]
fn test_other_volumes_share_one_subpath() {
    let mut env = workload();
    durable(Arc::new(InMemoryClaimDirectory::new()))
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws1"))
        .unwrap();

    let dev = mount_for(&env, "dev", "/projects");
    let db = mount_for(&env, "db", "/var/lib/projects");
    assert_eq!(dev.name, db.name);
    assert_eq!(dev.sub_path.as_deref(), Some("ws1/projects"));
    assert_eq!(db.sub_path.as_deref(), Some("ws1/projects"));
}

#[test]
fn test_containers_without_machine_are_skipped() {
    let mut env = workload();
    durable(Arc::new(InMemoryClaimDirectory::new()))
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws1"))
        .unwrap();

    assert!(env.container_mounts(POD, "sidecar").unwrap().is_empty());
    assert_eq!(env.mount_count(), 4);
}

#[test]
fn test_durable_provision_is_idempotent() {
    let mut env = workload();
    let strategy = durable(cluster());
    let identity = RuntimeIdentity::for_workspace("ws1");

    strategy.prepare(&mut env, "ws1").unwrap();
    strategy.provision(&mut env, &identity).unwrap();
    let once = env.clone();
    strategy.prepare(&mut env, "ws1").unwrap();
    strategy.provision(&mut env, &identity).unwrap();

    assert_eq!(env, once);
}

#[test]
fn test_ephemeral_workspace_gets_no_claims() {
    let directory = cluster();
    let store = Arc::new(InMemoryWorkspaceStore::new());
    store.add_workspace("ws3");
    let deps = StrategyDeps::new(directory.clone(), store);
    let strategy = get_strategy(&VolumesConfig::default(), &deps).unwrap();
    let mut env = workload();

    strategy.prepare(&mut env, "ws3").unwrap();
    strategy
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws3"))
        .unwrap();

    assert!(env.persistent_volume_claims.is_empty());
    assert!(env.subpaths.is_empty());
    assert!(env.pod_volumes(POD).unwrap().iter().all(|v| v.is_empty_dir()));
    assert_eq!(env.mount_count(), 4);

    // Nothing durable to release, and other workspaces' claims stay put
    strategy.cleanup("ws3").unwrap();
    assert_eq!(directory.len(), 3);
}

#[test]
fn test_mount_sources_workspace_gets_claims() {
    let store = Arc::new(
        InMemoryWorkspaceStore::new().with_attribute("ws1", "mountSources", "True"),
    );
    let deps = StrategyDeps::new(Arc::new(InMemoryClaimDirectory::new()), store);
    let strategy = get_strategy(&VolumesConfig::default(), &deps).unwrap();
    let mut env = workload();

    strategy.prepare(&mut env, "ws1").unwrap();
    strategy
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws1"))
        .unwrap();

    assert_eq!(env.persistent_volume_claims.len(), 2);
    assert_eq!(env.subpaths.len(), 3);
    assert!(env.subpaths.contains("ws1/projects"));
    assert!(env
        .pod_volumes(POD)
        .unwrap()
        .iter()
        .all(|v| v.claim_name().is_some()));
}

#[test]
fn test_cleanup_only_releases_own_workspace() {
    let directory = cluster();
    durable(directory.clone()).cleanup("ws2").unwrap();

    assert_eq!(directory.names(), vec!["claim-workspace-ab12cd34".to_string()]);
    let remaining = directory.list_by_label(WORKSPACE_ID_LABEL, "ws1").unwrap();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn test_provisioned_document_survives_yaml() {
    let mut env = workload();
    durable(cluster())
        .provision(&mut env, &RuntimeIdentity::for_workspace("ws1"))
        .unwrap();

    let yaml = env.to_yaml().unwrap();
    assert!(yaml.contains("persistentVolumeClaim"));
    assert!(yaml.contains("subPath: ws1/logs/dev-machine"));
    assert_eq!(WorkloadEnvironment::from_yaml(&yaml).unwrap(), env);
}
