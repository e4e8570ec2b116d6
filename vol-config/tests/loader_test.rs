//! Integration tests for loading volume configuration from files and the
//! environment.

use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;
use vol_config::loader::{
    ENV_CLAIM_ACCESS_MODE, ENV_CLAIM_NAME, ENV_CLAIM_QUANTITY, ENV_EPHEMERAL_OVERRIDE,
    ENV_PRECREATE_SUBPATHS, ENV_STRATEGY,
};
use vol_config::{AccessMode, VolumesConfig};
use vol_core::VolumeError;

fn clear_env() {
    for key in [
        ENV_STRATEGY,
        ENV_EPHEMERAL_OVERRIDE,
        ENV_CLAIM_NAME,
        ENV_CLAIM_QUANTITY,
        ENV_CLAIM_ACCESS_MODE,
        ENV_PRECREATE_SUBPATHS,
    ] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_load_without_file_uses_defaults() {
    clear_env();
    let config = VolumesConfig::load(None).expect("defaults should load");
    assert_eq!(config, VolumesConfig::default());
}

#[test]
#[serial]
fn test_load_from_file() {
    clear_env();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("volumes.yaml");
    fs::write(
        &path,
        r#"
strategy: emptyDir
ephemeral_override: false
claim:
  name: ws-claim
  quantity: 5Gi
  access_mode: ReadWriteMany
  precreate_subpaths: false
"#,
    )
    .expect("Failed to write config");

    let config = VolumesConfig::load(Some(&path)).expect("file config should load");
    assert_eq!(config.strategy, "emptyDir");
    assert!(!config.ephemeral_override);
    assert_eq!(config.claim.name, "ws-claim");
    assert_eq!(config.claim.quantity, "5Gi");
    assert_eq!(config.claim.access_mode, AccessMode::ReadWriteMany);
    assert!(!config.claim.precreate_subpaths);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("volumes.yaml");
    fs::write(&path, "strategy: emptyDir\nclaim:\n  name: from-file\n")
        .expect("Failed to write config");

    env::set_var(ENV_STRATEGY, "none");
    env::set_var(ENV_CLAIM_NAME, "from-env");
    env::set_var(ENV_CLAIM_ACCESS_MODE, "ReadOnlyMany");
    env::set_var(ENV_PRECREATE_SUBPATHS, "false");
    env::set_var(ENV_EPHEMERAL_OVERRIDE, "no");

    let config = VolumesConfig::load(Some(&path));
    clear_env();

    let config = config.expect("env overrides should apply");
    assert_eq!(config.strategy, "none");
    assert_eq!(config.claim.name, "from-env");
    assert_eq!(config.claim.access_mode, AccessMode::ReadOnlyMany);
    assert!(!config.claim.precreate_subpaths);
    assert!(!config.ephemeral_override);
}

#[test]
#[serial]
fn test_invalid_env_value_is_config_error() {
    clear_env();
    env::set_var(ENV_PRECREATE_SUBPATHS, "sometimes");
    let result = VolumesConfig::load(None);
    clear_env();

    match result {
        Err(VolumeError::Config(msg)) => assert!(msg.contains(ENV_PRECREATE_SUBPATHS)),
        other => panic!("Expected configuration error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_blank_prefix_from_file_fails_validation() {
    clear_env();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("volumes.yaml");
    fs::write(&path, "claim:\n  name: \"\"\n").expect("Failed to write config");

    let err = VolumesConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, VolumeError::Config(_)));
}

#[test]
#[serial]
fn test_missing_file_is_config_error() {
    clear_env();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let err = VolumesConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert!(err.to_string().contains("absent.yaml"));
}
