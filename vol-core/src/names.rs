//! Naming and layout policy for provisioned volumes.
//!
//! Generated object names and the sub-path a machine's volume is confined to
//! inside its backing store.

use rand::prelude::*;

/// Volume name that receives per-machine sub-path isolation.
pub const LOGS_VOLUME_NAME: &str = "logs";

/// Length of the random suffix appended by [`generate_name`].
pub const NAME_SUFFIX_LENGTH: usize = 8;

/// Generate a random lowercase alphanumeric suffix.
pub fn random_suffix(length: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate `<prefix>-<suffix>`, unique within one namespace with high probability.
pub fn generate_name(prefix: &str) -> String {
    format!("{}-{}", prefix, random_suffix(NAME_SUFFIX_LENGTH))
}

/// Sub-path for a volume of a machine.
///
/// `logs` is qualified by machine name. Every other volume is shared by all
/// machines of the workspace.
pub fn sub_path(workspace_id: &str, volume_name: &str, machine_name: &str) -> String {
    if volume_name == LOGS_VOLUME_NAME {
        return format!("{}/{}/{}", workspace_id, volume_name, machine_name);
    }
    format!("{}/{}", workspace_id, volume_name)
}
