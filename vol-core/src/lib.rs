//! Shared foundations for workspace volume provisioning: the error taxonomy
//! and the naming/sub-path layout policy.

pub mod error;
pub mod names;

pub use error::{Result, VolumeError};
pub use names::{generate_name, sub_path, LOGS_VOLUME_NAME};
