use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Errors surfaced by the volume provisioning engine and its collaborators.
#[derive(Error, Debug)]
pub enum VolumeError {
    Config(String),
    NotFound(String),
    Infrastructure(String),
    Io(#[from] std::io::Error),
    Internal(String),
    Serialization(String),
    Other(#[from] anyhow::Error),
}

impl VolumeError {
    /// True when a collaborator reported that the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VolumeError::NotFound(_))
    }
}

impl Display for VolumeError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            VolumeError::Config(s) => write!(f, "Configuration error: {}", s),
            VolumeError::NotFound(s) => write!(f, "Not found: {}", s),
            VolumeError::Infrastructure(s) => write!(f, "Infrastructure error: {}", s),
            VolumeError::Io(e) => write!(f, "I/O error: {}", e),
            VolumeError::Internal(s) => write!(f, "Internal error: {}", s),
            VolumeError::Serialization(s) => write!(f, "Serialization error: {}", s),
            VolumeError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl From<serde_yaml_ng::Error> for VolumeError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        VolumeError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for VolumeError {
    fn from(err: serde_json::Error) -> Self {
        VolumeError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VolumeError>;
