//! Volume provisioning configuration library.
//!
//! Loads, overrides and validates the settings that select a provisioning
//! strategy and shape the claims it creates.

pub mod config;
pub mod loader;
pub mod validate;

pub use config::{
    AccessMode, ClaimSettings, VolumesConfig, COMMON_STRATEGY, EMPTY_DIR_STRATEGY, NONE_STRATEGY,
};
pub use loader::ConfigLoader;
