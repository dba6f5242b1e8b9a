//! Configuration loading with env substitution.
//!
//! Config files: `beacon.toml`, `beacon.yaml` or `beacon.json`,
//! searched in `./` then `~/.config/beacon/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw file.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, data_dir, discover_and_load, load_config},
    schema::{BeaconConfig, LoggingConfig, STATE_FILE_NAME, StoreConfig},
};
