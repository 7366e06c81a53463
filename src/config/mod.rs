//! Configuration model for tvmode.
//!
//! This module defines the Config struct that represents `config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, environment overrides, and
//! validation of config values.
//!
//! # Resolution
//!
//! The config file is looked up in this order:
//! 1. The `--config` command-line option
//! 2. The `TVMODE_CONFIG` environment variable
//! 3. `$XDG_CONFIG_HOME/tvmode/config.yaml` (or `~/.config/tvmode/config.yaml`)
//!
//! When none of these exists, built-in defaults are used. `TVMODE_DEVICE_ADDRESS`
//! and `TVMODE_STATE_DIR` are applied on top of whatever was loaded.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use operations::{
    ENV_CONFIG, ENV_DEVICE_ADDRESS, ENV_STATE_DIR, MAX_TIMEOUT_SECONDS, default_config_path,
};
pub use types::{AdmissionConfig, DeviceConfig, Strategy};
