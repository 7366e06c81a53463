//! Config struct definition.

use super::types::{AdmissionConfig, DeviceConfig, default_true};
use serde::{Deserialize, Serialize};

/// Configuration for tvmode.
///
/// This struct represents the contents of `config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The controlled television.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Cross-process admission settings.
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Whether to append outcomes to `<state_dir>/events.ndjson`.
    #[serde(default = "default_true")]
    pub event_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            admission: AdmissionConfig::default(),
            event_log: default_true(),
        }
    }
}
