//! Configuration sections, enums, and default values for tvmode.

use crate::device::DEFAULT_FAILURE_PATTERN;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default command template used to reach the television.
pub const DEFAULT_DEVICE_COMMAND: &str =
    "bscpylgtvcommand {address} set_current_picture_mode {mode}";

/// Mutual-exclusion strategy guarding the device command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Fair first-come, first-served queue file (default).
    #[default]
    Fifo,
    /// One exclusive lock held for the whole guarded action; no ordering.
    Single,
}

impl Strategy {
    /// Name as written in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Fifo => "fifo",
            Strategy::Single => "single",
        }
    }
}

/// Settings for the controlled television.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Network address of the television. Required before a mode can be set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Command template run to switch the picture mode.
    ///
    /// Supports `{address}` and `{mode}` placeholders.
    #[serde(default = "default_device_command")]
    pub command: String,

    /// Seconds before a hung device command is killed.
    #[serde(default = "default_device_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Regex the command's stdout must match for the change to count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_pattern: Option<String>,

    /// Regex marking a refused change in the command's stdout; `null` disables it.
    #[serde(default = "default_failure_pattern")]
    pub failure_pattern: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: None,
            command: default_device_command(),
            timeout_seconds: default_device_timeout_seconds(),
            success_pattern: None,
            failure_pattern: default_failure_pattern(),
        }
    }
}

/// Settings for the cross-process admission mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Which mutual-exclusion strategy to use.
    #[serde(default)]
    pub strategy: Strategy,

    /// Directory holding the queue file, single lock, and event log.
    /// Defaults to `<temp dir>/tvmode`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Milliseconds slept between lock attempts.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds to wait for admission before giving up.
    #[serde(default = "default_admission_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Seconds after which a queue entry is assumed to belong to a dead process.
    #[serde(default = "default_stale_after_seconds")]
    pub stale_after_seconds: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            state_dir: None,
            poll_interval_ms: default_poll_interval_ms(),
            timeout_seconds: default_admission_timeout_seconds(),
            stale_after_seconds: default_stale_after_seconds(),
        }
    }
}

// Default value functions for serde
pub fn default_device_command() -> String {
    DEFAULT_DEVICE_COMMAND.to_string()
}
pub fn default_device_timeout_seconds() -> u64 {
    30
}
pub fn default_failure_pattern() -> Option<String> {
    Some(DEFAULT_FAILURE_PATTERN.to_string())
}
pub fn default_poll_interval_ms() -> u64 {
    100
}
pub fn default_admission_timeout_seconds() -> u64 {
    60
}
pub fn default_stale_after_seconds() -> u64 {
    300
}
pub fn default_true() -> bool {
    true
}
