//! Config loading, resolution, validation, and derived settings.

use super::model::Config;
use crate::device::ReplyPatterns;
use crate::error::{Result, TvModeError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "TVMODE_CONFIG";

/// Environment variable overriding `device.address`.
pub const ENV_DEVICE_ADDRESS: &str = "TVMODE_DEVICE_ADDRESS";

/// Environment variable overriding `admission.state_dir`.
pub const ENV_STATE_DIR: &str = "TVMODE_STATE_DIR";

/// Upper bound on `device.timeout_seconds` and `admission.timeout_seconds`.
pub const MAX_TIMEOUT_SECONDS: u64 = 24 * 60 * 60;

/// Default per-user config location, if a home directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".config"))
        })?;

    Some(base.join("tvmode").join("config.yaml"))
}

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(TvModeError::ConfigError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            TvModeError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| TvModeError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            TvModeError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Resolve the effective configuration.
    ///
    /// `explicit` (from `--config`) must exist. Otherwise `TVMODE_CONFIG` is
    /// consulted, then the per-user default path; if that file is absent the
    /// built-in defaults apply. Environment overrides are applied last.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(ENV_CONFIG)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load(&path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load(&path)?,
                _ => Config::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `TVMODE_*` overrides using the given variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ENV_DEVICE_ADDRESS).filter(|v| !v.trim().is_empty()) {
            self.device.address = Some(address.trim().to_string());
        }
        if let Some(dir) = lookup(ENV_STATE_DIR).filter(|v| !v.trim().is_empty()) {
            self.admission.state_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `device.command` must be non-empty
    /// - `device.timeout_seconds`, `admission.timeout_seconds`, and
    ///   `admission.poll_interval_ms` must be positive
    /// - both timeouts are at most [`MAX_TIMEOUT_SECONDS`]
    /// - `admission.stale_after_seconds` must exceed the admission timeout plus
    ///   the device timeout, so live processes are never evicted
    /// - `device.success_pattern` and `device.failure_pattern` compile
    pub fn validate(&self) -> Result<()> {
        if self.device.command.trim().is_empty() {
            return Err(TvModeError::ConfigError(
                "config validation failed: device.command must not be empty".to_string(),
            ));
        }

        if let Some(address) = &self.device.address
            && address.trim().is_empty()
        {
            return Err(TvModeError::ConfigError(
                "config validation failed: device.address must not be blank".to_string(),
            ));
        }

        if self.device.timeout_seconds == 0 {
            return Err(TvModeError::ConfigError(
                "config validation failed: device.timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.admission.timeout_seconds == 0 {
            return Err(TvModeError::ConfigError(
                "config validation failed: admission.timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.admission.poll_interval_ms == 0 {
            return Err(TvModeError::ConfigError(
                "config validation failed: admission.poll_interval_ms must be greater than 0"
                    .to_string(),
            ));
        }

        for (field, value) in [
            ("device.timeout_seconds", self.device.timeout_seconds),
            ("admission.timeout_seconds", self.admission.timeout_seconds),
        ] {
            if value > MAX_TIMEOUT_SECONDS {
                return Err(TvModeError::ConfigError(format!(
                    "config validation failed: {} ({}) must not exceed {} (one day)",
                    field, value, MAX_TIMEOUT_SECONDS
                )));
            }
        }

        let busiest = self
            .admission
            .timeout_seconds
            .checked_add(self.device.timeout_seconds)
            .ok_or_else(|| {
                TvModeError::ConfigError(
                    "config validation failed: admission.timeout_seconds + \
                     device.timeout_seconds overflows"
                        .to_string(),
                )
            })?;
        if self.admission.stale_after_seconds <= busiest {
            return Err(TvModeError::ConfigError(format!(
                "config validation failed: admission.stale_after_seconds ({}) must be greater than \
                 admission.timeout_seconds + device.timeout_seconds ({})",
                self.admission.stale_after_seconds, busiest
            )));
        }

        ReplyPatterns::from_device_config(&self.device)?;

        Ok(())
    }

    /// Directory holding the queue file, single lock, and event log.
    pub fn state_dir(&self) -> PathBuf {
        self.admission
            .state_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("tvmode"))
    }

    /// The configured device address, or a user error explaining how to set it.
    pub fn require_address(&self) -> Result<&str> {
        self.device.address.as_deref().ok_or_else(|| {
            TvModeError::UserError(format!(
                "no device address configured.\n\n\
                 Fix: set device.address in config.yaml, export {}, or pass --address.",
                ENV_DEVICE_ADDRESS
            ))
        })
    }

    /// Sleep between lock attempts.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.admission.poll_interval_ms)
    }

    /// Bound on waiting for admission.
    pub fn admission_timeout(&self) -> Duration {
        Duration::from_secs(self.admission.timeout_seconds)
    }

    /// Age after which a queue entry is evicted.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.admission.stale_after_seconds)
    }

    /// Bound on the device command's runtime.
    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device.timeout_seconds)
    }
}
