//! Interpreting what the device client prints.
//!
//! A zero exit status only means the client ran. Whether the television
//! accepted the change is decided from stdout: the client echoes the
//! device's reply, and `returnValue: false` there means the mode was refused.

use crate::config::DeviceConfig;
use crate::error::{Result, TvModeError};
use regex::Regex;

/// Default pattern marking a refused change in the client's output.
///
/// Matches both a JSON reply (`"returnValue": false`) and a Python-style
/// dict (`{'returnValue': False}`).
pub const DEFAULT_FAILURE_PATTERN: &str = r#"(?i)['"]?returnValue['"]?\s*:\s*false"#;

/// Compiled `device.success_pattern` and `device.failure_pattern`.
#[derive(Debug, Clone, Default)]
pub struct ReplyPatterns {
    success: Option<(Regex, String)>,
    failure: Option<(Regex, String)>,
}

impl ReplyPatterns {
    /// Compile both patterns; an invalid or empty pattern is a config error.
    pub fn from_device_config(device: &DeviceConfig) -> Result<Self> {
        Ok(Self {
            success: compile("device.success_pattern", device.success_pattern.as_deref())?,
            failure: compile("device.failure_pattern", device.failure_pattern.as_deref())?,
        })
    }

    /// Why `stdout` counts as a refusal, or `None` if the change was accepted.
    ///
    /// The failure pattern is checked first, so output matching both is a
    /// failure.
    pub fn rejection(&self, stdout: &str) -> Option<String> {
        if let Some((regex, source)) = &self.failure
            && regex.is_match(stdout)
        {
            return Some(format!(
                "device reported failure (output matched device.failure_pattern '{}')",
                source
            ));
        }
        if let Some((regex, source)) = &self.success
            && !regex.is_match(stdout)
        {
            return Some(format!(
                "device did not confirm the change (output did not match device.success_pattern '{}')",
                source
            ));
        }
        None
    }
}

fn compile(field: &str, pattern: Option<&str>) -> Result<Option<(Regex, String)>> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };
    if pattern.is_empty() {
        return Err(TvModeError::ConfigError(format!(
            "{} must not be empty.\n\
             Fix: remove the key from config.yaml or set it to null.",
            field
        )));
    }
    let regex = Regex::new(pattern).map_err(|e| {
        TvModeError::ConfigError(format!(
            "invalid regex pattern in {}: '{}' - {}\n\
             Fix: edit config.yaml and correct this pattern.",
            field, pattern, e
        ))
    })?;
    Ok(Some((regex, pattern.to_string())))
}
