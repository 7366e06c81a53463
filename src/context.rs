//! State directory resolution for tvmode.
//!
//! Every cooperating process on a host must agree on where the queue file
//! lives, so all paths are derived from a single state directory taken from
//! the configuration (default: `<temp dir>/tvmode`).

use crate::config::Config;
use crate::error::{Result, TvModeError};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the FIFO admission queue inside the state directory.
pub const QUEUE_FILE_NAME: &str = "queue";

/// File name of the single-holder lock inside the state directory.
pub const SINGLE_LOCK_FILE_NAME: &str = "single.lock";

/// File name of the NDJSON event log inside the state directory.
pub const EVENTS_FILE_NAME: &str = "events.ndjson";

/// Resolved paths for the shared admission state.
#[derive(Debug, Clone)]
pub struct StateContext {
    /// Directory shared by all cooperating processes.
    pub state_dir: PathBuf,

    /// The FIFO queue file (`{state_dir}/queue`).
    pub queue_file: PathBuf,

    /// The single-holder lock file (`{state_dir}/single.lock`).
    pub single_lock_file: PathBuf,

    /// The append-only event log (`{state_dir}/events.ndjson`).
    pub events_file: PathBuf,
}

impl StateContext {
    /// Resolve the state context from configuration.
    pub fn resolve(config: &Config) -> Self {
        Self::from_dir(config.state_dir())
    }

    /// Build the context rooted at a specific directory.
    pub fn from_dir<P: AsRef<Path>>(state_dir: P) -> Self {
        let state_dir = state_dir.as_ref().to_path_buf();
        Self {
            queue_file: state_dir.join(QUEUE_FILE_NAME),
            single_lock_file: state_dir.join(SINGLE_LOCK_FILE_NAME),
            events_file: state_dir.join(EVENTS_FILE_NAME),
            state_dir,
        }
    }

    /// Create the state directory if it does not exist yet.
    pub fn ensure_state_dir(&self) -> Result<()> {
        if self.state_dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.state_dir).map_err(|e| {
            TvModeError::QueueIo(format!(
                "failed to create state directory '{}': {}",
                self.state_dir.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_derive_from_state_dir() {
        let ctx = StateContext::from_dir("/run/tvmode");

        assert_eq!(ctx.state_dir, PathBuf::from("/run/tvmode"));
        assert_eq!(ctx.queue_file, PathBuf::from("/run/tvmode/queue"));
        assert_eq!(ctx.single_lock_file, PathBuf::from("/run/tvmode/single.lock"));
        assert_eq!(ctx.events_file, PathBuf::from("/run/tvmode/events.ndjson"));
    }

    #[test]
    fn test_resolve_uses_configured_state_dir() {
        let mut config = Config::default();
        config.admission.state_dir = Some(PathBuf::from("/srv/tv"));

        let ctx = StateContext::resolve(&config);
        assert_eq!(ctx.queue_file, PathBuf::from("/srv/tv/queue"));
    }

    #[test]
    fn test_resolve_defaults_to_temp_dir() {
        let ctx = StateContext::resolve(&Config::default());
        assert_eq!(ctx.state_dir, std::env::temp_dir().join("tvmode"));
    }

    #[test]
    fn test_ensure_state_dir_creates_nested_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StateContext::from_dir(temp_dir.path().join("a").join("b"));

        ctx.ensure_state_dir().unwrap();
        assert!(ctx.state_dir.is_dir());

        // Idempotent
        ctx.ensure_state_dir().unwrap();
    }
}
