use crate::config::Config;
use crate::context::StateContext;
use std::ffi::OsString;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Sets environment variables for the lifetime of the guard and restores the
/// previous values on drop.
pub(crate) struct EnvGuard {
    saved: Vec<(String, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// `None` values remove the variable.
    pub(crate) fn new(vars: &[(&str, Option<&str>)]) -> Self {
        // The process environment is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut saved = Vec::new();
        for (key, value) in vars {
            saved.push((key.to_string(), std::env::var_os(key)));
            // SAFETY: serialized through ENV_LOCK and #[serial].
            unsafe {
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
        }
        Self { saved, _lock: lock }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            // SAFETY: still holding ENV_LOCK.
            unsafe {
                match value {
                    Some(v) => std::env::set_var(&key, v),
                    None => std::env::remove_var(&key),
                }
            }
        }
    }
}

/// Config with short timings, pointed at `state_dir`.
pub(crate) fn fast_config(state_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.device.address = Some("127.0.0.1".to_string());
    config.admission.state_dir = Some(state_dir.path().to_path_buf());
    config.admission.poll_interval_ms = 10;
    config.admission.timeout_seconds = 2;
    config.device.timeout_seconds = 2;
    config
}

/// Fresh temp state directory plus its resolved context.
pub(crate) fn create_state() -> (TempDir, StateContext) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = StateContext::from_dir(temp_dir.path());
    (temp_dir, ctx)
}

/// Current queue contents, or an empty list when the file is absent.
pub(crate) fn read_queue(ctx: &StateContext) -> Vec<String> {
    match std::fs::read_to_string(&ctx.queue_file) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}
