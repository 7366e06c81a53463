//! Implementation of `tvmode config show` and `tvmode config init`.

use super::{apply_cli_overrides, load_config};
use crate::cli::{ConfigInitArgs, GlobalArgs};
use crate::config::{Config, ENV_CONFIG, ENV_DEVICE_ADDRESS, default_config_path};
use crate::error::{Result, TvModeError};
use crate::fs::atomic_write_file;
use std::path::{Path, PathBuf};

/// Print the effective configuration as YAML.
pub fn cmd_config_show(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

/// Write a starter config file.
pub fn cmd_config_init(args: ConfigInitArgs, global: &GlobalArgs) -> Result<()> {
    let path = init_path(global)?;
    let config = write_starter_config(&path, global, args.force)?;

    println!("Wrote {}", path.display());
    if config.device.address.is_none() {
        println!();
        println!(
            "Set device.address in that file (or {}) before switching modes.",
            ENV_DEVICE_ADDRESS
        );
    }
    Ok(())
}

/// Where `config init` writes: `--config`, then `TVMODE_CONFIG`, then the
/// per-user default.
fn init_path(global: &GlobalArgs) -> Result<PathBuf> {
    global
        .config
        .clone()
        .or_else(|| {
            std::env::var_os(ENV_CONFIG)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .or_else(default_config_path)
        .ok_or_else(|| {
            TvModeError::UserError(
                "cannot determine a config location (HOME is not set).\n\n\
                 Fix: pass --config <PATH>."
                    .to_string(),
            )
        })
}

/// Write defaults plus any command-line overrides to `path`.
fn write_starter_config(path: &Path, global: &GlobalArgs, force: bool) -> Result<Config> {
    if path.exists() && !force {
        return Err(TvModeError::UserError(format!(
            "config file '{}' already exists.\n\n\
             Use --force to overwrite it.",
            path.display()
        )));
    }

    let mut config = Config::default();
    apply_cli_overrides(&mut config, global);
    config.validate()?;

    let content = format!(
        "# tvmode configuration\n\
         # device.command placeholders: {{address}}, {{mode}}\n{}",
        config.to_yaml()?
    );
    atomic_write_file(path, &content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;
    use crate::test_support::EnvGuard;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_starter_config_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tvmode").join("config.yaml");
        let global = GlobalArgs {
            address: Some("192.168.0.2".to_string()),
            strategy: Some(Strategy::Single),
            ..GlobalArgs::default()
        };

        let written = write_starter_config(&path, &global, false).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded, written);
        assert_eq!(loaded.device.address.as_deref(), Some("192.168.0.2"));
        assert_eq!(loaded.admission.strategy, Strategy::Single);
        assert!(
            std::fs::read_to_string(&path)
                .unwrap()
                .starts_with("# tvmode configuration")
        );
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "event_log: false\n").unwrap();

        let err = write_starter_config(&path, &GlobalArgs::default(), false).unwrap_err();
        assert!(matches!(err, TvModeError::UserError(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "event_log: false\n");

        write_starter_config(&path, &GlobalArgs::default(), true).unwrap();
        assert!(Config::load(&path).unwrap().event_log);
    }

    #[test]
    fn test_init_rejects_invalid_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        let global = GlobalArgs {
            timeout: Some(0),
            ..GlobalArgs::default()
        };

        assert!(write_starter_config(&path, &global, false).is_err());
        assert!(!path.exists());
    }

    #[test]
    #[serial]
    fn test_init_path_prefers_flag_then_env() {
        let _env = EnvGuard::new(&[(ENV_CONFIG, Some("/tmp/from-env.yaml"))]);

        let flag = GlobalArgs {
            config: Some(PathBuf::from("/tmp/from-flag.yaml")),
            ..GlobalArgs::default()
        };
        assert_eq!(init_path(&flag).unwrap(), PathBuf::from("/tmp/from-flag.yaml"));
        assert_eq!(
            init_path(&GlobalArgs::default()).unwrap(),
            PathBuf::from("/tmp/from-env.yaml")
        );
    }

    #[test]
    #[serial]
    fn test_cmd_config_init_writes_to_flag_path() {
        let _env = EnvGuard::new(&[(ENV_CONFIG, None), (ENV_DEVICE_ADDRESS, None)]);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        let global = GlobalArgs {
            config: Some(path.clone()),
            ..GlobalArgs::default()
        };

        cmd_config_init(ConfigInitArgs { force: false }, &global).unwrap();
        assert!(path.exists());

        cmd_config_show(&global).unwrap();
    }
}
