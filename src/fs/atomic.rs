//! Atomic replacement of small files such as `config.yaml`.
//!
//! The content goes to `.{filename}.{pid}.tmp` next to the target, is synced,
//! and is then renamed over the target, so readers see either the old file
//! or the new one. The queue file must not be written this way: a rename
//! replaces the inode other processes hold advisory locks on.

use crate::error::{Result, TvModeError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically replace `path` with `content`, creating parent directories.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let fail = |what: &str, target: &Path, e: std::io::Error| {
        TvModeError::UserError(format!("failed to {} '{}': {}", what, target.display(), e))
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| fail("create directory", parent, e))?;

    let temp = temp_path(path)?;
    let written = File::create(&temp).and_then(|mut file| {
        file.write_all(content.as_bytes())?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(fail("write temporary file", &temp, e));
    }

    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(fail("replace", path, e));
    }

    #[cfg(unix)]
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

fn temp_path(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            TvModeError::UserError(format!("invalid file path '{}'", target.display()))
        })?;
    Ok(target.with_file_name(format!(".{}.{}.tmp", name, std::process::id())))
}
