//! The shared queue file and its advisory lock.
//!
//! The lock is taken on the queue file itself with a non-blocking exclusive
//! `flock` (`LockFileEx` on Windows). Rewrites truncate and write through the
//! locked handle instead of renaming a temp file over the path: a rename
//! would swap the inode out from under processes already holding the file
//! open, and they would end up locking different files.

use crate::error::{Result, TvModeError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// An open handle on the queue file.
#[derive(Debug)]
pub struct QueueFile {
    path: PathBuf,
    file: File,
}

impl QueueFile {
    /// Open the queue file, creating it (and its directory) empty if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                TvModeError::QueueIo(format!(
                    "failed to create queue directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                TvModeError::QueueIo(format!(
                    "failed to open queue file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Open the queue file only if it already exists.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => Ok(Some(Self {
                path: path.to_path_buf(),
                file,
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TvModeError::QueueIo(format!(
                "failed to open queue file '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Make one non-blocking attempt at the exclusive lock.
    ///
    /// Returns `TvModeError::LockContention` if another handle holds it.
    pub fn try_lock(&self) -> Result<LockedQueue<'_>> {
        match FileExt::try_lock_exclusive(&self.file) {
            Ok(()) => Ok(LockedQueue { queue: self }),
            Err(e) if is_contended(&e) => {
                Err(TvModeError::LockContention(self.path.display().to_string()))
            }
            Err(e) => Err(TvModeError::QueueIo(format!(
                "failed to lock queue file '{}': {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Run `op` under the lock, polling on contention until `deadline`.
    ///
    /// If the deadline passes while the lock is contended, the last
    /// `LockContention` error is returned.
    pub fn with_lock<T, F>(&self, poll: Duration, deadline: Instant, mut op: F) -> Result<T>
    where
        F: FnMut(&mut LockedQueue<'_>) -> Result<T>,
    {
        loop {
            match self.try_lock() {
                Ok(mut locked) => return op(&mut locked),
                Err(e) if e.is_contention() => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(e);
                    }
                    thread::sleep(poll.min(deadline - now));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Whether a lock error means "held by someone else" rather than a real failure.
pub(crate) fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// The queue file while its exclusive lock is held.
///
/// The lock is released when this guard is dropped, on every exit path.
#[derive(Debug)]
pub struct LockedQueue<'a> {
    queue: &'a QueueFile,
}

impl LockedQueue<'_> {
    /// Read the current entries.
    ///
    /// Content that cannot be read or is not UTF-8 is treated as an empty
    /// queue; the next write replaces it.
    pub fn read(&mut self) -> Vec<String> {
        let mut file = &self.queue.file;
        let mut bytes = Vec::new();

        let read = file
            .seek(SeekFrom::Start(0))
            .and_then(|_| file.read_to_end(&mut bytes));
        if let Err(e) = read {
            eprintln!(
                "Warning: unreadable queue file '{}' treated as empty: {}",
                self.queue.path.display(),
                e
            );
            return Vec::new();
        }

        match String::from_utf8(bytes) {
            Ok(content) => parse_entries(&content),
            Err(_) => {
                eprintln!(
                    "Warning: corrupt queue file '{}' treated as empty",
                    self.queue.path.display()
                );
                Vec::new()
            }
        }
    }

    /// Replace the file's content with `entries`, one per line.
    pub fn write(&mut self, entries: &[String]) -> Result<()> {
        let mut file = &self.queue.file;
        let content = render_entries(entries);

        let result = file
            .set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(content.as_bytes()))
            .and_then(|_| file.sync_data());

        result.map_err(|e| {
            TvModeError::QueueIo(format!(
                "failed to write queue file '{}': {}",
                self.queue.path.display(),
                e
            ))
        })
    }
}

impl Drop for LockedQueue<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.queue.file) {
            eprintln!(
                "Warning: failed to unlock queue file '{}': {}",
                self.queue.path.display(),
                e
            );
        }
    }
}

/// Parse queue content: one identifier per line, blanks skipped, duplicates
/// collapsed to their first occurrence.
pub fn parse_entries(content: &str) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || entries.iter().any(|e| e == line) {
            continue;
        }
        entries.push(line.to_string());
    }
    entries
}

/// Render entries back to file content.
pub fn render_entries(entries: &[String]) -> String {
    let mut content = String::new();
    for entry in entries {
        content.push_str(entry);
        content.push('\n');
    }
    content
}
