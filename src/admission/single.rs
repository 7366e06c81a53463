//! Single-holder admission: one exclusive advisory lock held for the whole
//! guarded action.
//!
//! There is no ordering between waiters; whichever process retries first
//! after the holder lets go wins. The lock file is never removed, so every
//! process always locks the same inode.

use super::identifier::TicketId;
use super::queue_file::is_contended;
use super::timings::Timings;
use crate::config::Strategy;
use crate::error::{Result, TvModeError};
use crate::events::{Event, EventAction, EventLog};
use fs2::FileExt;
use serde_json::json;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

/// Exclusive lock on a single well-known file.
#[derive(Debug, Clone)]
pub struct SingleLock {
    path: PathBuf,
    timings: Timings,
    events: EventLog,
}

impl SingleLock {
    pub fn new(path: impl Into<PathBuf>, timings: Timings, events: EventLog) -> Self {
        Self {
            path: path.into(),
            timings,
            events,
        }
    }

    /// Wait for the lock, giving up with `AdmissionTimeout` at the deadline.
    pub fn acquire(&self, id: &TicketId) -> Result<SingleGuard> {
        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                TvModeError::QueueIo(format!(
                    "failed to create lock directory '{}': {}",
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
            .open(&self.path)
            .map_err(|e| {
                TvModeError::QueueIo(format!(
                    "failed to open lock file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        let start = Instant::now();
        let deadline = start + self.timings.timeout;

        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    self.events.record(
                        Event::new(EventAction::Admit)
                            .with_ticket(id.as_str())
                            .with_details(json!({
                                "strategy": Strategy::Single.as_str(),
                                "waited_ms": start.elapsed().as_millis() as u64
                            })),
                    );
                    return Ok(SingleGuard {
                        file,
                        path: self.path.clone(),
                        id: id.clone(),
                        events: self.events.clone(),
                    });
                }
                Err(e) if is_contended(&e) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.events.record(
                            Event::new(EventAction::Timeout)
                                .with_ticket(id.as_str())
                                .with_details(json!({
                                    "strategy": Strategy::Single.as_str()
                                })),
                        );
                        return Err(TvModeError::AdmissionTimeout {
                            ticket: id.to_string(),
                            waited: now - start,
                        });
                    }
                    thread::sleep(self.timings.poll_interval.min(deadline - now));
                }
                Err(e) => {
                    return Err(TvModeError::QueueIo(format!(
                        "failed to lock '{}': {}",
                        self.path.display(),
                        e
                    )));
                }
            }
        }
    }
}

/// Holds the single-holder lock until dropped.
#[derive(Debug)]
pub struct SingleGuard {
    file: File,
    path: PathBuf,
    id: TicketId,
    events: EventLog,
}

impl SingleGuard {
    pub fn id(&self) -> &TicketId {
        &self.id
    }
}

impl Drop for SingleGuard {
    fn drop(&mut self) {
        match FileExt::unlock(&self.file) {
            Ok(()) => self
                .events
                .record(Event::new(EventAction::Release).with_ticket(self.id.as_str())),
            // Closing the handle right after releases the lock anyway.
            Err(e) => eprintln!(
                "Warning: failed to unlock '{}': {}",
                self.path.display(),
                e
            ),
        }
    }
}
