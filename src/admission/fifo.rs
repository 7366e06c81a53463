//! Fair FIFO admission through the shared queue file.
//!
//! A process appends its identifier to the tail of the queue and polls
//! until the identifier reaches position 0. Each poll is one short
//! read-modify-write under the file lock; the guarded action itself runs
//! with no lock held.

use super::identifier::{TicketId, is_stale};
use super::queue_file::{LockedQueue, QueueFile};
use super::timings::Timings;
use crate::config::Strategy;
use crate::error::{Result, TvModeError};
use crate::events::{Event, EventAction, EventLog};
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

/// The FIFO admission queue backed by one file.
#[derive(Debug, Clone)]
pub struct FifoQueue {
    path: PathBuf,
    timings: Timings,
    events: EventLog,
}

/// What one locked enrollment pass observed.
#[derive(Debug, PartialEq, Eq)]
struct EnrollPass {
    position: usize,
    appended: bool,
    evicted: Vec<String>,
}

impl FifoQueue {
    pub fn new(path: impl Into<PathBuf>, timings: Timings, events: EventLog) -> Self {
        Self {
            path: path.into(),
            timings,
            events,
        }
    }

    /// Enroll `id` and wait until it is at the head of the queue.
    ///
    /// Returns a [`Ticket`] that removes the entry when released or dropped.
    /// On timeout (or any other failure) the entry is removed before the
    /// error is returned, so an aborted attempt never orphans the queue.
    pub fn enroll(&self, id: &TicketId) -> Result<Ticket> {
        let start = Instant::now();

        match self.wait_for_head(id, start) {
            Ok(()) => {
                self.events.record(
                    Event::new(EventAction::Admit)
                        .with_ticket(id.as_str())
                        .with_details(json!({
                            "strategy": Strategy::Fifo.as_str(),
                            "waited_ms": start.elapsed().as_millis() as u64
                        })),
                );
                Ok(Ticket {
                    queue: self.clone(),
                    id: id.clone(),
                    released: false,
                })
            }
            Err(err) => {
                if let TvModeError::AdmissionTimeout { waited, .. } = &err {
                    self.events.record(
                        Event::new(EventAction::Timeout)
                            .with_ticket(id.as_str())
                            .with_details(json!({ "waited_ms": waited.as_millis() as u64 })),
                    );
                }
                if let Err(e) = self.release(id.as_str()) {
                    eprintln!(
                        "Warning: failed to remove '{}' from queue after aborted enrollment: {}",
                        id, e
                    );
                }
                Err(err)
            }
        }
    }

    fn wait_for_head(&self, id: &TicketId, start: Instant) -> Result<()> {
        let deadline = start + self.timings.timeout;
        let file = QueueFile::open(&self.path)?;

        loop {
            match file.try_lock() {
                Ok(mut locked) => {
                    let pass = self.enroll_pass(&mut locked, id)?;
                    drop(locked);

                    self.record_pass(id, &pass);
                    if pass.position == 0 {
                        return Ok(());
                    }
                }
                Err(e) if e.is_contention() => {}
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(TvModeError::AdmissionTimeout {
                    ticket: id.to_string(),
                    waited: now - start,
                });
            }
            thread::sleep(self.timings.poll_interval.min(deadline - now));
        }
    }

    /// One read-modify-write cycle: evict stale entries, append `id` if it
    /// is missing, persist if anything changed, report `id`'s position.
    fn enroll_pass(&self, locked: &mut LockedQueue<'_>, id: &TicketId) -> Result<EnrollPass> {
        let now = Utc::now();
        let entries = locked.read();

        let (evicted, mut kept): (Vec<String>, Vec<String>) = entries
            .into_iter()
            .partition(|e| e != id.as_str() && is_stale(e, self.timings.stale_after, now));

        let appended = !kept.iter().any(|e| e == id.as_str());
        if appended {
            kept.push(id.to_string());
        }

        if appended || !evicted.is_empty() {
            locked.write(&kept)?;
        }

        let position = kept
            .iter()
            .position(|e| e == id.as_str())
            .unwrap_or(kept.len());

        Ok(EnrollPass {
            position,
            appended,
            evicted,
        })
    }

    fn record_pass(&self, id: &TicketId, pass: &EnrollPass) {
        for stale in &pass.evicted {
            eprintln!("Evicted stale queue entry '{}'", stale);
            self.events.record(
                Event::new(EventAction::EvictStale)
                    .with_ticket(stale.as_str())
                    .with_details(json!({ "evicted_by": id.as_str() })),
            );
        }
        if pass.appended {
            self.events.record(
                Event::new(EventAction::Enroll)
                    .with_ticket(id.as_str())
                    .with_details(json!({ "position": pass.position })),
            );
        }
    }

    /// Remove `id` from the queue.
    ///
    /// Idempotent: a missing queue file or an absent identifier is a no-op.
    /// Returns whether an entry was removed.
    pub fn release(&self, id: &str) -> Result<bool> {
        let Some(file) = QueueFile::open_existing(&self.path)? else {
            return Ok(false);
        };

        let deadline = Instant::now() + self.timings.timeout;
        let removed = file
            .with_lock(self.timings.poll_interval, deadline, |locked| {
                let mut entries = locked.read();
                let before = entries.len();
                entries.retain(|e| e != id);
                if entries.len() == before {
                    return Ok(false);
                }
                locked.write(&entries)?;
                Ok(true)
            })
            .map_err(|e| match e {
                TvModeError::LockContention(path) => TvModeError::QueueIo(format!(
                    "could not lock queue file '{}' to release '{}' within {}s",
                    path,
                    id,
                    self.timings.timeout.as_secs()
                )),
                other => other,
            })?;

        if removed {
            self.events
                .record(Event::new(EventAction::Release).with_ticket(id));
        }
        Ok(removed)
    }
}

/// Admission to the guarded action through the FIFO queue.
///
/// Holding a ticket means the identifier is at the head of the queue.
/// Dropping the ticket removes the identifier; call [`Ticket::release`] to
/// observe release errors instead of having them printed as warnings.
#[derive(Debug)]
pub struct Ticket {
    queue: FifoQueue,
    id: TicketId,
    released: bool,
}

impl Ticket {
    pub fn id(&self) -> &TicketId {
        &self.id
    }

    /// Remove the identifier from the queue, admitting the next process.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.queue.release(self.id.as_str()).map(|_| ())
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.queue.release(self.id.as_str())
        {
            eprintln!(
                "Warning: failed to release queue entry '{}': {}",
                self.id, e
            );
        }
    }
}
