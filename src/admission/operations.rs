//! Admission entry point and queue maintenance operations.

use super::fifo::{FifoQueue, Ticket};
use super::identifier::{self, TicketId};
use super::queue_file::QueueFile;
use super::single::{SingleGuard, SingleLock};
use super::timings::Timings;
use crate::config::Strategy;
use crate::context::StateContext;
use crate::error::{Result, TvModeError};
use crate::events::{Event, EventAction, EventLog};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::time::Instant;

/// Proof that the current process may run the guarded action.
///
/// Whichever strategy produced it, dropping the admission gives it back.
#[derive(Debug)]
pub enum Admission {
    /// Head of the FIFO queue.
    Queue(Ticket),
    /// Holder of the single lock.
    Single(SingleGuard),
}

impl Admission {
    pub fn id(&self) -> &TicketId {
        match self {
            Admission::Queue(ticket) => ticket.id(),
            Admission::Single(guard) => guard.id(),
        }
    }

    /// Give up admission, reporting release errors instead of printing them.
    pub fn release(self) -> Result<()> {
        match self {
            Admission::Queue(ticket) => ticket.release(),
            Admission::Single(guard) => {
                drop(guard);
                Ok(())
            }
        }
    }
}

/// Wait for admission under `strategy` with a freshly generated identifier.
pub fn admit(
    ctx: &StateContext,
    strategy: Strategy,
    timings: Timings,
    events: &EventLog,
) -> Result<Admission> {
    ctx.ensure_state_dir()?;
    let id = TicketId::generate();
    match strategy {
        Strategy::Fifo => FifoQueue::new(&ctx.queue_file, timings, events.clone())
            .enroll(&id)
            .map(Admission::Queue),
        Strategy::Single => SingleLock::new(&ctx.single_lock_file, timings, events.clone())
            .acquire(&id)
            .map(Admission::Single),
    }
}

/// One entry of the queue as shown by `queue list`.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Position in the queue; 0 is the admitted process.
    pub position: usize,
    /// The raw identifier.
    pub id: String,
    /// Creation time embedded in the identifier, if any.
    pub created_at: Option<DateTime<Utc>>,
    /// Human-readable age, if the creation time is known.
    pub age: Option<String>,
    /// Whether the next enrollment will evict this entry.
    pub is_stale: bool,
}

impl std::fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>3}  {}{}{}{}",
            self.position,
            self.id,
            match (self.created_at, self.age.as_deref()) {
                (Some(created), Some(age)) => format!(
                    " (created {}, age {})",
                    created.format("%Y-%m-%d %H:%M:%S UTC"),
                    age
                ),
                _ => String::new(),
            },
            if self.position == 0 { ", ADMITTED" } else { "" },
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}

/// Snapshot the queue, head first.
pub fn list_queue(ctx: &StateContext, timings: Timings) -> Result<Vec<QueueEntry>> {
    let Some(file) = QueueFile::open_existing(&ctx.queue_file)? else {
        return Ok(Vec::new());
    };

    let deadline = Instant::now() + timings.timeout;
    let entries = file
        .with_lock(timings.poll_interval, deadline, |locked| Ok(locked.read()))
        .map_err(contention_to_io)?;

    let now = Utc::now();
    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(position, id)| QueueEntry {
            position,
            created_at: identifier::created_at(&id),
            age: identifier::age_string(&id, now),
            is_stale: identifier::is_stale(&id, timings.stale_after, now),
            id,
        })
        .collect())
}

/// Which entries `clear_queue` removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearTarget {
    /// One identifier.
    Entry(String),
    /// Only entries past the stale threshold.
    Stale,
    /// Everything.
    All,
}

/// Remove entries from the queue under the file lock.
///
/// Returns the removed identifiers. Clearing a specific identifier that is
/// not queued is a user error; clearing `All`/`Stale` on an empty queue is not.
pub fn clear_queue(
    ctx: &StateContext,
    target: &ClearTarget,
    timings: Timings,
    events: &EventLog,
) -> Result<Vec<String>> {
    let Some(file) = QueueFile::open_existing(&ctx.queue_file)? else {
        return match target {
            ClearTarget::Entry(id) => Err(not_queued(id)),
            _ => Ok(Vec::new()),
        };
    };

    let deadline = Instant::now() + timings.timeout;
    let now = Utc::now();
    let removed = file
        .with_lock(timings.poll_interval, deadline, |locked| {
            let entries = locked.read();
            let (removed, kept): (Vec<String>, Vec<String>) =
                entries.into_iter().partition(|e| match target {
                    ClearTarget::Entry(id) => e == id,
                    ClearTarget::Stale => identifier::is_stale(e, timings.stale_after, now),
                    ClearTarget::All => true,
                });
            if !removed.is_empty() {
                locked.write(&kept)?;
            }
            Ok(removed)
        })
        .map_err(contention_to_io)?;

    if let ClearTarget::Entry(id) = target
        && removed.is_empty()
    {
        return Err(not_queued(id));
    }

    if !removed.is_empty() {
        events.record(
            Event::new(EventAction::QueueClear).with_details(json!({ "removed": removed })),
        );
    }
    Ok(removed)
}

fn not_queued(id: &str) -> TvModeError {
    TvModeError::UserError(format!("'{}' is not in the admission queue", id))
}

fn contention_to_io(e: TvModeError) -> TvModeError {
    match e {
        TvModeError::LockContention(path) => TvModeError::QueueIo(format!(
            "queue file '{}' stayed locked by another process",
            path
        )),
        other => other,
    }
}
