//! Cross-process admission for the guarded device command.
//!
//! Only one process at a time may talk to the television. Cooperating
//! processes coordinate through files in the shared state directory using
//! OS advisory locks and nothing else.
//!
//! # Strategies
//!
//! - **FIFO** (`queue`): each process appends a fresh identifier to the queue
//!   file and polls until it is first in line. Admission order equals
//!   enrollment order. Every read-modify-write of the file happens under an
//!   exclusive lock on the file itself; the guarded action runs unlocked.
//! - **Single** (`single.lock`): one exclusive lock held for the whole
//!   guarded action. Simpler, but waiters are not ordered.
//!
//! # Cleanup
//!
//! Admissions are RAII guards. Releasing or dropping one removes the
//! process's queue entry, and an enrollment that times out removes its own
//! entry before returning the error. Entries left behind by crashed processes
//! are evicted once they are older than the configured stale threshold.

mod fifo;
mod identifier;
mod operations;
mod queue_file;
mod single;
mod timings;


// Re-export public API
pub use fifo::{FifoQueue, Ticket};
pub use identifier::TicketId;
pub use operations::{
    Admission, ClearTarget, QueueEntry, admit, clear_queue, list_queue,
};
pub use single::{SingleGuard, SingleLock};
pub use timings::Timings;
