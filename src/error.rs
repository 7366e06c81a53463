//! Error types for the tvmode CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use std::time::Duration;
use thiserror::Error;

/// Main error type for tvmode operations.
///
/// The set is closed: every failure an invocation can surface is one of
/// these variants. Unreadable queue content is read as an empty queue and
/// has no variant.
#[derive(Error, Debug)]
pub enum TvModeError {
    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Configuration could not be read, parsed, or validated.
    #[error("config error: {0}")]
    ConfigError(String),

    /// The process did not reach the head of the admission queue in time.
    #[error(
        "timed out after {}s waiting for admission (ticket {ticket})",
        waited.as_secs_f32()
    )]
    AdmissionTimeout { ticket: String, waited: Duration },

    /// The queue file is held by another process right now.
    ///
    /// Only used as the internal retry signal of the admission loops.
    #[error("queue file '{0}' is locked by another process")]
    LockContention(String),

    /// The queue file or state directory could not be read or written.
    #[error("queue file I/O failed: {0}")]
    QueueIo(String),

    /// The device rejected the command or the command could not run.
    #[error("could not set picture mode: {0}")]
    GuardedActionFailure(String),
}

impl TvModeError {
    /// Returns the process exit code for this error.
    ///
    /// Every error kind terminates the invocation with the same status;
    /// callers distinguish failures through the message and the event log.
    pub fn exit_code(&self) -> i32 {
        exit_codes::FAILURE
    }

    /// Whether this error is transient contention that should be retried.
    pub fn is_contention(&self) -> bool {
        matches!(self, TvModeError::LockContention(_))
    }
}

/// Result type alias for tvmode operations.
pub type Result<T> = std::result::Result<T, TvModeError>;
