//! Exit code constants for the tvmode CLI.
//!
//! - 0: Success
//! - 1: Any failure (timeout, device failure, bad arguments, I/O)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Any error terminating the invocation.
pub const FAILURE: i32 = 1;
