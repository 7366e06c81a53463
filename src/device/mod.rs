//! The guarded action: switching the television's picture mode.
//!
//! The control protocol itself lives outside this crate. Admission code only
//! needs something that can be asked to set a mode and reports success or a
//! `GuardedActionFailure`.

mod command;
mod mode;
mod reply;
mod template;

pub use command::CommandController;
pub use mode::PictureMode;
pub use reply::{DEFAULT_FAILURE_PATTERN, ReplyPatterns};

use crate::error::Result;

/// Anything able to switch the device's picture mode.
///
/// Implementations are invoked strictly while the caller holds admission.
pub trait PictureModeController {
    /// Ask the device to switch to `mode`; `Ok` only if it acknowledged.
    fn set_picture_mode(&self, mode: PictureMode) -> Result<()>;
}
