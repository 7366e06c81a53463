//! Implementation of `tvmode <MODE>`.
//!
//! Admission is taken first, then the device is asked to switch, then the
//! admission is released. Configuration problems such as a missing address
//! are reported before the process ever joins the queue.

use super::{event_log, load_config};
use crate::admission::{Timings, admit};
use crate::cli::GlobalArgs;
use crate::config::Config;
use crate::context::StateContext;
use crate::device::{CommandController, PictureMode, PictureModeController};
use crate::error::Result;
use crate::events::{Event, EventAction, EventLog};
use serde_json::json;

/// Switch the television to `mode`.
pub fn cmd_set(mode: PictureMode, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let controller = CommandController::from_config(&config)?;
    let ctx = StateContext::resolve(&config);
    let events = event_log(&config, &ctx);

    set_mode(&ctx, &config, &events, &controller, mode)?;

    println!(
        "Picture mode set to {} ({}) on {}",
        mode,
        mode.name(),
        controller.address()
    );
    Ok(())
}

/// Run `controller` for `mode` while admitted.
///
/// A device failure is returned as-is; the admission is still released, and
/// a release problem on that path only produces a warning.
pub(crate) fn set_mode<C: PictureModeController>(
    ctx: &StateContext,
    config: &Config,
    events: &EventLog,
    controller: &C,
    mode: PictureMode,
) -> Result<()> {
    let admission = admit(
        ctx,
        config.admission.strategy,
        Timings::from_config(config),
        events,
    )?;
    let ticket = admission.id().to_string();

    match controller.set_picture_mode(mode) {
        Ok(()) => {
            events.record(
                Event::new(EventAction::ModeSet)
                    .with_ticket(ticket)
                    .with_details(json!({ "mode": mode.surface_value(), "name": mode.name() })),
            );
            admission.release()
        }
        Err(e) => {
            events.record(
                Event::new(EventAction::ModeFailed)
                    .with_ticket(ticket)
                    .with_details(json!({
                        "mode": mode.surface_value(),
                        "name": mode.name(),
                        "error": e.to_string()
                    })),
            );
            if let Err(release_err) = admission.release() {
                eprintln!("Warning: {}", release_err);
            }
            Err(e)
        }
    }
}
