//! Implementation of `tvmode queue list` and `tvmode queue clear`.

use super::{event_log, load_config};
use crate::admission::{ClearTarget, TicketId, Timings, clear_queue, list_queue};
use crate::cli::{GlobalArgs, QueueClearArgs};
use crate::context::StateContext;
use crate::error::{Result, TvModeError};

/// Print the admission queue, head first.
pub fn cmd_queue_list(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let ctx = StateContext::resolve(&config);

    let entries = list_queue(&ctx, Timings::from_config(&config))?;

    if entries.is_empty() {
        println!("Admission queue is empty.");
        return Ok(());
    }

    println!("Admission queue ({}):", entries.len());
    println!();
    for entry in &entries {
        println!("  {}", entry);
    }

    let stale_count = entries.iter().filter(|e| e.is_stale).count();
    if stale_count > 0 {
        println!();
        println!(
            "Note: {} entr{} older than {}s. Use `tvmode queue clear --stale --force` to remove.",
            stale_count,
            if stale_count == 1 { "y is" } else { "ies are" },
            config.admission.stale_after_seconds
        );
    }

    Ok(())
}

/// Remove entries from the admission queue.
pub fn cmd_queue_clear(args: QueueClearArgs, global: &GlobalArgs) -> Result<()> {
    let target = clear_target(&args)?;

    if !args.force {
        return Err(TvModeError::UserError(format!(
            "refusing to clear the admission queue without --force flag.\n\n\
             Removing the entry of a live invocation lets the next one talk to the \
             device at the same time.\n\
             Only clear entries whose process has crashed.\n\n\
             To clear, run:\n  tvmode queue clear {} --force",
            describe_target(&target)
        )));
    }

    let config = load_config(global)?;
    let ctx = StateContext::resolve(&config);
    let events = event_log(&config, &ctx);

    let removed = clear_queue(&ctx, &target, Timings::from_config(&config), &events)?;

    if removed.is_empty() {
        println!("Nothing to clear.");
        return Ok(());
    }

    println!(
        "Cleared {} queue entr{}:",
        removed.len(),
        if removed.len() == 1 { "y" } else { "ies" }
    );
    for id in &removed {
        println!("  {}", id);
    }

    Ok(())
}

fn clear_target(args: &QueueClearArgs) -> Result<ClearTarget> {
    match (&args.id, args.all, args.stale) {
        (None, true, false) => Ok(ClearTarget::All),
        (None, false, true) => Ok(ClearTarget::Stale),
        (Some(id), false, false) => Ok(ClearTarget::Entry(
            TicketId::parse(id.trim())?.to_string(),
        )),
        _ => Err(TvModeError::UserError(
            "specify exactly one of <ID>, --all, or --stale".to_string(),
        )),
    }
}

fn describe_target(target: &ClearTarget) -> String {
    match target {
        ClearTarget::Entry(id) => id.clone(),
        ClearTarget::Stale => "--stale".to_string(),
        ClearTarget::All => "--all".to_string(),
    }
}
