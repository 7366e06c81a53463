//! Command implementations for tvmode.
//!
//! This module provides the dispatcher that routes the parsed CLI to its
//! handlers, plus the config resolution every handler shares.

mod config_cmd;
mod queue;
mod set;

use crate::cli::{Cli, Command, ConfigAction, ConfigCommand, GlobalArgs, QueueAction, QueueCommand};
use crate::config::Config;
use crate::context::StateContext;
use crate::error::{Result, TvModeError};
use crate::events::EventLog;

/// Dispatch the parsed command line to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        mode,
        global,
        command,
    } = cli;

    match (command, mode) {
        (Some(command), Some(mode)) => Err(TvModeError::UserError(format!(
            "picture mode '{}' cannot be combined with the '{}' command.\n\n\
             Run `tvmode {}` on its own to switch modes.",
            mode,
            command.name(),
            mode
        ))),
        (Some(Command::Queue(queue_cmd)), None) => dispatch_queue(queue_cmd, &global),
        (Some(Command::Config(config_cmd)), None) => dispatch_config(config_cmd, &global),
        (None, Some(mode)) => set::cmd_set(mode, &global),
        (None, None) => Err(TvModeError::UserError(
            "no picture mode given; expected one of: filmMaker, game".to_string(),
        )),
    }
}

/// Dispatch queue subcommands.
fn dispatch_queue(queue_cmd: QueueCommand, global: &GlobalArgs) -> Result<()> {
    match queue_cmd.action {
        QueueAction::List => queue::cmd_queue_list(global),
        QueueAction::Clear(args) => queue::cmd_queue_clear(args, global),
    }
}

/// Dispatch config subcommands.
fn dispatch_config(config_cmd: ConfigCommand, global: &GlobalArgs) -> Result<()> {
    match config_cmd.action {
        ConfigAction::Show => config_cmd::cmd_config_show(global),
        ConfigAction::Init(args) => config_cmd::cmd_config_init(args, global),
    }
}

/// Resolve the effective configuration: file, then environment, then flags.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = Config::discover(global.config.as_deref())?;
    apply_cli_overrides(&mut config, global);
    config.validate()?;
    Ok(config)
}

/// Command-line flags win over the file and the environment.
pub(crate) fn apply_cli_overrides(config: &mut Config, global: &GlobalArgs) {
    if let Some(address) = &global.address {
        config.device.address = Some(address.trim().to_string());
    }
    if let Some(strategy) = global.strategy {
        config.admission.strategy = strategy;
    }
    if let Some(timeout) = global.timeout {
        config.admission.timeout_seconds = timeout;
    }
}

/// Event sink for this invocation, honoring `event_log`.
pub(crate) fn event_log(config: &Config, ctx: &StateContext) -> EventLog {
    if config.event_log {
        EventLog::to_file(&ctx.events_file)
    } else {
        EventLog::disabled()
    }
}
