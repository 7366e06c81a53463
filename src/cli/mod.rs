//! CLI argument parsing for tvmode.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::Strategy;
use crate::device::PictureMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tvmode: switch the television's picture mode, one invocation at a time.
///
/// Concurrent invocations wait their turn in a file-backed FIFO queue, so
/// the device only ever receives one mode change at a time and the last
/// request made is the one that sticks.
#[derive(Parser, Debug)]
#[command(name = "tvmode")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    /// Picture mode to switch to.
    #[arg(value_enum, required = true)]
    pub mode: Option<PictureMode>,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options shared by every command.
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Path to config.yaml (overrides TVMODE_CONFIG and the default location).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Admission strategy.
    #[arg(long, global = true, value_enum)]
    pub strategy: Option<Strategy>,

    /// Seconds to wait for admission before giving up.
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Network address of the television.
    #[arg(long, global = true, value_name = "ADDR")]
    pub address: Option<String>,
}

/// Maintenance commands for tvmode.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or repair the admission queue.
    Queue(QueueCommand),

    /// Inspect or create the configuration file.
    Config(ConfigCommand),
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Queue(_) => "queue",
            Command::Config(_) => "config",
        }
    }
}

/// Arguments for the `queue` command.
#[derive(Parser, Debug)]
pub struct QueueCommand {
    #[command(subcommand)]
    pub action: QueueAction,
}

/// Available queue actions.
#[derive(Subcommand, Debug)]
pub enum QueueAction {
    /// List queued invocations, head first.
    ///
    /// Shows each identifier with its age; the head is the invocation
    /// currently allowed to talk to the device.
    List,

    /// Remove entries left behind by crashed invocations.
    ///
    /// Requires --force.
    Clear(QueueClearArgs),
}

/// Arguments for the `queue clear` command.
#[derive(Parser, Debug)]
pub struct QueueClearArgs {
    /// Identifier to remove.
    #[arg(required_unless_present_any = ["all", "stale"])]
    pub id: Option<String>,

    /// Remove every entry.
    #[arg(long, conflicts_with_all = ["id", "stale"])]
    pub all: bool,

    /// Remove only entries past the stale threshold.
    #[arg(long, conflicts_with = "id")]
    pub stale: bool,

    /// Force clearing (required for safety).
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `config` command.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Available config actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as YAML.
    Show,

    /// Write a starter config.yaml.
    ///
    /// Writes to --config if given, otherwise to the per-user default path.
    Init(ConfigInitArgs),
}

/// Arguments for the `config init` command.
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
