//! Command dispatch: bridges CLI args -> collector operations -> output formatting.

pub mod check;
pub mod config_cmd;
pub mod demo;
pub mod init;
pub mod records;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a stream-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Demo(args) => demo::handle(&args, cfg, global).await,
        Command::Init(args) => init::handle(&args, cfg, global),
        Command::Check(args) => check::handle(&args, cfg, global),
        Command::Records(args) => records::handle(&args, cfg, global),
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
