//! Command dispatch: bridges CLI args -> workspace repositories -> output.

pub mod check;
pub mod clients;
pub mod config_cmd;
pub mod orders;
pub mod reps;
pub mod watch;

use pigmea_core::Workspace;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    workspace: &Workspace,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Clients(args) => clients::handle(workspace, args, global).await,
        Command::Reps(args) => reps::handle(workspace, args, global).await,
        Command::Orders(args) => orders::handle(workspace, args, global).await,
        Command::Watch(args) => watch::handle(workspace, args, global).await,
        Command::Check(args) => check::handle(workspace, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
