//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod status;
pub mod util;
pub mod watch;

use jablosync_api::CloudClient;
use jablosync_core::SyncConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a cloud-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: CloudClient,
    config: SyncConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(client, config, args, global).await,
        Command::Watch(args) => watch::handle(client, config, args, global).await,
        Command::Arm(args) => control::arm(client, config, args, global).await,
        Command::Disarm(args) => control::disarm(client, config, args, global).await,
        Command::Gate(args) => control::gate(client, config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
