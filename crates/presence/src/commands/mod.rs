//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod capabilities;
pub mod config_cmd;
pub mod devices;
pub mod global;
pub mod primitives;
pub mod status;
pub mod util;
pub mod views;

use presence_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a connection-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Capabilities(args) => capabilities::handle(controller, args, global).await,
        Command::Global(args) => global::handle(controller, args, global).await,
        Command::Primitives(args) => primitives::handle(controller, args, global).await,
        Command::Status => status::handle(controller, global).await,
        // Handled before a connection is made
        Command::Config(_) | Command::Views(_) | Command::Completions(_) => Err(
            CliError::Internal("local command routed to the add-on".into()),
        ),
    }
}
