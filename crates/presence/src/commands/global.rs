//! Global (house-wide) capability handlers.

use presence_core::{Command as CoreCommand, CommandResult, Controller};

use crate::cli::{GlobalArgs, GlobalCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::devices::CapabilityRow;
use super::util;

pub async fn handle(
    controller: &Controller,
    args: GlobalArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        GlobalCommand::List => {
            let caps = controller.global_capabilities(true).await?;
            let out = output::render_list(
                &global.output,
                caps.as_slice(),
                |x| CapabilityRow::from(x),
                |c| format!("{}={}", c.id, c.state),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GlobalCommand::Set { capability, patch } => {
            let result = controller
                .execute(CoreCommand::SetGlobalCapability {
                    capability_id: capability.clone(),
                    patch: util::patch_from_args(&patch),
                })
                .await?;
            if let CommandResult::StateChanged(outcome) = result {
                util::report_state_change(global, &format!("{capability} updated"), &outcome);
            }
            Ok(())
        }
    }
}
