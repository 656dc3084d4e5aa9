//! Action and state-source type listings.

use tabled::Tabled;

use presence_core::model::ActionParamField;
use presence_core::{ActionType, Controller, StateSourceType};

use crate::cli::{GlobalOpts, PrimitivesArgs, PrimitivesCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Params")]
    params: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&ActionType> for ActionRow {
    fn from(a: &ActionType) -> Self {
        Self {
            id: a.id.clone(),
            label: a.label.clone(),
            params: param_keys(&a.param_schema),
            description: a.description.clone(),
        }
    }
}

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Output")]
    output: String,
    #[tabled(rename = "Params")]
    params: String,
}

impl From<&StateSourceType> for SourceRow {
    fn from(s: &StateSourceType) -> Self {
        Self {
            id: s.id.clone(),
            label: s.label.clone(),
            output: s.output_type.clone(),
            params: param_keys(&s.param_schema),
        }
    }
}

/// `key*` for required fields, comma separated.
fn param_keys(schema: &[ActionParamField]) -> String {
    schema
        .iter()
        .map(|f| {
            if f.required {
                format!("{}*", f.key)
            } else {
                f.key.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn handle(
    controller: &Controller,
    args: PrimitivesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = match args.command {
        PrimitivesCommand::Actions => {
            let actions = controller.action_types(true).await?;
            output::render_list(&global.output, actions.as_slice(), |x| ActionRow::from(x), |a| {
                a.id.clone()
            })
        }
        PrimitivesCommand::Sources => {
            let sources = controller.state_source_types(true).await?;
            output::render_list(&global.output, sources.as_slice(), |x| SourceRow::from(x), |s| {
                s.id.clone()
            })
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
