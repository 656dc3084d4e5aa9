//! Capability template handlers.

use chrono::Utc;
use tabled::Tabled;

use presence_core::editor::{
    categories_from_capabilities, category_options, count_actions, duplicate_template,
    new_template,
};
use presence_core::{
    CapabilityDeviceAssignment, CapabilityEditor, CapabilityListParams, CapabilityTemplate,
    Command as CoreCommand, CommandResult, Controller,
};

use crate::cli::{CapabilitiesArgs, CapabilitiesCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Control")]
    control: String,
    #[tabled(rename = "Actions")]
    actions: usize,
    #[tabled(rename = "Sync")]
    sync: String,
    #[tabled(rename = "HA")]
    ha: String,
}

impl From<&CapabilityTemplate> for TemplateRow {
    fn from(t: &CapabilityTemplate) -> Self {
        Self {
            id: t.id.clone(),
            label: t.label.clone(),
            category: t.category.clone(),
            scope: t.scope.to_string(),
            control: t.control.control_type.to_string(),
            actions: count_actions(t),
            sync: t
                .sync
                .as_ref()
                .filter(|s| s.enabled)
                .map_or_else(|| "-".into(), |s| s.source.type_id.clone()),
            ha: if t.ha_expose.enabled {
                t.ha_expose.entity_type.clone()
            } else {
                "-".into()
            },
        }
    }
}

#[derive(Tabled)]
struct AssignmentRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "State")]
    state: String,
}

impl AssignmentRow {
    fn new(a: &CapabilityDeviceAssignment, color: bool) -> Self {
        Self {
            device: a.device_name.clone(),
            mac: a.device_id.clone(),
            ip: a.device_ip.clone().unwrap_or_default(),
            online: output::online_marker(a.online, color),
            enabled: if a.enabled { "yes" } else { "no" }.into(),
            state: a.state.clone(),
        }
    }
}

fn detail(t: &CapabilityTemplate) -> String {
    let mut lines = vec![
        format!("ID:           {}", t.id),
        format!("Label:        {}", t.label),
        format!("Category:     {}", t.category),
        format!("Scope:        {}", t.scope),
        format!("Control:      {}", t.control.control_type),
        format!("Default:      {}", t.default_state),
    ];
    if !t.description.is_empty() {
        lines.push(format!("Description:  {}", t.description));
    }

    lines.push(String::new());
    lines.push("States:".into());
    for (value, state) in &t.states {
        lines.push(format!("  {value} ({})", state.label));
        for action in &state.actions_on_enter {
            lines.push(format!("    → {} [{}]", action.type_id, action.id));
        }
    }

    if let Some(ref sync) = t.sync {
        lines.push(String::new());
        lines.push(format!(
            "Sync:         {} via {} ({})",
            if sync.enabled { "on" } else { "off" },
            sync.source.type_id,
            sync.mode,
        ));
        lines.push(format!(
            "  true → {}, false → {}",
            sync.mapping.when_true, sync.mapping.when_false
        ));
    }

    if t.ha_expose.enabled {
        lines.push(String::new());
        lines.push(format!(
            "Home Assistant: {} \"{}\" (suffix {})",
            t.ha_expose.entity_type, t.ha_expose.name_template, t.ha_expose.entity_suffix
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: CapabilitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        CapabilitiesCommand::List { search, category } => {
            let params = CapabilityListParams {
                search: search.unwrap_or_default(),
                category: category.unwrap_or_default(),
            };
            let caps = controller.capabilities(&params, true).await?;
            let out = output::render_list(
                &global.output,
                caps.as_slice(),
                |x| TemplateRow::from(x),
                |t| t.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CapabilitiesCommand::Get { id } => {
            let template = controller.capability(&id, true).await?;
            let out =
                output::render_single(&global.output, &*template, detail, |t| t.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CapabilitiesCommand::Template => {
            // Starting point for `create --from-file`; JSON unless YAML was asked for.
            let template = new_template();
            let out = match global.output {
                OutputFormat::Yaml => output::render_yaml(&template),
                _ => serde_json::to_string_pretty(&template)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CapabilitiesCommand::Create { from_file } => {
            let template = util::read_template(&from_file)?;
            let saved = controller
                .save_capability(&CapabilityEditor::create_from(template))
                .await?;
            util::notice(global, &format!("✓ Created capability {}", saved.id));
            Ok(())
        }

        CapabilitiesCommand::Update { id, from_file } => {
            let template = util::read_template(&from_file)?;
            if template.id != id {
                return Err(CliError::Validation {
                    field: "id".into(),
                    reason: format!(
                        "file describes '{}' but '{id}' was given; ids cannot be changed",
                        template.id
                    ),
                });
            }
            // Fails with not-found before anything is sent.
            controller.capability(&id, true).await?;
            let saved = controller
                .save_capability(&CapabilityEditor::edit(template))
                .await?;
            util::notice(global, &format!("✓ Updated capability {}", saved.id));
            Ok(())
        }

        CapabilitiesCommand::Duplicate { id } => {
            let source = controller.capability(&id, true).await?;
            let copy = duplicate_template(&source, Utc::now());
            let saved = controller
                .save_capability(&CapabilityEditor::create_from(copy))
                .await?;
            util::notice(
                global,
                &format!("✓ Duplicated {id} as {} ({})", saved.id, saved.label),
            );
            Ok(())
        }

        CapabilitiesCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete capability {id}?"),
                "capabilities delete",
                global,
            )? {
                return Ok(());
            }
            controller
                .execute(CoreCommand::DeleteCapability { id: id.clone() })
                .await?;
            util::notice(global, &format!("✓ Deleted capability {id}"));
            Ok(())
        }

        CapabilitiesCommand::Categories => {
            let caps = controller
                .capabilities(&CapabilityListParams::default(), true)
                .await?;
            let categories = category_options(&categories_from_capabilities(&caps));
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => categories.join("\n"),
                _ => output::render_single(&global.output, &categories, |_| String::new(), |_| {
                    String::new()
                }),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CapabilitiesCommand::Assignments { id } => {
            let rows = controller.assignments(&id, true).await?;
            let out = output::render_list(
                &global.output,
                rows.as_slice(),
                |a| AssignmentRow::new(a, color),
                |a| a.device_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CapabilitiesCommand::Assign { id, device, patch } => {
            let result = controller
                .execute(CoreCommand::SetAssignment {
                    capability_id: id.clone(),
                    device_id: device.clone(),
                    patch: util::patch_from_args(&patch),
                })
                .await?;
            if let CommandResult::StateChanged(outcome) = result {
                util::report_state_change(
                    global,
                    &format!("{id} updated on {device}"),
                    &outcome,
                );
            }
            Ok(())
        }
    }
}
