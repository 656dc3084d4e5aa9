//! Device command handlers.

use chrono::Utc;
use tabled::Tabled;

use presence_core::format::{format_exact_timestamp, format_last_seen_label};
use presence_core::model::device::primary_interface;
use presence_core::registration::bulk_registrations;
use presence_core::{
    CapabilityUIModel, Command as CoreCommand, CommandResult, Controller, Device, DeviceListParams,
    DeviceListView, DeviceType, Pagination, RegistrationForm, SortDirection, SubmitMode,
};

use crate::cli::{DeviceFieldArgs, DevicesArgs, DevicesCommand, GlobalOpts, IconArg};
use crate::error::CliError;
use crate::output;

use super::{status, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Sources")]
    sources: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Seen")]
    seen: String,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        Self {
            name: d.name.clone(),
            mac: d.mac.clone(),
            vendor: d.vendor.clone(),
            ip: d.last_ip.clone().unwrap_or_default(),
            sources: d.last_sources.join(","),
            status: output::status_label(d.is_registered(), color),
            seen: if d.online {
                output::online_marker(true, color)
            } else {
                format_last_seen_label(false, d.last_seen_at, Utc::now())
            },
        }
    }
}

#[derive(Tabled)]
pub(crate) struct CapabilityRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Control")]
    control: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&CapabilityUIModel> for CapabilityRow {
    fn from(c: &CapabilityUIModel) -> Self {
        Self {
            id: c.id.clone(),
            label: c.label.clone(),
            control: c.control.control_type.to_string(),
            state: c
                .control
                .options
                .iter()
                .find(|o| o.value == c.state)
                .map_or_else(|| c.state.clone(), |o| o.label.clone()),
            enabled: if c.enabled { "yes" } else { "no" }.into(),
        }
    }
}

fn detail(d: &Device) -> String {
    let opt = |v: Option<&str>| v.filter(|s| !s.is_empty()).unwrap_or("-").to_owned();
    let mut lines = vec![
        format!("Name:       {}", d.name),
        format!("MAC:        {}", d.mac),
        format!("Vendor:     {}", opt(Some(d.vendor.as_str()))),
        format!("Status:     {}", d.status),
        format!(
            "Type:       {}",
            DeviceType::parse_stored_icon(d.icon.as_deref(), DeviceType::infer(d))
        ),
        format!(
            "Online:     {}",
            format_last_seen_label(d.online, d.last_seen_at, Utc::now())
        ),
        format!("IP:         {}", opt(d.last_ip.as_deref())),
        format!("Subnet:     {}", opt(d.last_subnet.as_deref())),
        format!("Sources:    {}", opt(Some(d.last_sources.join(", ").as_str()))),
    ];
    if let Some(iface) = primary_interface(d) {
        lines.push(format!("Interface:  {iface}"));
    }
    lines.push(format!("Last seen:  {}", format_exact_timestamp(d.last_seen_at)));
    lines.push(format!("Connected:  {}", format_exact_timestamp(d.connected_since_at)));
    lines.push(format!("First seen: {}", format_exact_timestamp(d.first_seen_at)));
    if let Some(comment) = d.comment.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("Comment:    {comment}"));
    }
    lines.join("\n")
}

fn icon_type(icon: IconArg) -> DeviceType {
    match icon {
        IconArg::Wifi => DeviceType::Wifi,
        IconArg::Wired => DeviceType::Wired,
        IconArg::Unknown => DeviceType::Unknown,
    }
}

/// Prefill a form from the device, then apply the flags.
fn form_with(device: &Device, fields: &DeviceFieldArgs) -> RegistrationForm {
    let mut form = RegistrationForm::from_device(device);
    if let Some(ref name) = fields.name {
        form.name.clone_from(name);
    }
    if let Some(icon) = fields.icon {
        form.icon = icon_type(icon);
    }
    if let Some(ref comment) = fields.comment {
        form.comment.clone_from(comment);
    }
    form
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        DevicesCommand::List {
            filter,
            view,
            sort,
            desc,
            page,
            page_size,
            all,
        } => {
            let filter = match view {
                Some(key) => {
                    let views = util::load_saved_views();
                    util::merge_filter_args(util::find_view(&views, &key)?.to_filter(), &filter)
                }
                None => util::filter_from_args(&filter),
            };

            let devices = controller.device_list(&DeviceListParams::default(), true).await?;
            let sort = sort.map(|s| {
                let dir = if desc { SortDirection::Desc } else { SortDirection::Asc };
                (util::sort_column(s), dir)
            });
            let size = if all {
                devices.len().max(1)
            } else {
                page_size.unwrap_or_else(|| {
                    presence_config::load_config_or_default().defaults.page_size
                })
            };
            let pagination = Pagination {
                page_index: page.saturating_sub(1),
                page_size: size.max(1),
            };
            let view = DeviceListView::build(&devices, &filter, sort, pagination);

            let out = output::render_list(
                &global.output,
                view.page_rows(),
                |d| DeviceRow::new(d, color),
                |d| d.mac.clone(),
            );
            output::print_output(&out, global.quiet);

            if matches!(global.output, crate::cli::OutputFormat::Table) && !all {
                util::notice(
                    global,
                    &format!(
                        "page {}/{} · {} of {} devices",
                        view.page.page_index + 1,
                        view.page_count(),
                        view.filtered.len(),
                        view.summary.total,
                    ),
                );
            }
            Ok(())
        }

        DevicesCommand::Get { mac } => {
            let device = controller.device(&mac, true).await?;
            let out = output::render_single(&global.output, &*device, detail, |d| d.mac.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Register { mac, fields } => {
            let device = controller.device(&mac, true).await?;
            if SubmitMode::for_device(&device) != SubmitMode::Register {
                return Err(CliError::Validation {
                    field: "mac".into(),
                    reason: format!("{mac} is already registered; use `devices update`"),
                });
            }
            let input = form_with(&device, &fields).to_input()?;
            controller
                .execute(CoreCommand::RegisterDevice { mac, input })
                .await?;
            util::notice(global, "✓ Device registered");
            Ok(())
        }

        DevicesCommand::Update { mac, fields } => {
            let device = controller.device(&mac, true).await?;
            let input = form_with(&device, &fields).to_input()?;
            let command = match SubmitMode::for_device(&device) {
                SubmitMode::Register => CoreCommand::RegisterDevice { mac, input },
                SubmitMode::Save => CoreCommand::PatchDevice { mac, input },
            };
            controller.execute(command).await?;
            util::notice(global, "✓ Device saved");
            Ok(())
        }

        DevicesCommand::RegisterAll { filter } => {
            let filter = util::filter_from_args(&filter);
            let devices = controller.device_list(&DeviceListParams::default(), true).await?;
            let selection = filter.apply(&devices);
            let items = bulk_registrations(selection.iter().map(|d| &**d));
            if items.is_empty() {
                util::notice(global, "No unregistered devices match");
                return Ok(());
            }
            if !util::confirm(
                &format!("Register {} devices with default names?", items.len()),
                "devices register-all",
                global,
            )? {
                return Ok(());
            }

            let spinner = progress_spinner(global, items.len());
            let result = controller
                .execute(CoreCommand::RegisterDevices { items })
                .await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            if let CommandResult::Bulk { succeeded, failed } = result? {
                util::notice(global, &format!("✓ Registered {} devices", succeeded.len()));
                for (mac, reason) in &failed {
                    eprintln!("  ✗ {mac}: {reason}");
                }
                if !failed.is_empty() {
                    return Err(CliError::Internal(format!(
                        "{} of {} registrations failed",
                        failed.len(),
                        failed.len() + succeeded.len()
                    )));
                }
            }
            Ok(())
        }

        DevicesCommand::Refresh => {
            controller.execute(CoreCommand::RefreshDevices).await?;
            util::notice(global, "✓ Router poll requested");
            Ok(())
        }

        DevicesCommand::Summary => {
            let summary = controller.summary(true).await?;
            let out = output::render_single(
                &global.output,
                &summary,
                status::summary_detail,
                |s| s.total.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Capabilities { mac } => {
            let caps = controller.device_capabilities(&mac, true).await?;
            let out = output::render_list(
                &global.output,
                caps.as_slice(),
                |x| CapabilityRow::from(x),
                |c| format!("{}={}", c.id, c.state),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Set {
            mac,
            capability,
            patch,
        } => {
            let patch = util::patch_from_args(&patch);
            let result = controller
                .execute(CoreCommand::SetDeviceCapability {
                    mac: mac.clone(),
                    capability_id: capability.clone(),
                    patch,
                })
                .await?;
            if let CommandResult::StateChanged(outcome) = result {
                util::report_state_change(
                    global,
                    &format!("{capability} updated on {mac}"),
                    &outcome,
                );
            }
            Ok(())
        }
    }
}

fn progress_spinner(global: &GlobalOpts, count: usize) -> Option<indicatif::ProgressBar> {
    if global.quiet {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_message(format!("Registering {count} devices"));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Some(pb)
}
