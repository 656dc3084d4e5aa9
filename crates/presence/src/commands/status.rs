//! `presence status`: add-on health plus the device summary.

use serde::Serialize;

use presence_core::{Controller, Summary};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusReport {
    server: String,
    base_path: String,
    status: String,
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    devices: Option<Summary>,
}

pub fn summary_detail(s: &Summary) -> String {
    [
        format!("Total:        {}", s.total),
        format!("Online:       {}", s.online),
        format!("Offline:      {}", s.offline),
        format!("New:          {}", s.new),
        format!("Registered:   {}", s.registered),
        format!("Unregistered: {}", s.unregistered),
    ]
    .join("\n")
}

fn status_detail(r: &StatusReport) -> String {
    let mut lines = vec![
        format!("Server:       {}", r.server),
        format!("Base path:    {}", r.base_path),
        format!("Status:       {}", r.status),
        format!("Configured:   {}", if r.configured { "yes" } else { "no" }),
    ];
    if let Some(ref devices) = r.devices {
        lines.push(String::new());
        lines.push(summary_detail(devices));
    }
    lines.join("\n")
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let health = controller.health().await?;
    let config = controller.config();
    // An unconfigured add-on answers health checks but not device queries.
    let devices = if health.configured {
        Some(controller.summary(true).await?)
    } else {
        None
    };
    let report = StatusReport {
        server: config.url.to_string(),
        base_path: config.base_path.to_string(),
        status: health.status,
        configured: health.configured,
        devices,
    };

    let out = output::render_single(&global.output, &report, status_detail, |r| {
        r.status.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
