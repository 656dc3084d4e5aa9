//! `presence-tui`: live terminal dashboard for the presence add-on.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `presence-core`'s [`QueryStream`](presence_core::QueryStream)s. Screens
//! are navigable via number keys (1-4): Devices, Capabilities, Global, and
//! Primitives. The capability editor and the per-capability assignment
//! list open on top of them.
//!
//! Logs go to a file under the cache directory so they never corrupt the
//! terminal. A background data bridge forwards cache updates from the
//! controller into the TUI action loop.

mod action;
mod app;
mod component;
mod data_bridge;
mod debounce;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use presence_config::{ConfigError, Defaults};
use presence_core::{BasePath, ClientConfig, Controller, TlsVerification};

use crate::app::App;

const LOG_FILE_NAME: &str = "presence-tui.log";

/// Terminal dashboard for presence-tracked devices and capabilities.
#[derive(Parser, Debug)]
#[command(name = "presence-tui", version, about)]
struct Cli {
    /// Profile to use
    #[arg(short = 'p', long, env = "PRESENCE_PROFILE")]
    profile: Option<String>,

    /// Add-on URL or dashboard URL (overrides profile)
    #[arg(short = 's', long, env = "PRESENCE_SERVER")]
    server: Option<String>,

    /// Ingress base path (detected from --server when omitted)
    #[arg(long, env = "PRESENCE_BASE_PATH")]
    base_path: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long, env = "PRESENCE_INSECURE")]
    insecure: bool,

    /// Live-update period in seconds (0 disables polling)
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Log file path (defaults to the presence cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing; stdout belongs to the terminal UI. Hold the guard
/// for the lifetime of the app so buffered lines are flushed.
fn setup_tracing(cli: &Cli) -> Result<WorkerGuard> {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("presence_tui={log_level},presence_core={log_level}"))
    });

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| presence_config::log_dir().join(LOG_FILE_NAME));
    let log_dir = log_file
        .parent()
        .map_or_else(std::env::temp_dir, std::path::Path::to_path_buf);
    std::fs::create_dir_all(&log_dir)?;
    let log_filename = log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new(LOG_FILE_NAME));

    let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    Ok(guard)
}

/// Resolve a [`ClientConfig`]: flags > profile > error.
fn build_client_config(cli: &Cli) -> Result<(ClientConfig, usize)> {
    let cfg = presence_config::load_config_or_default();
    let profile = match cfg.profile(cli.profile.as_deref()) {
        Ok((name, profile)) => Some((name, profile.clone())),
        Err(ConfigError::NoServer) => None,
        Err(e) => return Err(e.into()),
    };

    let mut client = match (&cli.server, &profile) {
        (Some(server), profile) => {
            let base = cli
                .base_path
                .as_deref()
                .or_else(|| profile.as_ref().and_then(|(_, p)| p.base_path.as_deref()));
            let mut client = presence_config::client_config_for_server(server, base)?;
            client.token = profile
                .as_ref()
                .and_then(|(name, p)| presence_config::resolve_token(p, name));
            apply_defaults(&mut client, &cfg.defaults);
            client
        }
        (None, Some((name, p))) => {
            let mut client = presence_config::profile_to_client_config(p, name, &cfg.defaults)?;
            if let Some(base) = cli.base_path.as_deref() {
                client.base_path = BasePath::new(base);
            }
            client
        }
        (None, None) => {
            return Err(eyre!(
                "no add-on configured; run `presence config init` or pass --server (config: {})",
                presence_config::config_path().display()
            ));
        }
    };

    if cli.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = cli.poll_interval {
        client.poll_interval = Duration::from_secs(secs);
    }

    Ok((client, cfg.defaults.page_size))
}

fn apply_defaults(client: &mut ClientConfig, defaults: &Defaults) {
    client.timeout = Duration::from_secs(defaults.timeout);
    client.poll_interval = Duration::from_secs(defaults.poll_interval_secs);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks go in before the terminal switches modes
    tui::install_hooks()?;

    let _log_guard = setup_tracing(&cli)?;

    let (client_config, page_size) = build_client_config(&cli)?;
    info!(
        url = %client_config.url,
        base_path = %client_config.base_path,
        "starting presence-tui"
    );

    let controller = Controller::new(client_config)?;
    let mut app = App::new(controller, page_size);
    app.run().await?;

    Ok(())
}
