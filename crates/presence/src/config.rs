//! CLI configuration: thin wrapper around `presence_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--server, --base-path, --token, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use presence_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use presence_config::{
    Config, ConfigError, Defaults, Profile, config_path, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Active profile name from flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ClientConfig` from the config file, profile, and CLI flags.
///
/// Flags win over the profile. Without any profile, `--server` alone is
/// enough.
pub fn resolve_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config_or_default();

    let profile = match cfg.profile(global.profile.as_deref()) {
        Ok((name, profile)) => Some((name, profile.clone())),
        Err(ConfigError::NoServer) => None,
        Err(ConfigError::UnknownProfile { name }) => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut client = match (&global.server, &profile) {
        (Some(server), profile) => {
            let base = global
                .base_path
                .as_deref()
                .or_else(|| profile.as_ref().and_then(|(_, p)| p.base_path.as_deref()));
            let mut client = presence_config::client_config_for_server(server, base)?;
            client.token = profile
                .as_ref()
                .and_then(|(name, p)| presence_config::resolve_token(p, name));
            client.timeout = Duration::from_secs(cfg.defaults.timeout);
            client
        }
        (None, Some((name, p))) => {
            let mut client = presence_config::profile_to_client_config(p, name, &cfg.defaults)?;
            if let Some(base) = global.base_path.as_deref() {
                client.base_path = presence_core::BasePath::new(base);
            }
            client
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref token) = global.token {
        client.token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        client.timeout = Duration::from_secs(secs);
    }
    // One-shot commands never poll.
    client.poll_interval = Duration::ZERO;

    Ok(client)
}
