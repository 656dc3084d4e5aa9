//! Shared configuration for the presence CLI and TUI.
//!
//! TOML profiles, token resolution (keyring, env, plaintext), and
//! translation to `presence_core::ClientConfig`. The CLI layers its
//! `GlobalOpts` overrides on top of this.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use presence_core::{BasePath, ClientConfig, TlsVerification};

/// Keyring service name for stored tokens.
pub const KEYRING_SERVICE: &str = "presence";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no server configured (set one with `presence config init` or --server)")]
    NoServer,

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick `requested`, else the default profile, else the only profile.
    pub fn profile(&self, requested: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        if let Some(name) = requested.or(self.default_profile.as_deref()) {
            if let Some(profile) = self.profiles.get(name) {
                return Ok((name.to_owned(), profile));
            }
            if requested.is_some() {
                return Err(ConfigError::UnknownProfile { name: name.into() });
            }
        }
        if self.profiles.len() == 1 {
            if let Some((name, profile)) = self.profiles.iter().next() {
                return Ok((name.clone(), profile));
            }
        }
        Err(ConfigError::NoServer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Output format: table, json, json-compact, yaml, plain.
    #[serde(default = "default_output")]
    pub output: String,

    /// auto, always, never.
    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Live-update period in seconds; 0 disables polling.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            poll_interval_secs: default_poll_interval(),
            page_size: default_page_size(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    5
}
fn default_page_size() -> usize {
    25
}

/// A named add-on profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Add-on URL. May be a full dashboard URL behind ingress, e.g.
    /// `http://ha.local:8123/api/hassio_ingress/abc/automation`.
    pub server: String,

    /// Explicit ingress prefix; detected from `server` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Bearer token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "presence")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("presence");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for saved views and other client-side state.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Directory for TUI log files.
pub fn log_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".cache"),
        |dirs| dirs.cache_dir().to_path_buf(),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load the full Config from the canonical file plus `PRESENCE_` env.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path` (if it exists), then `PRESENCE_*` variables.
/// Nested keys use a double underscore: `PRESENCE_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PRESENCE_").split("__"))
        .extract()?;
    Ok(config)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}

/// TOML text of `cfg`, profiles in name order.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    let table = toml::Table::try_from(cfg)?;
    Ok(toml::to_string_pretty(&table)?)
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/token"),
    )?)
}

/// Resolve the optional bearer token: keyring, then `token_env`, then
/// the plaintext `token` field.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Ok(secret) = keyring_entry(profile_name).and_then(|e| e.get_password().map_err(ConfigError::from)) {
        return Some(SecretString::from(secret));
    }

    if let Some(val) = profile
        .token_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Some(SecretString::from(val));
    }

    profile.token.clone().map(SecretString::from)
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

/// Remove a stored token. A missing entry is not an error.
pub fn delete_token(profile_name: &str) -> Result<(), ConfigError> {
    match keyring_entry(profile_name)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ── Translation to ClientConfig ─────────────────────────────────────

/// Parse `server`, applying an explicit base path or detecting one
/// from the URL path.
pub fn client_config_for_server(
    server: &str,
    base_path: Option<&str>,
) -> Result<ClientConfig, ConfigError> {
    let url: Url = server.trim().parse().map_err(|_| ConfigError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {server}"),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("not an http(s) URL: {server}"),
        });
    }

    Ok(match base_path {
        Some(base) => {
            let mut origin = url;
            origin.set_path("/");
            origin.set_query(None);
            let mut cfg = ClientConfig::new(origin);
            cfg.base_path = BasePath::new(base);
            cfg
        }
        None => ClientConfig::from_dashboard_url(&url),
    })
}

/// Build a `ClientConfig` from a profile, without CLI overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let mut cfg = client_config_for_server(&profile.server, profile.base_path.as_deref())?;

    cfg.token = resolve_token(profile, profile_name);
    cfg.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    cfg.poll_interval = Duration::from_secs(defaults.poll_interval_secs);
    Ok(cfg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn profile(server: &str) -> Profile {
        Profile {
            server: server.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.defaults, Defaults::default());
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[defaults]
page_size = 50

[profiles.home]
server = "http://homeassistant.local:8099"
token_env = "HOME_TOKEN"
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.page_size, 50);
        assert_eq!(cfg.defaults.poll_interval_secs, 5);
        let (name, home) = cfg.profile(None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(home.token_env.as_deref(), Some("HOME_TOKEN"));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles
            .insert("default".into(), profile("http://localhost:8099"));

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles, cfg.profiles);
    }

    #[test]
    fn rendered_toml_orders_profiles_by_name() {
        let mut cfg = Config::default();
        for name in ["office", "cabin", "home"] {
            cfg.profiles.insert(name.into(), profile("http://localhost:8099"));
        }
        let text = to_toml(&cfg).unwrap();
        let positions: Vec<usize> = ["[profiles.cabin]", "[profiles.home]", "[profiles.office]"]
            .iter()
            .map(|header| text.find(header).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn unknown_requested_profile_is_an_error() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.profile(Some("work")),
            Err(ConfigError::UnknownProfile { .. })
        ));
        assert!(matches!(cfg.profile(None), Err(ConfigError::NoServer)));
    }

    #[test]
    fn single_profile_is_used_without_default() {
        let mut cfg = Config {
            default_profile: None,
            ..Config::default()
        };
        cfg.profiles
            .insert("lab".into(), profile("http://10.0.0.2:8099"));
        assert_eq!(cfg.profile(None).unwrap().0, "lab");
    }

    #[test]
    fn dashboard_url_detects_ingress_base() {
        let cfg = client_config_for_server(
            "http://ha.local:8123/api/hassio_ingress/abc123/automation",
            None,
        )
        .unwrap();
        assert_eq!(cfg.base_path.as_str(), "/api/hassio_ingress/abc123");
        assert_eq!(cfg.url.as_str(), "http://ha.local:8123/");
    }

    #[test]
    fn explicit_base_path_wins() {
        let cfg = client_config_for_server("http://ha.local:8123/whatever", Some("/ingress/"))
            .unwrap();
        assert_eq!(cfg.base_path.as_str(), "/ingress");
        assert_eq!(cfg.url.path(), "/");
    }

    #[test]
    fn rejects_non_url_server() {
        assert!(client_config_for_server("not a url", None).is_err());
        assert!(client_config_for_server("mailto:me@example.com", None).is_err());
    }

    #[test]
    fn profile_tls_and_timeouts() {
        let mut p = profile("https://addon.example");
        p.insecure = Some(true);
        p.timeout = Some(5);
        let defaults = Defaults {
            poll_interval_secs: 0,
            ..Defaults::default()
        };
        let cfg = profile_to_client_config(&p, "test-profile-tls", &defaults).unwrap();
        assert!(matches!(cfg.tls, TlsVerification::DangerAcceptInvalid));
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(cfg.poll_interval.is_zero());
    }
}
