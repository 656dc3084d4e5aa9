// ── Runtime connection configuration ──
//
// These types describe *how* to reach a presence add-on and how often to
// poll it. They never touch disk: the CLI/TUI builds a `ClientConfig`
// from presence-config and hands it in.

use std::time::Duration;

use presence_api::BasePath;
use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed reverse proxies).
    DangerAcceptInvalid,
}

/// Configuration for talking to a single add-on instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin (e.g. `http://homeassistant.local:8099`).
    pub url: Url,
    /// Ingress prefix prepended to every request path.
    pub base_path: BasePath,
    /// Optional bearer token for proxies that require one.
    pub token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Background poll period for live data. Zero disables polling.
    pub poll_interval: Duration,
}

impl ClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            base_path: BasePath::root(),
            token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Build from a dashboard URL, detecting the ingress base path.
    pub fn from_dashboard_url(url: &Url) -> Self {
        let (origin, base_path) = BasePath::from_dashboard_url(url);
        Self {
            base_path,
            ..Self::new(origin)
        }
    }
}
