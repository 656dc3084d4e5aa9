//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use presence_config::ConfigError;
use presence_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_CONFIGURED: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the presence add-on at {url}")]
    #[diagnostic(
        code(presence::connection_failed),
        help(
            "Check that the add-on is running and reachable.\n\
             Reason: {reason}\n\
             Behind Home Assistant ingress, pass the full dashboard URL to --server."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(presence::timeout),
        help("Increase the timeout with --timeout or check the add-on's responsiveness.")
    )]
    Timeout,

    #[error("The add-on has no router integration configured")]
    #[diagnostic(
        code(presence::not_configured),
        help(
            "Open the add-on configuration in Home Assistant and set up the router connection.\n\
             Server said: {message}"
        )
    )]
    NotConfigured { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(presence::not_found),
        help("Run: presence {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(presence::api_error))]
    ApiError {
        code: String,
        message: String,
        status: u16,
    },

    #[error("Unexpected response from the add-on: {message}")]
    #[diagnostic(
        code(presence::invalid_response),
        help("The add-on and this CLI may be out of sync; update both.")
    )]
    InvalidResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(presence::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(presence::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: presence config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No add-on server configured")]
    #[diagnostic(
        code(presence::no_config),
        help(
            "Create a profile with: presence config init\n\
             Or pass --server (PRESENCE_SERVER).\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(presence::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(presence::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(presence::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(presence::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NotConfigured { .. } => exit_code::NOT_CONFIGURED,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::ControllerDisconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "connection to the add-on was lost".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::NotConfigured { message } => CliError::NotConfigured { message },

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices list".into(),
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{entity_type} list"),
                resource_type: entity_type,
                identifier,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api {
                message,
                code,
                status,
            } => CliError::ApiError {
                code,
                message,
                status,
            },

            CoreError::InvalidResponse { message } => CliError::InvalidResponse { message },

            CoreError::Persistence { what, reason } => CliError::Internal(format!(
                "could not save {what}: {reason}"
            )),

            CoreError::Config { message } => CliError::Validation {
                field: "server".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoServer => CliError::NoConfig {
                path: presence_config::config_path().display().to_string(),
            },
            other => CliError::Config(other),
        }
    }
}
