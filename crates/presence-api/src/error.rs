use thiserror::Error;

/// Error code the add-on reports while its router integration is not set up.
pub const NOT_CONFIGURED_CODE: &str = "integration_not_configured";

/// Code used when an error response carries no `{error: {code}}` of its own.
pub const UNKNOWN_ERROR_CODE: &str = "unknown_error";

/// Top-level error type for the `presence-api` crate.
///
/// Covers transport failures, the add-on's `{ error: { message, code } }`
/// envelope, response bodies that do not match the expected schema, and
/// request payloads rejected before any I/O happens.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured URL cannot carry path segments (e.g. `mailto:`).
    #[error("URL cannot be used as an API base: {0}")]
    CannotBeABase(String),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Structured error from the add-on.
    #[error("{message}")]
    Api {
        message: String,
        code: String,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body did not match the expected schema.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Request payload rejected client-side.
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl Error {
    /// Returns `true` when the add-on has no router integration configured yet.
    pub fn is_not_configured(&self) -> bool {
        self.api_error_code() == Some(NOT_CONFIGURED_CODE)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Extract the API error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}
