// ── Core error types ──
//
// User-facing errors from presence-core. Consumers never match on HTTP
// status codes or JSON parse failures directly; the `From<presence_api::Error>`
// impl translates transport-layer errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to presence add-on at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Controller disconnected")]
    ControllerDisconnected,

    /// The add-on is reachable but has no router integration configured.
    #[error("Integration not configured: {message}")]
    NotConfigured { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// A response body did not match the expected schema.
    #[error("Invalid response from add-on: {message}")]
    InvalidResponse { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// Add-on error code (e.g. `not_found`, `invalid_payload`).
        code: String,
        status: u16,
    },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Failed to persist {what}: {reason}")]
    Persistence { what: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// `true` when the add-on reported `integration_not_configured`.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }

    /// `true` when the add-on could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout | Self::ControllerDisconnected
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<presence_api::Error> for CoreError {
    fn from(err: presence_api::Error) -> Self {
        if err.is_not_configured() {
            return CoreError::NotConfigured {
                message: err.to_string(),
            };
        }

        match err {
            presence_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: presence_api::UNKNOWN_ERROR_CODE.into(),
                        status: e.status().map_or(0, |s| s.as_u16()),
                    }
                }
            }
            presence_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            presence_api::Error::CannotBeABase(url) => CoreError::Config {
                message: format!("URL cannot be used as an API base: {url}"),
            },
            presence_api::Error::Tls(message) => CoreError::ConnectionFailed {
                url: "<tls>".into(),
                reason: message,
            },
            presence_api::Error::Api {
                message,
                code,
                status,
            } => {
                if status == 404 {
                    CoreError::NotFound {
                        entity_type: "resource".into(),
                        identifier: message,
                    }
                } else {
                    CoreError::Api {
                        message,
                        code,
                        status,
                    }
                }
            }
            presence_api::Error::Deserialization { message, .. } => {
                CoreError::InvalidResponse { message }
            }
            presence_api::Error::Validation { field, reason } => CoreError::ValidationFailed {
                message: format!("{field}: {reason}"),
            },
        }
    }
}
