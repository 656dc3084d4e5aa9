// presence-api: Async Rust client for the device-presence add-on REST API

pub mod client;
pub mod error;
pub mod ingress;
pub mod transport;
pub mod types;

mod automation;
mod devices;

pub use client::PresenceClient;
pub use error::{Error, NOT_CONFIGURED_CODE, UNKNOWN_ERROR_CODE};
pub use ingress::BasePath;
pub use transport::{TlsMode, TransportConfig};
