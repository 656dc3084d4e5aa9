// Wire types for the presence add-on REST API.
//
// These mirror the JSON the add-on emits. Deserializing into them is the
// schema check: a body that does not fit surfaces as
// `Error::Deserialization` from the client.

pub mod automation;
pub mod device;

pub use automation::*;
pub use device::*;

use serde::{Deserialize, Serialize};

/// `{ "ok": true }` acknowledgement returned by fire-and-forget endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `GET /healthz` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub configured: bool,
}
