use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Error;

/// Registration status as reported by the add-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    New,
    Registered,
}

/// A device observed on the network, keyed by MAC address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub mac: String,
    pub name: String,
    pub vendor: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    pub status: DeviceStatus,
    pub online: bool,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub connected_since_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_ip: Option<String>,
    #[serde(default)]
    pub last_subnet: Option<String>,
    pub last_sources: Vec<String>,
    /// Per-source raw records (`{"wifi": {...}, "dhcp": {...}}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_sources: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub first_seen_at: Option<DateTime<Utc>>,
}

impl Device {
    pub fn is_registered(&self) -> bool {
        self.status == DeviceStatus::Registered
    }
}

/// `GET /api/devices` envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeviceListResponse {
    pub items: Vec<Device>,
}

// ── Request types ───────────────────────────────────────────────────

/// Server-side status filter for `GET /api/devices`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    New,
    Registered,
}

/// Server-side online filter for `GET /api/devices`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OnlineFilter {
    #[default]
    All,
    Online,
    Offline,
}

/// Query parameters for `GET /api/devices`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeviceListParams {
    pub status: StatusFilter,
    pub online: OnlineFilter,
    pub query: String,
}

impl DeviceListParams {
    /// Parameters with `all` and blank values omitted.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match self.status {
            StatusFilter::All => {}
            StatusFilter::New => params.push(("status", "new".to_owned())),
            StatusFilter::Registered => params.push(("status", "registered".to_owned())),
        }
        match self.online {
            OnlineFilter::All => {}
            OnlineFilter::Online => params.push(("online", "true".to_owned())),
            OnlineFilter::Offline => params.push(("online", "false".to_owned())),
        }
        let query = self.query.trim();
        if !query.is_empty() {
            params.push(("query", query.to_owned()));
        }
        params
    }
}

/// Body for `POST /api/devices/{mac}/register` and `PATCH /api/devices/{mac}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl DeviceInput {
    /// Reject empty `name` or `icon` values; `comment` may be blank.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(Error::validation("name", "must not be empty"));
        }
        if self.icon.as_deref().is_some_and(str::is_empty) {
            return Err(Error::validation("icon", "must not be empty"));
        }
        Ok(())
    }
}
