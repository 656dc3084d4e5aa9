use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use presence_api::types::Device;

const WIFI_ICONS: &[&str] = &["wifi", "wireless", "wlan"];
const WIRED_ICONS: &[&str] = &["wired", "ethernet", "eth", "lan"];
const WIRED_SOURCES: &[&str] = &["dhcp", "arp", "bridge"];

/// How a device attaches to the network, as shown by its icon.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceType {
    Wifi,
    Wired,
    #[default]
    Unknown,
}

impl DeviceType {
    /// Value written to the device's `icon` field; unknown clears it.
    pub fn to_stored_icon(self) -> Option<String> {
        match self {
            Self::Unknown => None,
            other => Some(other.to_string()),
        }
    }

    /// Parse a stored icon, falling back when it names no known type.
    pub fn parse_stored_icon(icon: Option<&str>, fallback: Self) -> Self {
        let normalized = normalize(icon);
        if WIFI_ICONS.contains(&normalized.as_str()) {
            Self::Wifi
        } else if WIRED_ICONS.contains(&normalized.as_str()) {
            Self::Wired
        } else {
            fallback
        }
    }

    /// Icon first, then observed sources.
    pub fn infer(device: &Device) -> Self {
        let from_icon = Self::parse_stored_icon(device.icon.as_deref(), Self::Unknown);
        if from_icon != Self::Unknown {
            return from_icon;
        }

        if device.last_sources.iter().any(|s| s == "wifi") {
            Self::Wifi
        } else if device
            .last_sources
            .iter()
            .any(|s| WIRED_SOURCES.contains(&s.as_str()))
        {
            Self::Wired
        } else {
            Self::Unknown
        }
    }
}

/// Which router data sources currently report the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SourceBreakdown {
    pub dhcp: bool,
    pub wifi: bool,
    pub arp: bool,
    pub bridge: bool,
}

impl SourceBreakdown {
    pub fn of(device: &Device) -> Self {
        let has = |name: &str| {
            device
                .last_sources
                .iter()
                .any(|s| s.eq_ignore_ascii_case(name))
        };
        Self {
            dhcp: has("dhcp"),
            wifi: has("wifi"),
            arp: has("arp"),
            bridge: has("bridge"),
        }
    }
}

/// First non-empty `interface` reported by the wifi, bridge, arp, or dhcp
/// raw source, in that order.
pub fn primary_interface(device: &Device) -> Option<String> {
    let sources = device.raw_sources.as_ref()?.as_object()?;
    ["wifi", "bridge", "arp", "dhcp"].iter().find_map(|name| {
        let record = sources.get(*name)?.as_object()?;
        let value = record
            .get("Interface")
            .or_else(|| record.get("interface"))?
            .as_str()?
            .trim();
        (!value.is_empty()).then(|| value.to_owned())
    })
}

/// Name proposed when registering a device without typing one.
pub fn default_device_name(mac: &str) -> String {
    let suffix: String = {
        let chars: Vec<char> = mac.chars().collect();
        chars[chars.len().saturating_sub(5)..].iter().collect()
    };
    format!("Device {suffix}")
}

fn normalize(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use presence_api::types::DeviceStatus;

    fn device(icon: Option<&str>, sources: &[&str]) -> Device {
        Device {
            mac: "AA:BB:CC:DD:EE:FF".into(),
            name: "Laptop".into(),
            vendor: "Dell".into(),
            icon: icon.map(str::to_owned),
            comment: None,
            status: DeviceStatus::New,
            online: true,
            last_seen_at: None,
            connected_since_at: None,
            last_ip: None,
            last_subnet: None,
            last_sources: sources.iter().map(|s| (*s).to_owned()).collect(),
            raw_sources: None,
            created_at: None,
            updated_at: Utc::now(),
            first_seen_at: None,
        }
    }

    #[test]
    fn icon_wins_over_sources() {
        assert_eq!(DeviceType::infer(&device(Some(" LAN "), &["wifi"])), DeviceType::Wired);
        assert_eq!(DeviceType::infer(&device(Some("wlan"), &["arp"])), DeviceType::Wifi);
    }

    #[test]
    fn sources_decide_without_icon() {
        assert_eq!(DeviceType::infer(&device(None, &["dhcp", "wifi"])), DeviceType::Wifi);
        assert_eq!(DeviceType::infer(&device(Some("tv"), &["bridge"])), DeviceType::Wired);
        assert_eq!(DeviceType::infer(&device(None, &[])), DeviceType::Unknown);
    }

    #[test]
    fn stored_icon_roundtrip_rules() {
        assert_eq!(DeviceType::Unknown.to_stored_icon(), None);
        assert_eq!(DeviceType::Wifi.to_stored_icon().as_deref(), Some("wifi"));
        assert_eq!(
            DeviceType::parse_stored_icon(Some("toaster"), DeviceType::Wired),
            DeviceType::Wired
        );
    }

    #[test]
    fn breakdown_is_case_insensitive() {
        let b = SourceBreakdown::of(&device(None, &["DHCP", "arp"]));
        assert!(b.dhcp && b.arp);
        assert!(!b.wifi && !b.bridge);
    }

    #[test]
    fn primary_interface_follows_source_priority() {
        let mut d = device(None, &[]);
        d.raw_sources = Some(json!({
            "dhcp": {"interface": "bridge-lan"},
            "arp": {"Interface": "  "},
            "wifi": {"Interface": "wlan2"}
        }));
        assert_eq!(primary_interface(&d).as_deref(), Some("wlan2"));

        d.raw_sources = Some(json!({"dhcp": {"interface": "bridge-lan"}, "arp": {"Interface": " "}}));
        assert_eq!(primary_interface(&d).as_deref(), Some("bridge-lan"));

        d.raw_sources = None;
        assert!(primary_interface(&d).is_none());
    }

    #[test]
    fn default_name_uses_mac_tail() {
        assert_eq!(default_device_name("AA:BB:CC:DD:EE:FF"), "Device EE:FF");
        assert_eq!(default_device_name("ab"), "Device ab");
    }
}
