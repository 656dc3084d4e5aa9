// ── Device list filtering ──
//
// Every predicate is independent; a device is shown when all of them
// match. Facet options are always derived from the full collection so
// narrowing one facet never hides choices in another.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use presence_api::types::{Device, DeviceStatus};

/// Label used for missing or blank facet values.
pub const UNKNOWN: &str = "Unknown";

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
pub enum RegistrationScope {
    #[default]
    All,
    New,
    Registered,
    /// Anything not yet registered, which today equals `New`.
    Unregistered,
}

impl RegistrationScope {
    pub fn matches(self, device: &Device) -> bool {
        match self {
            Self::All => true,
            Self::New => device.status == DeviceStatus::New,
            Self::Registered => device.is_registered(),
            Self::Unregistered => !device.is_registered(),
        }
    }
}

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
pub enum OnlineScope {
    #[default]
    Any,
    Online,
    Offline,
}

impl OnlineScope {
    pub fn matches(self, device: &Device) -> bool {
        match self {
            Self::Any => true,
            Self::Online => device.online,
            Self::Offline => !device.online,
        }
    }

    /// Any → Online → Offline → Any.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Any => Self::Online,
            Self::Online => Self::Offline,
            Self::Offline => Self::Any,
        }
    }
}

/// A filterable dimension of the device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Facet {
    Vendor,
    Source,
    Subnet,
}

/// Case-insensitive substring match over the searchable device fields.
pub fn match_search(device: &Device, search: &str) -> bool {
    let query = search.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    let mut haystack = vec![
        device.name.as_str(),
        device.mac.as_str(),
        device.vendor.as_str(),
        device.last_ip.as_deref().unwrap_or_default(),
        device.last_subnet.as_deref().unwrap_or_default(),
    ];
    haystack.extend(device.last_sources.iter().map(String::as_str));
    haystack.join(" ").to_lowercase().contains(&query)
}

/// Trimmed facet value; missing or blank becomes [`UNKNOWN`].
pub fn facet_value(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => UNKNOWN.to_owned(),
    }
}

pub fn match_facet(value: Option<&str>, selected: &[String]) -> bool {
    selected.is_empty() || selected.contains(&facet_value(value))
}

/// A device matches when any of its sources is selected.
pub fn match_sources(sources: &[String], selected: &[String]) -> bool {
    if selected.is_empty() {
        return true;
    }
    if sources.is_empty() {
        return selected.iter().any(|s| s == UNKNOWN);
    }
    sources
        .iter()
        .any(|source| selected.contains(&facet_value(Some(source))))
}

/// Case-insensitive ordering with a byte-wise tie-break.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Normalize, dedupe, and sort facet values.
pub fn unique_sorted<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let set: BTreeSet<String> = values.into_iter().map(facet_value).collect();
    let mut out: Vec<String> = set.into_iter().collect();
    out.sort_by(|a, b| natural_cmp(a, b));
    out
}

// ── Filter state ─────────────────────────────────────────────────────

/// Complete client-side filter for the device list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
    pub registration: RegistrationScope,
    pub online: OnlineScope,
    pub search: String,
    pub vendors: Vec<String>,
    pub sources: Vec<String>,
    pub subnets: Vec<String>,
}

impl DeviceFilter {
    pub fn matches(&self, device: &Device) -> bool {
        self.registration.matches(device)
            && self.online.matches(device)
            && match_search(device, &self.search)
            && match_facet(Some(device.vendor.as_str()), &self.vendors)
            && match_sources(&device.last_sources, &self.sources)
            && match_facet(device.last_subnet.as_deref(), &self.subnets)
    }

    /// Filtered subset, preserving input order and `Arc` identity.
    pub fn apply(&self, devices: &[Arc<Device>]) -> Vec<Arc<Device>> {
        devices
            .iter()
            .filter(|d| self.matches(d))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn selected(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Vendor => &self.vendors,
            Facet::Source => &self.sources,
            Facet::Subnet => &self.subnets,
        }
    }

    /// Add or remove `value` from a facet selection.
    pub fn toggle(&mut self, facet: Facet, value: &str) {
        let selection = match facet {
            Facet::Vendor => &mut self.vendors,
            Facet::Source => &mut self.sources,
            Facet::Subnet => &mut self.subnets,
        };
        if let Some(pos) = selection.iter().position(|v| v == value) {
            selection.remove(pos);
        } else {
            selection.push(value.to_owned());
            selection.sort_by(|a, b| natural_cmp(a, b));
        }
    }

    pub fn clear_facets(&mut self) {
        self.vendors.clear();
        self.sources.clear();
        self.subnets.clear();
    }
}

// ── Facet options & summary ──────────────────────────────────────────

/// Facet choices observed across the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetOptions {
    pub vendors: Vec<String>,
    pub sources: Vec<String>,
    pub subnets: Vec<String>,
}

impl FacetOptions {
    pub fn from_devices(devices: &[Arc<Device>]) -> Self {
        Self {
            vendors: unique_sorted(devices.iter().map(|d| Some(d.vendor.as_str()))),
            sources: unique_sorted(
                devices
                    .iter()
                    .flat_map(|d| d.last_sources.iter().map(|s| Some(s.as_str()))),
            ),
            subnets: unique_sorted(devices.iter().map(|d| d.last_subnet.as_deref())),
        }
    }

    pub fn get(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Vendor => &self.vendors,
            Facet::Source => &self.sources,
            Facet::Subnet => &self.subnets,
        }
    }
}

/// Headline counts over the full collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub new: usize,
    pub registered: usize,
    pub unregistered: usize,
}

impl Summary {
    pub fn from_devices<'a, I>(devices: I) -> Self
    where
        I: IntoIterator<Item = &'a Device>,
    {
        devices.into_iter().fold(Self::default(), |mut acc, d| {
            acc.total += 1;
            if d.online {
                acc.online += 1;
            } else {
                acc.offline += 1;
            }
            if d.is_registered() {
                acc.registered += 1;
            } else {
                acc.unregistered += 1;
            }
            if d.status == DeviceStatus::New {
                acc.new += 1;
            }
            acc
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::merge::tests::device;

    fn fixtures() -> Vec<Arc<Device>> {
        let mut laptop = device("AA:00:00:00:00:01", "Work Laptop");
        laptop.vendor = "Dell".into();
        laptop.last_sources = vec!["wifi".into(), "dhcp".into()];

        let mut tv = device("AA:00:00:00:00:02", "Living Room TV");
        tv.vendor = "  ".into();
        tv.online = false;
        tv.status = DeviceStatus::Registered;
        tv.last_subnet = None;
        tv.last_sources = vec![];

        let mut phone = device("AA:00:00:00:00:03", "phone");
        phone.vendor = "apple".into();
        phone.last_ip = Some("10.0.0.7".into());
        phone.last_subnet = Some("10.0.0.0/24".into());
        phone.last_sources = vec!["arp".into()];

        vec![Arc::new(laptop), Arc::new(tv), Arc::new(phone)]
    }

    fn names(devices: &[Arc<Device>]) -> Vec<&str> {
        devices.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn search_is_case_insensitive_over_all_fields() {
        let all = fixtures();
        let mut f = DeviceFilter {
            search: "  LAPTOP ".into(),
            ..DeviceFilter::default()
        };
        assert_eq!(names(&f.apply(&all)), vec!["Work Laptop"]);

        f.search = "10.0.0".into();
        assert_eq!(names(&f.apply(&all)), vec!["phone"]);

        f.search = "00:02".into();
        assert_eq!(names(&f.apply(&all)), vec!["Living Room TV"]);

        f.search = "WIFI".into();
        assert_eq!(names(&f.apply(&all)), vec!["Work Laptop"]);

        f.search = "   ".into();
        assert_eq!(f.apply(&all).len(), 3);
    }

    #[test]
    fn scopes_combine_as_conjunction() {
        let all = fixtures();
        let f = DeviceFilter {
            registration: RegistrationScope::Unregistered,
            online: OnlineScope::Online,
            ..DeviceFilter::default()
        };
        assert_eq!(names(&f.apply(&all)), vec!["Work Laptop", "phone"]);

        let f = DeviceFilter {
            online: OnlineScope::Offline,
            ..DeviceFilter::default()
        };
        assert_eq!(names(&f.apply(&all)), vec!["Living Room TV"]);
    }

    #[test]
    fn blank_facet_values_map_to_unknown() {
        let all = fixtures();
        let f = DeviceFilter {
            vendors: vec![UNKNOWN.into()],
            ..DeviceFilter::default()
        };
        assert_eq!(names(&f.apply(&all)), vec!["Living Room TV"]);

        let f = DeviceFilter {
            sources: vec![UNKNOWN.into(), "arp".into()],
            ..DeviceFilter::default()
        };
        assert_eq!(names(&f.apply(&all)), vec!["Living Room TV", "phone"]);
    }

    #[test]
    fn facet_options_come_from_full_collection() {
        let all = fixtures();
        let opts = FacetOptions::from_devices(&all);
        assert_eq!(opts.vendors, vec!["apple", "Dell", UNKNOWN]);
        assert_eq!(opts.sources, vec!["arp", "dhcp", "wifi"]);
        assert_eq!(opts.subnets, vec!["10.0.0.0/24", "192.168.88.0/24", UNKNOWN]);
    }

    #[test]
    fn toggle_adds_and_removes() {
        let mut f = DeviceFilter::default();
        f.toggle(Facet::Vendor, "Dell");
        f.toggle(Facet::Vendor, "apple");
        assert_eq!(f.selected(Facet::Vendor), ["apple", "Dell"]);
        f.toggle(Facet::Vendor, "Dell");
        assert_eq!(f.selected(Facet::Vendor), ["apple"]);
        f.clear_facets();
        assert!(f.is_empty());
    }

    #[test]
    fn summary_counts() {
        let all = fixtures();
        let s = Summary::from_devices(all.iter().map(|d| &**d));
        assert_eq!(
            s,
            Summary {
                total: 3,
                online: 2,
                offline: 1,
                new: 2,
                registered: 1,
                unregistered: 2,
            }
        );
    }
}
