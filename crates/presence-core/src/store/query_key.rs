// ── Hierarchical query keys ──
//
// Keys are segment lists so that invalidation can target a whole subtree
// (`devices` drops every list, detail, and capability entry at once).

use std::fmt;

use presence_api::types::{CapabilityListParams, DeviceListParams};

/// A cache key made of ordered path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// `true` when `prefix` matches this key segment-for-segment.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    // ── Device keys ──────────────────────────────────────────────────

    pub fn devices() -> Self {
        Self::new(["devices"])
    }

    pub fn devices_lists() -> Self {
        Self::new(["devices", "list"])
    }

    /// One entry per distinct server-side filter combination.
    pub fn devices_list(params: &DeviceListParams) -> Self {
        let canonical = format!(
            "status={}&online={}&query={}",
            params.status,
            params.online,
            params.query.trim()
        );
        Self::new(["devices".to_owned(), "list".to_owned(), canonical])
    }

    pub fn device_detail(mac: &str) -> Self {
        Self::new(["devices", "detail", mac])
    }

    pub fn device_capabilities(mac: &str) -> Self {
        Self::new(["devices", "capabilities", mac])
    }

    pub fn devices_summary() -> Self {
        Self::new(["devices", "summary"])
    }

    // ── Automation keys ──────────────────────────────────────────────

    pub fn automation() -> Self {
        Self::new(["automation"])
    }

    pub fn action_types() -> Self {
        Self::new(["automation", "action-types"])
    }

    pub fn state_source_types() -> Self {
        Self::new(["automation", "state-source-types"])
    }

    pub fn capabilities_lists() -> Self {
        Self::new(["automation", "capabilities"])
    }

    pub fn capabilities(params: &CapabilityListParams) -> Self {
        let canonical = format!(
            "search={}&category={}",
            params.search.trim(),
            params.category.trim()
        );
        Self::new([
            "automation".to_owned(),
            "capabilities".to_owned(),
            canonical,
        ])
    }

    pub fn capability(id: &str) -> Self {
        Self::new(["automation", "capability", id])
    }

    pub fn assignments(capability_id: &str) -> Self {
        Self::new(["automation", "assignments", capability_id])
    }

    pub fn global_capabilities() -> Self {
        Self::new(["automation", "global-capabilities"])
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_api::types::{OnlineFilter, StatusFilter};

    #[test]
    fn prefix_matching_is_per_segment() {
        let detail = QueryKey::device_detail("AA:BB");
        assert!(detail.starts_with(&QueryKey::devices()));
        assert!(!detail.starts_with(&QueryKey::devices_lists()));
        assert!(!QueryKey::new(["devicesx"]).starts_with(&QueryKey::devices()));
    }

    #[test]
    fn list_keys_differ_by_params() {
        let all = QueryKey::devices_list(&DeviceListParams::default());
        let online = QueryKey::devices_list(&DeviceListParams {
            status: StatusFilter::New,
            online: OnlineFilter::Online,
            query: "  tv ".into(),
        });
        assert_ne!(all, online);
        assert!(online.starts_with(&QueryKey::devices_lists()));
        assert_eq!(online.to_string(), "devices/list/status=new&online=online&query=tv");
    }
}
