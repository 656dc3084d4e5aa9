// ── Structural sharing for device lists ──
//
// Poll results are merged against the previous list so unchanged devices
// keep their `Arc` identity and an unchanged list keeps its own.

use std::collections::HashMap;
use std::sync::Arc;

use presence_api::types::Device;

pub type DeviceList = Vec<Arc<Device>>;

/// Compare the fields the list view renders. `raw_sources` and
/// `updated_at` change on every poll and are deliberately ignored.
pub fn same_device_for_list(a: &Device, b: &Device) -> bool {
    a.mac == b.mac
        && a.name == b.name
        && a.vendor == b.vendor
        && a.icon == b.icon
        && a.comment == b.comment
        && a.status == b.status
        && a.online == b.online
        && a.last_seen_at == b.last_seen_at
        && a.connected_since_at == b.connected_since_at
        && a.last_ip == b.last_ip
        && a.last_subnet == b.last_subnet
        && a.first_seen_at == b.first_seen_at
        && a.created_at == b.created_at
        && a.last_sources == b.last_sources
}

/// Merge `next` into `previous`, reusing unchanged entries.
///
/// Returns the previous `Arc` itself when neither order nor content
/// changed.
pub fn merge_devices_for_list(
    previous: Option<&Arc<DeviceList>>,
    next: Vec<Device>,
) -> Arc<DeviceList> {
    let Some(previous) = previous.filter(|p| !p.is_empty()) else {
        return Arc::new(next.into_iter().map(Arc::new).collect());
    };

    let by_mac: HashMap<&str, &Arc<Device>> =
        previous.iter().map(|d| (d.mac.as_str(), d)).collect();
    let mut changed = previous.len() != next.len();
    let mut merged = Vec::with_capacity(next.len());

    for (index, current) in next.into_iter().enumerate() {
        match by_mac.get(current.mac.as_str()) {
            Some(old) if same_device_for_list(old, &current) => {
                if !changed && previous.get(index).is_none_or(|p| !Arc::ptr_eq(p, old)) {
                    changed = true;
                }
                merged.push(Arc::clone(old));
            }
            _ => {
                changed = true;
                merged.push(Arc::new(current));
            }
        }
    }

    if changed {
        Arc::new(merged)
    } else {
        Arc::clone(previous)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::Utc;

    use super::*;
    use presence_api::types::DeviceStatus;

    pub(crate) fn device(mac: &str, name: &str) -> Device {
        Device {
            mac: mac.into(),
            name: name.into(),
            vendor: "Acme".into(),
            icon: None,
            comment: None,
            status: DeviceStatus::New,
            online: true,
            last_seen_at: None,
            connected_since_at: None,
            last_ip: Some("192.168.88.10".into()),
            last_subnet: Some("192.168.88.0/24".into()),
            last_sources: vec!["dhcp".into()],
            raw_sources: None,
            created_at: None,
            updated_at: Utc::now(),
            first_seen_at: None,
        }
    }

    #[test]
    fn first_fetch_wraps_everything() {
        let merged = merge_devices_for_list(None, vec![device("a", "A")]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn identical_list_returns_previous_arc() {
        let prev = merge_devices_for_list(None, vec![device("a", "A"), device("b", "B")]);
        let merged = merge_devices_for_list(Some(&prev), vec![device("a", "A"), device("b", "B")]);
        assert!(Arc::ptr_eq(&prev, &merged));
    }

    #[test]
    fn changed_entry_is_replaced_others_shared() {
        let prev = merge_devices_for_list(None, vec![device("a", "A"), device("b", "B")]);
        let merged =
            merge_devices_for_list(Some(&prev), vec![device("a", "A"), device("b", "Renamed")]);
        assert!(!Arc::ptr_eq(&prev, &merged));
        assert!(Arc::ptr_eq(&prev[0], &merged[0]));
        assert!(!Arc::ptr_eq(&prev[1], &merged[1]));
        assert_eq!(merged[1].name, "Renamed");
    }

    #[test]
    fn reorder_produces_new_list_with_shared_entries() {
        let prev = merge_devices_for_list(None, vec![device("a", "A"), device("b", "B")]);
        let merged = merge_devices_for_list(Some(&prev), vec![device("b", "B"), device("a", "A")]);
        assert!(!Arc::ptr_eq(&prev, &merged));
        assert!(Arc::ptr_eq(&prev[1], &merged[0]));
    }

    #[test]
    fn raw_sources_changes_are_ignored() {
        let prev = merge_devices_for_list(None, vec![device("a", "A")]);
        let mut fresh = device("a", "A");
        fresh.raw_sources = Some(serde_json::json!({"dhcp": {}}));
        let merged = merge_devices_for_list(Some(&prev), vec![fresh]);
        assert!(Arc::ptr_eq(&prev, &merged));
    }
}
