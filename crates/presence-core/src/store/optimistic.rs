// ── Optimistic predictions ──
//
// Pure functions computing the post-mutation value of a cached entry,
// plus a snapshot type that captures several keys for rollback.

use std::sync::Arc;

use presence_api::types::{
    CapabilityDeviceAssignment, CapabilityPatch, CapabilityUIModel, Device, DeviceInput,
    DeviceStatus,
};

use super::cache::QueryStore;
use super::merge::DeviceList;
use super::query_key::QueryKey;

/// Cached values of several keys in one store, as they were before a
/// mutation.
pub struct Snapshot<T> {
    entries: Vec<(QueryKey, Option<Arc<T>>)>,
}

impl<T: Send + Sync + 'static> Snapshot<T> {
    pub fn capture<'a, I>(store: &QueryStore<T>, keys: I) -> Self
    where
        I: IntoIterator<Item = &'a QueryKey>,
    {
        Self {
            entries: keys
                .into_iter()
                .map(|k| (k.clone(), store.snapshot(k)))
                .collect(),
        }
    }

    pub fn restore(self, store: &QueryStore<T>) {
        for (key, value) in self.entries {
            store.restore(&key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}

/// Device as it will look once `input` is accepted.
pub fn predict_device(device: &Device, input: &DeviceInput, register: bool) -> Device {
    let mut next = device.clone();
    if let Some(name) = &input.name {
        next.name.clone_from(name);
    }
    if let Some(icon) = &input.icon {
        next.icon = Some(icon.clone());
    }
    if let Some(comment) = &input.comment {
        next.comment = (!comment.is_empty()).then(|| comment.clone());
    }
    if register {
        next.status = DeviceStatus::Registered;
    }
    next
}

/// Replace the entry for `mac`, leaving every other `Arc` untouched.
pub fn predict_device_list(
    list: &DeviceList,
    mac: &str,
    input: &DeviceInput,
    register: bool,
) -> DeviceList {
    list.iter()
        .map(|d| {
            if d.mac == mac {
                Arc::new(predict_device(d, input, register))
            } else {
                Arc::clone(d)
            }
        })
        .collect()
}

pub fn predict_capabilities(
    list: &[CapabilityUIModel],
    capability_id: &str,
    patch: &CapabilityPatch,
) -> Vec<CapabilityUIModel> {
    list.iter()
        .map(|c| {
            let mut c = c.clone();
            if c.id == capability_id {
                if let Some(state) = &patch.state {
                    c.state.clone_from(state);
                }
                if let Some(enabled) = patch.enabled {
                    c.enabled = enabled;
                }
            }
            c
        })
        .collect()
}

pub fn predict_assignments(
    list: &[CapabilityDeviceAssignment],
    device_id: &str,
    patch: &CapabilityPatch,
) -> Vec<CapabilityDeviceAssignment> {
    list.iter()
        .map(|a| {
            let mut a = a.clone();
            if a.device_id == device_id {
                if let Some(state) = &patch.state {
                    a.state.clone_from(state);
                }
                if let Some(enabled) = patch.enabled {
                    a.enabled = enabled;
                }
            }
            a
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::merge::tests::device;

    #[test]
    fn register_prediction_sets_status_and_fields() {
        let d = device("m1", "old");
        let input = DeviceInput {
            name: Some("Kitchen".into()),
            icon: Some("wired".into()),
            comment: Some(String::new()),
        };
        let next = predict_device(&d, &input, true);
        assert_eq!(next.name, "Kitchen");
        assert_eq!(next.icon.as_deref(), Some("wired"));
        assert_eq!(next.comment, None);
        assert_eq!(next.status, DeviceStatus::Registered);
    }

    #[test]
    fn list_prediction_shares_untouched_entries() {
        let list: DeviceList = vec![Arc::new(device("a", "A")), Arc::new(device("b", "B"))];
        let input = DeviceInput {
            name: Some("Renamed".into()),
            ..DeviceInput::default()
        };
        let next = predict_device_list(&list, "b", &input, false);
        assert!(Arc::ptr_eq(&list[0], &next[0]));
        assert_eq!(next[1].name, "Renamed");
        assert_eq!(next[1].status, DeviceStatus::New);
    }

    #[test]
    fn snapshot_restores_every_key() {
        let store: QueryStore<u32> = QueryStore::new();
        let a = QueryKey::new(["a"]);
        let b = QueryKey::new(["b"]);
        store.set_data(&a, Arc::new(1));

        let snap = Snapshot::capture(&store, [&a, &b]);
        store.set_data(&a, Arc::new(2));
        store.set_data(&b, Arc::new(3));
        snap.restore(&store);

        assert_eq!(*store.data(&a).unwrap(), 1);
        assert!(store.data(&b).is_none());
    }
}
