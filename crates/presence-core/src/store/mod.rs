pub mod cache;
pub mod merge;
pub mod optimistic;
pub mod query_key;

use std::sync::Arc;
use std::time::Duration;

use presence_api::types::{
    ActionType, CapabilityDeviceAssignment, CapabilityTemplate, CapabilityUIModel, Device,
    StateSourceType,
};

pub use cache::{FetchTicket, QueryState, QueryStore};
pub use merge::DeviceList;
pub use query_key::QueryKey;

use crate::filter::Summary;

// ── Stale times ──────────────────────────────────────────────────────

pub const DEVICE_LIST_STALE: Duration = Duration::from_secs(3);
pub const DEVICE_CAPABILITIES_STALE: Duration = Duration::from_secs(5);
pub const GLOBAL_CAPABILITIES_STALE: Duration = Duration::from_secs(5);
pub const ASSIGNMENTS_STALE: Duration = Duration::from_secs(5);
pub const CAPABILITIES_STALE: Duration = Duration::from_secs(15);
pub const PRIMITIVES_STALE: Duration = Duration::from_secs(60);
/// Device and capability detail entries share the list staleness.
pub const DETAIL_STALE: Duration = Duration::from_secs(3);

/// Typed stores for every query the clients issue.
#[derive(Default)]
pub struct QueryCache {
    pub device_lists: QueryStore<DeviceList>,
    pub device_detail: QueryStore<Device>,
    pub device_capabilities: QueryStore<Vec<CapabilityUIModel>>,
    pub summary: QueryStore<Summary>,
    pub action_types: QueryStore<Vec<ActionType>>,
    pub state_source_types: QueryStore<Vec<StateSourceType>>,
    pub capability_lists: QueryStore<Vec<CapabilityTemplate>>,
    pub capability_detail: QueryStore<CapabilityTemplate>,
    pub assignments: QueryStore<Vec<CapabilityDeviceAssignment>>,
    pub global_capabilities: QueryStore<Vec<CapabilityUIModel>>,
}

impl QueryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Invalidate `prefix` across all stores. Returns the matched count.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let count = self.device_lists.invalidate(prefix)
            + self.device_detail.invalidate(prefix)
            + self.device_capabilities.invalidate(prefix)
            + self.summary.invalidate(prefix)
            + self.action_types.invalidate(prefix)
            + self.state_source_types.invalidate(prefix)
            + self.capability_lists.invalidate(prefix)
            + self.capability_detail.invalidate(prefix)
            + self.assignments.invalidate(prefix)
            + self.global_capabilities.invalidate(prefix);
        tracing::debug!(%prefix, count, "invalidated queries");
        count
    }
}
