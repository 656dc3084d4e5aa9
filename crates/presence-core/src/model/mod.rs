// ── Domain model ──
//
// Wire types come from presence-api unchanged; this module adds the
// client-side derivations the UI needs on top of them.

pub mod device;

pub use device::{DeviceType, SourceBreakdown, default_device_name};

pub use presence_api::types::{
    ActionExecutionWarning, ActionInstance, ActionParamField, ActionType, CapabilityControl,
    CapabilityDeviceAssignment, CapabilityListParams, CapabilityPatch, CapabilityScope,
    CapabilityStateConfig, CapabilitySyncConfig, CapabilityTemplate, CapabilityUIModel,
    ControlOption, ControlType, Device, DeviceInput, DeviceListParams, DeviceStatus, FieldKind,
    HaExpose, HealthStatus, OnlineFilter, Params, SetStateResult, StateSourceType, StatusFilter,
    SyncMapping, SyncMode, SyncSource, VisibleIf,
};
