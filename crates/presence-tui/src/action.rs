//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use presence_core::model::{ActionExecutionWarning, CapabilityControl};
use presence_core::{
    ActionType, CapabilityDeviceAssignment, CapabilityEditor, CapabilityListParams, CapabilityPatch,
    CapabilityTemplate, CapabilityUIModel, Device, DeviceInput, DeviceList, StateSourceType,
    SubmitMode,
};

use crate::screen::ScreenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Warning,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }

    /// Summarize action warnings returned by a state change.
    pub fn from_warnings(warnings: &[ActionExecutionWarning]) -> Option<Self> {
        match warnings {
            [] => None,
            [only] => Some(Self::warning(format!("{}: {}", only.type_id, only.message))),
            [first, rest @ ..] => Some(Self::warning(format!(
                "{}: {} (+{} more)",
                first.type_id,
                first.message,
                rest.len()
            ))),
        }
    }
}

/// Pending confirmation action.
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    RegisterDevices { items: Vec<(String, DeviceInput)> },
    DeleteCapability { id: String, label: String },
    DiscardEdits,
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterDevices { items } => match items.len() {
                1 => write!(f, "Register 1 device with its default name?"),
                n => write!(f, "Register {n} devices with their default names?"),
            },
            Self::DeleteCapability { label, .. } => {
                write!(f, "Delete capability {label}? Assignments are removed too.")
            }
            Self::DiscardEdits => write!(f, "Discard unsaved changes?"),
        }
    }
}

/// Data fetched on demand rather than polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Capabilities(CapabilityListParams),
    Primitives,
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    GoBack,

    // ── Data events (from the controller) ─────────────────────────
    DevicesUpdated(Arc<DeviceList>),
    DeviceUpdated(Arc<Device>),
    DeviceCapabilitiesUpdated {
        mac: String,
        capabilities: Arc<Vec<CapabilityUIModel>>,
    },
    GlobalCapabilitiesUpdated(Arc<Vec<CapabilityUIModel>>),
    AssignmentsUpdated {
        capability_id: String,
        assignments: Arc<Vec<CapabilityDeviceAssignment>>,
    },
    CapabilitiesLoaded {
        params: CapabilityListParams,
        capabilities: Arc<Vec<CapabilityTemplate>>,
    },
    PrimitivesLoaded {
        action_types: Arc<Vec<ActionType>>,
        source_types: Arc<Vec<StateSourceType>>,
    },
    /// Last fetch error of the live device list; `None` once it recovers.
    DataError(Option<String>),

    // ── Connection status ─────────────────────────────────────────
    Connected,
    Disconnected(String),
    Reconnecting,
    NotConfigured,
    LastSuccess(Option<DateTime<Utc>>),
    PausedChanged(bool),
    TogglePause,
    /// Invalidate everything on screen and refetch.
    Refresh,

    // ── Subscriptions & loads ─────────────────────────────────────
    FocusDevice(Option<String>),
    Load(Resource),

    // ── Device commands ───────────────────────────────────────────
    SubmitDevice {
        mac: String,
        input: DeviceInput,
        mode: SubmitMode,
    },
    RequestBulkRegister(Vec<(String, DeviceInput)>),
    RefreshRouter,
    SetDeviceCapability {
        mac: String,
        capability_id: String,
        patch: CapabilityPatch,
    },

    // ── Capability commands ───────────────────────────────────────
    SetGlobalCapability {
        capability_id: String,
        patch: CapabilityPatch,
    },
    SetAssignment {
        capability_id: String,
        device_id: String,
        patch: CapabilityPatch,
    },
    RequestDeleteCapability {
        id: String,
        label: String,
    },
    CapabilityDeleted(String),
    DuplicateCapability(Box<CapabilityTemplate>),
    OpenAssignments {
        id: String,
        label: String,
        control: CapabilityControl,
    },

    // ── Editor ────────────────────────────────────────────────────
    /// Open the editor on an existing capability, or a blank one.
    OpenEditor(Option<String>),
    EditorLoaded(Box<CapabilityEditor>),
    SaveCapability(Box<CapabilityEditor>),
    CapabilitySaved(Box<CapabilityTemplate>),
    EditorFailed(String),
    CloseEditor,

    // ── Confirm dialog ────────────────────────────────────────────
    ShowConfirm(ConfirmAction),
    ConfirmYes,
    ConfirmNo,

    // ── Search ────────────────────────────────────────────────────
    OpenSearch,
    CloseSearch,
    SearchInput(String),
    SearchSubmit,

    // ── Help & notifications ──────────────────────────────────────
    ToggleHelp,
    Notify(Notification),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn warning(type_id: &str, message: &str) -> ActionExecutionWarning {
        ActionExecutionWarning {
            action_id: None,
            type_id: type_id.into(),
            message: message.into(),
        }
    }

    #[test]
    fn warnings_collapse_into_one_toast() {
        assert!(Notification::from_warnings(&[]).is_none());

        let one = Notification::from_warnings(&[warning("router.block", "timeout")]).unwrap();
        assert_eq!(one.level, NotificationLevel::Warning);
        assert_eq!(one.message, "router.block: timeout");

        let many = Notification::from_warnings(&[
            warning("router.block", "timeout"),
            warning("notify", "no target"),
        ])
        .unwrap();
        assert_eq!(many.message, "router.block: timeout (+1 more)");
    }

    #[test]
    fn confirm_prompts_read_naturally() {
        let one = ConfirmAction::RegisterDevices {
            items: vec![("aa:bb".into(), DeviceInput::default())],
        };
        assert_eq!(one.to_string(), "Register 1 device with its default name?");

        let delete = ConfirmAction::DeleteCapability {
            id: "kids".into(),
            label: "Kids internet".into(),
        };
        assert!(delete.to_string().starts_with("Delete capability Kids internet?"));
    }
}
