// ── Command API ──
//
// Every write against the add-on flows through `Command`. The controller
// applies optimistic cache updates, issues the request, and rolls back
// or invalidates as each variant requires.

use presence_api::types::{CapabilityPatch, CapabilityTemplate, DeviceInput, SetStateResult};

use crate::error::CoreError;

/// A command envelope sent through the command channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

#[derive(Debug, Clone)]
pub enum Command {
    // ── Device operations ────────────────────────────────────────────
    RegisterDevice {
        mac: String,
        input: DeviceInput,
    },
    PatchDevice {
        mac: String,
        input: DeviceInput,
    },
    /// Register several devices in one go; failures are reported per mac.
    RegisterDevices {
        items: Vec<(String, DeviceInput)>,
    },
    RefreshDevices,

    // ── Capability state ─────────────────────────────────────────────
    SetDeviceCapability {
        mac: String,
        capability_id: String,
        patch: CapabilityPatch,
    },
    SetAssignment {
        capability_id: String,
        device_id: String,
        patch: CapabilityPatch,
    },
    SetGlobalCapability {
        capability_id: String,
        patch: CapabilityPatch,
    },

    // ── Capability templates ─────────────────────────────────────────
    /// Create when `original_id` is `None`, otherwise update it.
    SaveCapability {
        original_id: Option<String>,
        template: Box<CapabilityTemplate>,
    },
    DeleteCapability {
        id: String,
    },
}

#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    StateChanged(SetStateResult),
    Capability(Box<CapabilityTemplate>),
    /// Macs that registered, and those that failed with their error text.
    Bulk {
        succeeded: Vec<String>,
        failed: Vec<(String, String)>,
    },
}
