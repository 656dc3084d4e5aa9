use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Error;

/// Free-form action/sync parameters keyed by param-schema field.
pub type Params = BTreeMap<String, serde_json::Value>;

// ── Primitives (action and state-source catalogs) ───────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    String,
    Enum,
    Bool,
}

/// Show a field only while another param equals a given value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleIf {
    pub key: String,
    pub equals: String,
}

/// One entry of an action or state-source param schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParamField {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<VisibleIf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionType {
    pub id: String,
    pub label: String,
    pub description: String,
    pub param_schema: Vec<ActionParamField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSourceType {
    pub id: String,
    pub label: String,
    pub description: String,
    pub output_type: String,
    pub param_schema: Vec<ActionParamField>,
}

// ── Capability templates ────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CapabilityScope {
    #[default]
    Device,
    Global,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ControlType {
    #[default]
    Switch,
    Select,
}

/// An action bound to entering a capability state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstance {
    pub id: String,
    pub type_id: String,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlOption {
    pub value: String,
    pub label: String,
}

impl ControlOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityControl {
    #[serde(rename = "type")]
    pub control_type: ControlType,
    pub options: Vec<ControlOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityStateConfig {
    pub label: String,
    pub actions_on_enter: Vec<ActionInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSource {
    pub type_id: String,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMapping {
    pub when_true: String,
    pub when_false: String,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncMode {
    /// The external source is authoritative; capability state follows it.
    #[default]
    ExternalTruth,
    /// The capability is authoritative; the source only seeds it.
    InternalTruth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySyncConfig {
    pub enabled: bool,
    pub source: SyncSource,
    pub mapping: SyncMapping,
    pub mode: SyncMode,
    pub trigger_actions_on_sync: bool,
}

/// Home Assistant entity exposure settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaExpose {
    pub enabled: bool,
    pub entity_type: String,
    pub entity_suffix: String,
    pub name_template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityTemplate {
    pub id: String,
    pub label: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub scope: CapabilityScope,
    pub control: CapabilityControl,
    /// Keyed by control option value, in the order the add-on returned.
    pub states: IndexMap<String, CapabilityStateConfig>,
    pub default_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<CapabilitySyncConfig>,
    pub ha_expose: HaExpose,
}

// ── Read models ─────────────────────────────────────────────────────

/// A capability as bound to one device (or the global scope).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityUIModel {
    pub id: String,
    pub label: String,
    pub description: String,
    pub control: CapabilityControl,
    pub state: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDeviceAssignment {
    pub device_id: String,
    pub device_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_ip: Option<String>,
    pub online: bool,
    pub enabled: bool,
    pub state: String,
}

/// Non-fatal failure of one action while entering a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExecutionWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    pub type_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStateResult {
    pub ok: bool,
    #[serde(default)]
    pub warnings: Vec<ActionExecutionWarning>,
}

// ── Request types ───────────────────────────────────────────────────

/// Filters for `GET /api/automation/capabilities`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CapabilityListParams {
    pub search: String,
    pub category: String,
}

impl CapabilityListParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let search = self.search.trim();
        if !search.is_empty() {
            params.push(("search", search.to_owned()));
        }
        let category = self.category.trim();
        if !category.is_empty() {
            params.push(("category", category.to_owned()));
        }
        params
    }
}

/// Body for the capability state/enabled PATCH endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl CapabilityPatch {
    pub fn state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            enabled: None,
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            state: None,
            enabled: Some(enabled),
        }
    }

    /// At least one field must be set, and `state` must not be empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.state.is_none() && self.enabled.is_none() {
            return Err(Error::validation(
                "patch",
                "Either state or enabled must be provided",
            ));
        }
        if self.state.as_deref().is_some_and(str::is_empty) {
            return Err(Error::validation("state", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn template_json() -> serde_json::Value {
        json!({
            "id": "internet",
            "label": "Internet access",
            "description": "Block or allow WAN",
            "category": "Parental",
            "control": {
                "type": "select",
                "options": [
                    {"value": "allow", "label": "Allow"},
                    {"value": "deny", "label": "Deny"}
                ]
            },
            "states": {
                "deny": {"label": "Deny", "actions_on_enter": [
                    {"id": "a1", "type_id": "routeros.address_list.add",
                     "params": {"list": "blocked", "address": "{{device.ip}}"}}
                ]},
                "allow": {"label": "Allow", "actions_on_enter": []}
            },
            "default_state": "allow",
            "ha_expose": {
                "enabled": true,
                "entity_type": "select",
                "entity_suffix": "internet",
                "name_template": "{{device.name}} internet"
            }
        })
    }

    #[test]
    fn template_defaults_scope_and_keeps_state_order() {
        let template: CapabilityTemplate =
            serde_json::from_value(template_json()).expect("template should parse");
        assert_eq!(template.scope, CapabilityScope::Device);
        assert_eq!(template.control.control_type, ControlType::Select);
        let keys: Vec<_> = template.states.keys().cloned().collect();
        assert_eq!(keys, vec!["deny", "allow"]);
        assert!(template.sync.is_none());
    }

    #[test]
    fn template_serializes_control_type_as_type() {
        let template: CapabilityTemplate =
            serde_json::from_value(template_json()).expect("template should parse");
        let value = serde_json::to_value(&template).expect("serialize");
        assert_eq!(value["control"]["type"], "select");
        assert_eq!(value["scope"], "device");
        assert!(value.get("sync").is_none());
    }

    #[test]
    fn states_keep_wire_order_through_text_and_value() {
        let body = r#"{
            "id": "lights", "label": "Lights", "description": "", "category": "Home",
            "control": {"type": "select", "options": []},
            "states": {
                "zeta": {"label": "Z", "actions_on_enter": []},
                "alpha": {"label": "A", "actions_on_enter": []},
                "mid": {"label": "M", "actions_on_enter": []}
            },
            "default_state": "zeta",
            "ha_expose": {"enabled": false, "entity_type": "select",
                          "entity_suffix": "", "name_template": ""}
        }"#;
        let template: CapabilityTemplate = serde_json::from_str(body).expect("parse");
        let keys: Vec<_> = template.states.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

        let value = serde_json::to_value(&template).expect("serialize");
        let echoed: Vec<_> = value["states"]
            .as_object()
            .expect("states object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(echoed, keys);
    }

    #[test]
    fn set_state_result_defaults_warnings() {
        let result: SetStateResult =
            serde_json::from_value(json!({"ok": true})).expect("parse");
        assert!(result.ok);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn param_field_defaults_options() {
        let field: ActionParamField = serde_json::from_value(json!({
            "key": "list",
            "label": "Address list",
            "kind": "enum",
            "required": true
        }))
        .expect("parse");
        assert!(field.options.is_empty());
        assert!(field.visible_if.is_none());
    }

    #[test]
    fn patch_requires_some_field() {
        assert!(CapabilityPatch::default().validate().is_err());
        assert!(CapabilityPatch::state("").validate().is_err());
        assert!(CapabilityPatch::state("on").validate().is_ok());
        assert!(CapabilityPatch::enabled(false).validate().is_ok());
        assert_eq!(
            serde_json::to_value(CapabilityPatch::enabled(false)).expect("serialize"),
            json!({"enabled": false})
        );
    }

    #[test]
    fn capability_params_skip_blank_filters() {
        let params = CapabilityListParams {
            search: "  ".into(),
            category: " Parental ".into(),
        };
        assert_eq!(params.to_query(), vec![("category", "Parental".to_owned())]);
    }
}
