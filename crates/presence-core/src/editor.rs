// ── Capability editor ──
//
// A mutable draft of a `CapabilityTemplate`. Every operation keeps the
// draft internally consistent: states mirror control options, the
// default state is one of the options, and the sync mapping only names
// existing options.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use presence_api::types::{
    ActionInstance, ActionParamField, ActionType, CapabilityControl, CapabilityScope,
    CapabilityStateConfig, CapabilitySyncConfig, CapabilityTemplate, ControlOption, ControlType,
    FieldKind, HaExpose, Params, StateSourceType, SyncMapping, SyncMode, SyncSource,
};

use crate::error::CoreError;

pub const BUILTIN_CATEGORIES: &[&str] = &[
    "General",
    "Routing",
    "Security",
    "Parental",
    "Connectivity",
    "QoS",
];

pub const GLOBAL_SCOPE_VIOLATION: &str =
    "Global scope does not allow device placeholders in actions or sync params.";

/// Draft id used by routes that create rather than edit.
const NEW_ID: &str = "new";

// ── Template helpers ─────────────────────────────────────────────────

fn switch_options(labels: Option<&[ControlOption]>) -> Vec<ControlOption> {
    let label_for = |value: &str, fallback: &str| {
        labels
            .and_then(|opts| opts.iter().find(|o| o.value == value))
            .map(|o| o.label.trim())
            .filter(|l| !l.is_empty())
            .unwrap_or(fallback)
            .to_owned()
    };
    vec![
        ControlOption::new("on", label_for("on", "On")),
        ControlOption::new("off", label_for("off", "Off")),
    ]
}

/// Empty device-scoped switch template.
pub fn new_template() -> CapabilityTemplate {
    let options = switch_options(None);
    CapabilityTemplate {
        id: String::new(),
        label: String::new(),
        description: String::new(),
        category: "General".into(),
        scope: CapabilityScope::Device,
        states: build_state_map(&options, &IndexMap::new()),
        control: CapabilityControl {
            control_type: ControlType::Switch,
            options,
        },
        default_state: "off".into(),
        sync: None,
        ha_expose: HaExpose {
            enabled: false,
            entity_type: "switch".into(),
            entity_suffix: String::new(),
            name_template: "{{device.name}} capability".into(),
        },
    }
}

/// Canonical option list for `control_type`.
///
/// A switch is always exactly on/off. A select drops blank and duplicate
/// values and is padded with allow/deny when fewer than two remain.
pub fn normalize_control(control_type: ControlType, existing: &[ControlOption]) -> Vec<ControlOption> {
    if control_type == ControlType::Switch {
        return switch_options(Some(existing));
    }

    let mut unique: IndexMap<String, ControlOption> = IndexMap::new();
    for option in existing {
        let value = option.value.trim();
        if value.is_empty() || unique.contains_key(value) {
            continue;
        }
        let label = if option.label.is_empty() {
            value
        } else {
            option.label.as_str()
        };
        unique.insert(value.to_owned(), ControlOption::new(value, label));
    }
    if unique.len() < 2 {
        unique
            .entry("allow".into())
            .or_insert_with(|| ControlOption::new("allow", "Allow"));
        unique
            .entry("deny".into())
            .or_insert_with(|| ControlOption::new("deny", "Deny"));
    }
    unique.into_values().collect()
}

/// One state per option, reusing existing state configs by value.
pub fn build_state_map(
    options: &[ControlOption],
    current: &IndexMap<String, CapabilityStateConfig>,
) -> IndexMap<String, CapabilityStateConfig> {
    options
        .iter()
        .map(|option| {
            let state = current
                .get(&option.value)
                .cloned()
                .unwrap_or_else(|| CapabilityStateConfig {
                    label: option.label.clone(),
                    actions_on_enter: Vec::new(),
                });
            (option.value.clone(), state)
        })
        .collect()
}

pub fn default_value_for_field(field: &ActionParamField) -> Value {
    match field.kind {
        FieldKind::Bool => Value::Bool(false),
        FieldKind::Enum => Value::String(field.options.first().cloned().unwrap_or_default()),
        FieldKind::String => Value::String(String::new()),
    }
}

pub fn default_params(schema: &[ActionParamField]) -> Params {
    schema
        .iter()
        .map(|field| (field.key.clone(), default_value_for_field(field)))
        .collect()
}

/// Fields whose `visible_if` condition holds for `params`.
pub fn visible_fields<'a>(schema: &'a [ActionParamField], params: &Params) -> Vec<&'a ActionParamField> {
    schema
        .iter()
        .filter(|field| {
            field.visible_if.as_ref().is_none_or(|cond| {
                params
                    .get(&cond.key)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v == cond.equals)
            })
        })
        .collect()
}

fn is_device_ref(value: &str) -> bool {
    value.trim().to_lowercase().starts_with("device.")
}

/// Strip `device.*` enum choices from a schema used at global scope.
pub fn scope_param_schema(schema: &[ActionParamField], scope: CapabilityScope) -> Vec<ActionParamField> {
    if scope != CapabilityScope::Global {
        return schema.to_vec();
    }
    schema
        .iter()
        .map(|field| {
            let mut field = field.clone();
            if field.kind == FieldKind::Enum {
                field.options.retain(|o| !is_device_ref(o));
            }
            field
        })
        .collect()
}

/// Any string within `value` that refers to a device placeholder.
pub fn has_scope_violation(value: &Value) -> bool {
    match value {
        Value::String(s) => {
            let normalized = s.trim().to_lowercase();
            normalized.starts_with("device.") || normalized.contains("{{device.")
        }
        Value::Array(items) => items.iter().any(has_scope_violation),
        Value::Object(map) => map.values().any(has_scope_violation),
        _ => false,
    }
}

fn params_violate(params: &Params) -> bool {
    params.values().any(has_scope_violation)
}

/// Device placeholders in a global template's actions or sync params.
pub fn has_global_scope_violation(template: &CapabilityTemplate) -> bool {
    if template.scope != CapabilityScope::Global {
        return false;
    }
    template
        .states
        .values()
        .flat_map(|state| &state.actions_on_enter)
        .any(|action| params_violate(&action.params))
        || template
            .sync
            .as_ref()
            .is_some_and(|sync| params_violate(&sync.source.params))
}

pub fn count_actions(template: &CapabilityTemplate) -> usize {
    template
        .states
        .values()
        .map(|s| s.actions_on_enter.len())
        .sum()
}

/// Copy of `template` under a fresh id (`<id>.copy_<base36 seconds>`).
pub fn duplicate_template(template: &CapabilityTemplate, now: DateTime<Utc>) -> CapabilityTemplate {
    let secs = u64::try_from(now.timestamp()).unwrap_or_default();
    CapabilityTemplate {
        id: format!("{}.copy_{}", template.id, base36(secs)),
        label: format!("{} (Copy)", template.label),
        ..template.clone()
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(char::from(DIGITS[usize::try_from(n % 36).unwrap_or_default()]));
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.iter().rev().collect()
}

/// Trimmed, unique, sorted categories in use.
pub fn categories_from_capabilities(capabilities: &[CapabilityTemplate]) -> Vec<String> {
    let mut out: Vec<String> = capabilities
        .iter()
        .map(|c| c.category.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect();
    out.sort_by(|a, b| crate::filter::natural_cmp(a, b));
    out.dedup();
    out
}

/// Built-in categories followed by any extra ones already in use.
pub fn category_options(in_use: &[String]) -> Vec<String> {
    let mut out: Vec<String> = BUILTIN_CATEGORIES.iter().map(|c| (*c).to_owned()).collect();
    for category in in_use {
        if !out.iter().any(|c| c == category) {
            out.push(category.clone());
        }
    }
    out
}

fn scoped_sync_defaults(source_type: Option<&StateSourceType>, scope: CapabilityScope) -> Params {
    source_type
        .map(|t| default_params(&scope_param_schema(&t.param_schema, scope)))
        .unwrap_or_default()
}

// ── Editor ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CapabilityEditor {
    /// Id the draft was loaded under; `None` for a new capability.
    original_id: Option<String>,
    draft: CapabilityTemplate,
}

impl Default for CapabilityEditor {
    fn default() -> Self {
        Self::create()
    }
}

impl CapabilityEditor {
    pub fn create() -> Self {
        Self {
            original_id: None,
            draft: new_template(),
        }
    }

    pub fn edit(template: CapabilityTemplate) -> Self {
        Self {
            original_id: Some(template.id.clone()),
            draft: template,
        }
    }

    /// New draft seeded from an existing template (import or duplicate).
    pub fn create_from(template: CapabilityTemplate) -> Self {
        Self {
            original_id: None,
            draft: template,
        }
    }

    pub fn is_new(&self) -> bool {
        self.original_id
            .as_deref()
            .is_none_or(|id| id.is_empty() || id == NEW_ID)
    }

    /// Id to `PUT` to when editing.
    pub fn original_id(&self) -> Option<&str> {
        self.original_id.as_deref().filter(|_| !self.is_new())
    }

    pub fn draft(&self) -> &CapabilityTemplate {
        &self.draft
    }

    pub fn into_draft(self) -> CapabilityTemplate {
        self.draft
    }

    // ── Basic fields ─────────────────────────────────────────────────

    /// Ids are fixed once a capability exists.
    pub fn set_id(&mut self, id: &str) {
        if self.is_new() {
            id.clone_into(&mut self.draft.id);
        }
    }

    pub fn set_label(&mut self, label: &str) {
        label.clone_into(&mut self.draft.label);
    }

    pub fn set_description(&mut self, description: &str) {
        description.clone_into(&mut self.draft.description);
    }

    pub fn set_category(&mut self, category: &str) {
        category.clone_into(&mut self.draft.category);
    }

    pub fn set_scope(&mut self, scope: CapabilityScope) {
        self.draft.scope = scope;
    }

    pub fn set_default_state(&mut self, state: &str) {
        if self.draft.states.contains_key(state) {
            state.clone_into(&mut self.draft.default_state);
        }
    }

    pub fn set_ha_enabled(&mut self, enabled: bool) {
        self.draft.ha_expose.enabled = enabled;
    }

    pub fn set_ha_entity_suffix(&mut self, suffix: &str) {
        suffix.clone_into(&mut self.draft.ha_expose.entity_suffix);
    }

    pub fn set_ha_name_template(&mut self, template: &str) {
        template.clone_into(&mut self.draft.ha_expose.name_template);
    }

    // ── Control & options ────────────────────────────────────────────

    pub fn set_control_type(&mut self, control_type: ControlType) {
        let options = normalize_control(control_type, &self.draft.control.options);
        self.draft.states = build_state_map(&options, &self.draft.states);
        if !self.draft.states.contains_key(&self.draft.default_state) {
            if let Some(first) = options.first() {
                self.draft.default_state.clone_from(&first.value);
            }
        }
        self.draft.control.control_type = control_type;
        self.draft.control.options = options;
        self.draft.ha_expose.entity_type = control_type.to_string();
        self.reconcile_sync_mapping();
    }

    /// Edit an option. On a switch only the label may change.
    pub fn update_option(&mut self, index: usize, value: Option<&str>, label: Option<&str>) {
        let mut options = self.draft.control.options.clone();
        let Some(option) = options.get_mut(index) else {
            return;
        };
        if let Some(value) = value {
            value.clone_into(&mut option.value);
        }
        if let Some(label) = label {
            label.clone_into(&mut option.label);
        }
        if self.draft.control.control_type == ControlType::Switch {
            let on = options.first().map_or("", |o| o.label.as_str());
            let off = options.get(1).map_or("", |o| o.label.as_str());
            options = vec![
                ControlOption::new("on", if on.is_empty() { "On" } else { on }),
                ControlOption::new("off", if off.is_empty() { "Off" } else { off }),
            ];
        }
        self.draft.states = build_state_map(&options, &self.draft.states);
        self.draft.control.options = options;
        self.reconcile_sync_mapping();
    }

    pub fn add_select_option(&mut self) {
        if self.draft.control.control_type != ControlType::Select {
            return;
        }
        let n = self.draft.control.options.len() + 1;
        self.draft
            .control
            .options
            .push(ControlOption::new(format!("option_{n}"), format!("Option {n}")));
        self.draft.states = build_state_map(&self.draft.control.options, &self.draft.states);
    }

    /// Only on selects, and never below two options.
    pub fn remove_select_option(&mut self, index: usize) -> bool {
        let options = &self.draft.control.options;
        if self.draft.control.control_type != ControlType::Select
            || options.len() <= 2
            || index >= options.len()
        {
            return false;
        }
        self.draft.control.options.remove(index);
        self.draft.states = build_state_map(&self.draft.control.options, &self.draft.states);
        if !self.draft.states.contains_key(&self.draft.default_state) {
            self.draft.default_state = self
                .draft
                .control
                .options
                .first()
                .map(|o| o.value.clone())
                .unwrap_or_default();
        }
        self.reconcile_sync_mapping();
        true
    }

    // ── States & actions ─────────────────────────────────────────────

    pub fn update_state_label(&mut self, state: &str, label: &str) {
        if let Some(s) = self.draft.states.get_mut(state) {
            label.clone_into(&mut s.label);
        }
    }

    /// Append an action of `action_type` with default params. Returns
    /// the new action id.
    pub fn add_action(&mut self, state: &str, action_type: &ActionType) -> Option<String> {
        let schema = scope_param_schema(&action_type.param_schema, self.draft.scope);
        let target = self.draft.states.get_mut(state)?;
        let id = Uuid::new_v4().to_string();
        target.actions_on_enter.push(ActionInstance {
            id: id.clone(),
            type_id: action_type.id.clone(),
            params: default_params(&schema),
        });
        Some(id)
    }

    pub fn remove_action(&mut self, state: &str, action_id: &str) -> bool {
        let Some(target) = self.draft.states.get_mut(state) else {
            return false;
        };
        let before = target.actions_on_enter.len();
        target.actions_on_enter.retain(|a| a.id != action_id);
        target.actions_on_enter.len() != before
    }

    pub fn set_action_param(&mut self, state: &str, action_id: &str, key: &str, value: Value) {
        if let Some(action) = self
            .draft
            .states
            .get_mut(state)
            .and_then(|s| s.actions_on_enter.iter_mut().find(|a| a.id == action_id))
        {
            action.params.insert(key.to_owned(), value);
        }
    }

    // ── Sync ─────────────────────────────────────────────────────────

    pub fn set_sync_enabled(&mut self, enabled: bool, source_types: &[StateSourceType]) {
        let first = source_types.first();
        let scope = self.draft.scope;

        if !enabled {
            if let Some(sync) = &mut self.draft.sync {
                sync.enabled = false;
            }
            return;
        }

        if let Some(sync) = &mut self.draft.sync {
            sync.enabled = true;
            if sync.source.type_id.is_empty() {
                if let Some(first) = first {
                    sync.source = SyncSource {
                        type_id: first.id.clone(),
                        params: scoped_sync_defaults(Some(first), scope),
                    };
                }
            }
            return;
        }

        let options = &self.draft.control.options;
        let when_true = options
            .first()
            .map_or_else(|| self.draft.default_state.clone(), |o| o.value.clone());
        let when_false = options
            .get(1)
            .map_or_else(|| when_true.clone(), |o| o.value.clone());
        self.draft.sync = Some(CapabilitySyncConfig {
            enabled: true,
            source: SyncSource {
                type_id: first.map(|t| t.id.clone()).unwrap_or_default(),
                params: scoped_sync_defaults(first, scope),
            },
            mapping: SyncMapping {
                when_true,
                when_false,
            },
            mode: SyncMode::ExternalTruth,
            trigger_actions_on_sync: false,
        });
    }

    /// Switch the sync source and reset its params to that type's defaults.
    pub fn set_sync_source_type(&mut self, type_id: &str, source_types: &[StateSourceType]) {
        let scope = self.draft.scope;
        if let Some(sync) = &mut self.draft.sync {
            let source_type = source_types.iter().find(|t| t.id == type_id);
            sync.source = SyncSource {
                type_id: type_id.to_owned(),
                params: scoped_sync_defaults(source_type, scope),
            };
        }
    }

    pub fn set_sync_param(&mut self, key: &str, value: Value) {
        if let Some(sync) = &mut self.draft.sync {
            sync.source.params.insert(key.to_owned(), value);
        }
    }

    pub fn set_sync_mapping(&mut self, when_true: &str, when_false: &str) {
        if let Some(sync) = &mut self.draft.sync {
            when_true.clone_into(&mut sync.mapping.when_true);
            when_false.clone_into(&mut sync.mapping.when_false);
        }
        self.reconcile_sync_mapping();
    }

    pub fn set_sync_mode(&mut self, mode: SyncMode) {
        if let Some(sync) = &mut self.draft.sync {
            sync.mode = mode;
        }
    }

    pub fn set_trigger_actions_on_sync(&mut self, trigger: bool) {
        if let Some(sync) = &mut self.draft.sync {
            sync.trigger_actions_on_sync = trigger;
        }
    }

    /// Point mapping values that no longer name an option at the first
    /// and second options.
    fn reconcile_sync_mapping(&mut self) {
        let options = &self.draft.control.options;
        let fallback_true = options
            .first()
            .map_or_else(|| self.draft.default_state.clone(), |o| o.value.clone());
        let fallback_false = options
            .get(1)
            .map_or_else(|| fallback_true.clone(), |o| o.value.clone());
        let allowed = |v: &str| options.iter().any(|o| o.value == v);

        let Some(sync) = &mut self.draft.sync else {
            return;
        };
        if !allowed(&sync.mapping.when_true) {
            sync.mapping.when_true = fallback_true;
        }
        if !allowed(&sync.mapping.when_false) {
            sync.mapping.when_false = fallback_false;
        }
    }

    // ── Validation ───────────────────────────────────────────────────

    pub fn validate(&self) -> Result<(), CoreError> {
        let draft = &self.draft;
        if draft.id.trim().is_empty() {
            return Err(CoreError::validation("Capability id is required"));
        }
        if draft.label.trim().is_empty() {
            return Err(CoreError::validation("Capability label is required"));
        }
        if !draft
            .control
            .options
            .iter()
            .any(|o| o.value == draft.default_state)
        {
            return Err(CoreError::validation(format!(
                "Default state '{}' is not one of the control options",
                draft.default_state
            )));
        }
        if has_global_scope_violation(draft) {
            return Err(CoreError::validation(GLOBAL_SCOPE_VIOLATION));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use presence_api::types::VisibleIf;

    fn field(key: &str, kind: FieldKind, options: &[&str]) -> ActionParamField {
        ActionParamField {
            key: key.into(),
            label: key.into(),
            kind,
            required: false,
            description: None,
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            visible_if: None,
        }
    }

    #[test]
    fn duplicate_gets_suffixed_id_and_label() {
        let mut original = new_template();
        original.id = "internet".into();
        original.label = "Internet".into();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let copy = duplicate_template(&original, now);
        assert_eq!(copy.id, "internet.copy_s44we8");
        assert_eq!(copy.label, "Internet (Copy)");
        assert_eq!(copy.states, original.states);
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }

    fn source_type(id: &str) -> StateSourceType {
        StateSourceType {
            id: id.into(),
            label: id.into(),
            description: String::new(),
            output_type: "bool".into(),
            param_schema: vec![
                field("target", FieldKind::Enum, &["device.ip", "static"]),
                field("negate", FieldKind::Bool, &[]),
            ],
        }
    }

    fn values(editor: &CapabilityEditor) -> Vec<String> {
        editor
            .draft()
            .control
            .options
            .iter()
            .map(|o| o.value.clone())
            .collect()
    }

    #[test]
    fn new_template_defaults() {
        let t = new_template();
        assert_eq!(t.category, "General");
        assert_eq!(t.default_state, "off");
        assert_eq!(t.states.keys().collect::<Vec<_>>(), vec!["on", "off"]);
        assert_eq!(t.ha_expose.entity_type, "switch");
        assert_eq!(t.ha_expose.name_template, "{{device.name}} capability");
    }

    #[test]
    fn normalize_select_dedupes_and_pads() {
        let opts = normalize_control(
            ControlType::Select,
            &[
                ControlOption::new(" a ", ""),
                ControlOption::new("a", "dup"),
                ControlOption::new("", "blank"),
            ],
        );
        assert_eq!(
            opts,
            vec![
                ControlOption::new("a", "a"),
                ControlOption::new("allow", "Allow"),
                ControlOption::new("deny", "Deny"),
            ]
        );
    }

    #[test]
    fn normalize_switch_keeps_labels() {
        let opts = normalize_control(
            ControlType::Switch,
            &[ControlOption::new("on", "Blocked"), ControlOption::new("x", "y")],
        );
        assert_eq!(
            opts,
            vec![ControlOption::new("on", "Blocked"), ControlOption::new("off", "Off")]
        );
    }

    #[test]
    fn control_type_switch_roundtrip() {
        let mut editor = CapabilityEditor::create();
        editor.set_control_type(ControlType::Select);
        assert_eq!(values(&editor), vec!["on", "off"]);
        assert_eq!(editor.draft().ha_expose.entity_type, "select");

        editor.add_select_option();
        assert_eq!(values(&editor), vec!["on", "off", "option_3"]);
        assert!(editor.draft().states.contains_key("option_3"));

        editor.set_control_type(ControlType::Switch);
        assert_eq!(values(&editor), vec!["on", "off"]);
        assert!(!editor.draft().states.contains_key("option_3"));
        assert_eq!(editor.draft().ha_expose.entity_type, "switch");
    }

    #[test]
    fn remove_option_requires_more_than_two() {
        let mut editor = CapabilityEditor::create();
        assert!(!editor.remove_select_option(0));

        editor.set_control_type(ControlType::Select);
        assert!(!editor.remove_select_option(0));
        editor.add_select_option();
        editor.set_default_state("on");
        assert!(editor.remove_select_option(0));
        assert_eq!(values(&editor), vec!["off", "option_3"]);
        assert_eq!(editor.draft().default_state, "off");
    }

    #[test]
    fn switch_options_only_relabel() {
        let mut editor = CapabilityEditor::create();
        editor.update_option(0, Some("enabled"), Some("Enabled"));
        assert_eq!(
            editor.draft().control.options,
            vec![ControlOption::new("on", "Enabled"), ControlOption::new("off", "Off")]
        );
    }

    #[test]
    fn states_survive_option_rebuild() {
        let mut editor = CapabilityEditor::create();
        let action = ActionType {
            id: "firewall.block".into(),
            label: "Block".into(),
            description: String::new(),
            param_schema: vec![field("chain", FieldKind::Enum, &["forward", "input"])],
        };
        let id = editor.add_action("on", &action).unwrap();
        editor.update_state_label("on", "Blocked");
        editor.set_control_type(ControlType::Select);

        let on = &editor.draft().states["on"];
        assert_eq!(on.label, "Blocked");
        assert_eq!(on.actions_on_enter[0].id, id);
        assert_eq!(on.actions_on_enter[0].params["chain"], json!("forward"));
        assert_eq!(count_actions(editor.draft()), 1);

        editor.set_action_param("on", &id, "chain", json!("input"));
        assert_eq!(editor.draft().states["on"].actions_on_enter[0].params["chain"], json!("input"));
        assert!(editor.remove_action("on", &id));
        assert_eq!(count_actions(editor.draft()), 0);
    }

    #[test]
    fn sync_defaults_on_first_enable() {
        let mut editor = CapabilityEditor::create();
        let types = vec![source_type("router.arp"), source_type("ha.entity")];
        editor.set_sync_enabled(true, &types);

        let sync = editor.draft().sync.clone().unwrap();
        assert!(sync.enabled);
        assert_eq!(sync.source.type_id, "router.arp");
        assert_eq!(sync.source.params["target"], json!("device.ip"));
        assert_eq!(sync.source.params["negate"], json!(false));
        assert_eq!(sync.mapping.when_true, "on");
        assert_eq!(sync.mapping.when_false, "off");
        assert_eq!(sync.mode, SyncMode::ExternalTruth);

        editor.set_sync_param("target", json!("static"));
        editor.set_sync_source_type("ha.entity", &types);
        assert_eq!(editor.draft().sync.as_ref().unwrap().source.params["target"], json!("device.ip"));

        editor.set_sync_enabled(false, &types);
        assert!(!editor.draft().sync.as_ref().unwrap().enabled);
        assert_eq!(editor.draft().sync.as_ref().unwrap().source.type_id, "ha.entity");
    }

    #[test]
    fn global_sync_defaults_skip_device_choices() {
        let mut editor = CapabilityEditor::create();
        editor.set_scope(CapabilityScope::Global);
        editor.set_sync_enabled(true, &[source_type("router.arp")]);
        assert_eq!(editor.draft().sync.as_ref().unwrap().source.params["target"], json!("static"));
    }

    #[test]
    fn mapping_follows_option_changes() {
        let mut editor = CapabilityEditor::create();
        editor.set_control_type(ControlType::Select);
        editor.add_select_option();
        editor.set_sync_enabled(true, &[source_type("s")]);
        editor.set_sync_mapping("option_3", "off");
        editor.remove_select_option(2);
        let mapping = &editor.draft().sync.as_ref().unwrap().mapping;
        assert_eq!(mapping.when_true, "on");
        assert_eq!(mapping.when_false, "off");
    }

    #[test]
    fn visible_if_and_defaults() {
        let mut conditional = field("port", FieldKind::String, &[]);
        conditional.visible_if = Some(VisibleIf {
            key: "mode".into(),
            equals: "custom".into(),
        });
        let schema = vec![field("mode", FieldKind::Enum, &["auto", "custom"]), conditional];

        let mut params = default_params(&schema);
        assert_eq!(params["mode"], json!("auto"));
        assert_eq!(params["port"], json!(""));
        assert_eq!(visible_fields(&schema, &params).len(), 1);

        params.insert("mode".into(), json!("custom"));
        assert_eq!(visible_fields(&schema, &params).len(), 2);

        assert_eq!(default_value_for_field(&field("e", FieldKind::Enum, &[])), json!(""));
    }

    #[test]
    fn scope_schema_strips_device_refs_for_global() {
        let schema = vec![field("target", FieldKind::Enum, &[" Device.ip", "static"])];
        assert_eq!(scope_param_schema(&schema, CapabilityScope::Device), schema);
        assert_eq!(
            scope_param_schema(&schema, CapabilityScope::Global)[0].options,
            vec!["static"]
        );
    }

    #[test]
    fn scope_violation_detection() {
        assert!(has_scope_violation(&json!("device.mac")));
        assert!(has_scope_violation(&json!({"a": ["x", "Hello {{device.name}}"]})));
        assert!(!has_scope_violation(&json!({"a": "static", "b": true})));
    }

    #[test]
    fn validation_rules() {
        let mut editor = CapabilityEditor::create();
        assert!(editor.validate().is_err());
        editor.set_id("guest_wifi");
        editor.set_label("Guest Wi-Fi");
        editor.validate().unwrap();

        editor.set_scope(CapabilityScope::Global);
        let action = ActionType {
            id: "a".into(),
            label: "A".into(),
            description: String::new(),
            param_schema: vec![field("addr", FieldKind::String, &[])],
        };
        let id = editor.add_action("on", &action).unwrap();
        editor.set_action_param("on", &id, "addr", json!("{{device.ip}}"));
        let err = editor.validate().unwrap_err();
        assert!(err.to_string().contains(GLOBAL_SCOPE_VIOLATION));
    }

    #[test]
    fn id_is_frozen_when_editing() {
        let mut template = new_template();
        template.id = "kids".into();
        let mut editor = CapabilityEditor::edit(template);
        assert!(!editor.is_new());
        editor.set_id("other");
        assert_eq!(editor.draft().id, "kids");
        assert_eq!(editor.original_id(), Some("kids"));

        let mut placeholder = new_template();
        placeholder.id = "new".into();
        assert!(CapabilityEditor::edit(placeholder).is_new());
    }

    #[test]
    fn categories() {
        let mut a = new_template();
        a.category = " Security ".into();
        let mut b = new_template();
        b.category = "Lab".into();
        let mut c = new_template();
        c.category = String::new();
        let in_use = categories_from_capabilities(&[a, b, c]);
        assert_eq!(in_use, vec!["Lab", "Security"]);
        let opts = category_options(&in_use);
        assert_eq!(opts.len(), BUILTIN_CATEGORIES.len() + 1);
        assert_eq!(opts.last().unwrap(), "Lab");
    }
}
