//! Capability editor: a full-frame form over a [`CapabilityEditor`] draft.
//!
//! The form is a flat list of rows derived from the draft on every frame,
//! so adding an option or an action simply produces new rows. Text rows
//! edit through a [`TextField`] buffer that writes through on each key;
//! choice rows cycle with ←/→; button rows act on Enter.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use serde_json::Value;
use throbber_widgets_tui::{Throbber, ThrobberState};

use presence_core::editor::{
    categories_from_capabilities, category_options, has_global_scope_violation,
    scope_param_schema, visible_fields, GLOBAL_SCOPE_VIOLATION,
};
use presence_core::model::{ActionParamField, CapabilityScope, ControlType, FieldKind, SyncMode};
use presence_core::{ActionType, CapabilityEditor, CapabilityTemplate, StateSourceType};

use crate::action::{Action, ConfirmAction, Resource};
use crate::component::Component;
use crate::theme;
use crate::widgets::{centered_rect, cycle_index, key_hints, step_index, text_field::TextField};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Id,
    Label,
    Description,
    Category,
    Scope,
    ControlType,
    DefaultState,
    OptionValue(usize),
    OptionLabel(usize),
    AddOption,
    StateLabel(String),
    Action { state: String, action: String },
    ActionParam { state: String, action: String, key: String },
    AddAction(String),
    SyncEnabled,
    SyncSource,
    SyncParam(String),
    SyncWhenTrue,
    SyncWhenFalse,
    SyncMode,
    SyncTrigger,
    HaEnabled,
    HaSuffix,
    HaName,
}

impl Field {
    fn section(&self) -> &'static str {
        match self {
            Self::Id | Self::Label | Self::Description | Self::Category | Self::Scope => "Details",
            Self::ControlType
            | Self::DefaultState
            | Self::OptionValue(_)
            | Self::OptionLabel(_)
            | Self::AddOption => "Control",
            Self::StateLabel(_) | Self::Action { .. } | Self::ActionParam { .. } | Self::AddAction(_) => {
                "States"
            }
            Self::SyncEnabled
            | Self::SyncSource
            | Self::SyncParam(_)
            | Self::SyncWhenTrue
            | Self::SyncWhenFalse
            | Self::SyncMode
            | Self::SyncTrigger => "Sync",
            Self::HaEnabled | Self::HaSuffix | Self::HaName => "Home Assistant",
        }
    }

    fn indent(&self) -> usize {
        match self {
            Self::Action { .. } | Self::AddAction(_) | Self::SyncParam(_) => 2,
            Self::ActionParam { .. } => 4,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Choice,
    Button,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => yes_no(*b).to_owned(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// The entry after (or before) `current` in `values`; the first entry
/// when `current` is not among them.
fn pick<'a>(values: &'a [String], current: &str, forward: bool) -> Option<&'a String> {
    let next = values
        .iter()
        .position(|v| v == current)
        .map_or(0, |i| cycle_index(i, forward, values.len()));
    values.get(next)
}

/// Next value of an enum or bool param; text params have none.
fn next_param_value(field: &ActionParamField, current: Option<&Value>, forward: bool) -> Option<Value> {
    match field.kind {
        FieldKind::Enum => {
            let current = current.and_then(Value::as_str).unwrap_or_default();
            pick(&field.options, current, forward).map(|v| Value::String(v.clone()))
        }
        FieldKind::Bool => Some(Value::Bool(!current.and_then(Value::as_bool).unwrap_or(false))),
        FieldKind::String => None,
    }
}

#[derive(Default)]
pub struct EditorScreen {
    focused: bool,
    editor: Option<CapabilityEditor>,
    baseline: Option<CapabilityTemplate>,
    action_types: Arc<Vec<ActionType>>,
    source_types: Arc<Vec<StateSourceType>>,
    primitives_loaded: bool,
    categories: Vec<String>,
    cursor: usize,
    input: Option<(Field, TextField)>,
    /// Action type picker: target state and highlighted type.
    picker: Option<(String, usize)>,
    error: Option<String>,
    saving: bool,
    throbber_state: ThrobberState,
}

impl EditorScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(&mut self, editor: CapabilityEditor) -> Option<Action> {
        self.baseline = Some(editor.draft().clone());
        self.editor = Some(editor);
        self.cursor = 0;
        self.input = None;
        self.picker = None;
        self.error = None;
        self.saving = false;
        (!self.primitives_loaded).then_some(Action::Load(Resource::Primitives))
    }

    fn clear(&mut self) {
        self.editor = None;
        self.baseline = None;
        self.input = None;
        self.picker = None;
        self.saving = false;
    }

    fn is_dirty(&self) -> bool {
        match (&self.editor, &self.baseline) {
            (Some(editor), Some(baseline)) => editor.draft() != baseline,
            _ => false,
        }
    }

    // ── Row model ────────────────────────────────────────────────────

    fn action_schema(&self, type_id: &str, scope: CapabilityScope) -> Vec<ActionParamField> {
        self.action_types
            .iter()
            .find(|t| t.id == type_id)
            .map(|t| scope_param_schema(&t.param_schema, scope))
            .unwrap_or_default()
    }

    fn source_schema(&self, type_id: &str, scope: CapabilityScope) -> Vec<ActionParamField> {
        self.source_types
            .iter()
            .find(|t| t.id == type_id)
            .map(|t| scope_param_schema(&t.param_schema, scope))
            .unwrap_or_default()
    }

    fn rows(&self) -> Vec<Field> {
        let Some(editor) = &self.editor else {
            return Vec::new();
        };
        let draft = editor.draft();
        let mut rows = Vec::new();
        if editor.is_new() {
            rows.push(Field::Id);
        }
        rows.extend([
            Field::Label,
            Field::Description,
            Field::Category,
            Field::Scope,
            Field::ControlType,
            Field::DefaultState,
        ]);

        let select = draft.control.control_type == ControlType::Select;
        for i in 0..draft.control.options.len() {
            if select {
                rows.push(Field::OptionValue(i));
            }
            rows.push(Field::OptionLabel(i));
        }
        if select {
            rows.push(Field::AddOption);
        }

        for (state, config) in &draft.states {
            rows.push(Field::StateLabel(state.clone()));
            for action in &config.actions_on_enter {
                rows.push(Field::Action {
                    state: state.clone(),
                    action: action.id.clone(),
                });
                let schema = self.action_schema(&action.type_id, draft.scope);
                for field in visible_fields(&schema, &action.params) {
                    rows.push(Field::ActionParam {
                        state: state.clone(),
                        action: action.id.clone(),
                        key: field.key.clone(),
                    });
                }
            }
            rows.push(Field::AddAction(state.clone()));
        }

        rows.push(Field::SyncEnabled);
        if let Some(sync) = draft.sync.as_ref().filter(|s| s.enabled) {
            rows.push(Field::SyncSource);
            let schema = self.source_schema(&sync.source.type_id, draft.scope);
            for field in visible_fields(&schema, &sync.source.params) {
                rows.push(Field::SyncParam(field.key.clone()));
            }
            rows.extend([
                Field::SyncWhenTrue,
                Field::SyncWhenFalse,
                Field::SyncMode,
                Field::SyncTrigger,
            ]);
        }

        rows.push(Field::HaEnabled);
        if draft.ha_expose.enabled {
            rows.extend([Field::HaSuffix, Field::HaName]);
        }
        rows
    }

    fn param_field(&self, field: &Field) -> Option<ActionParamField> {
        let draft = self.editor.as_ref()?.draft();
        let (schema, key) = match field {
            Field::ActionParam { state, action, key } => {
                let action = draft
                    .states
                    .get(state)?
                    .actions_on_enter
                    .iter()
                    .find(|a| a.id == *action)?;
                (self.action_schema(&action.type_id, draft.scope), key)
            }
            Field::SyncParam(key) => {
                let source = &draft.sync.as_ref()?.source;
                (self.source_schema(&source.type_id, draft.scope), key)
            }
            _ => return None,
        };
        schema.into_iter().find(|f| f.key == *key)
    }

    fn param_value(&self, field: &Field) -> Option<Value> {
        let draft = self.editor.as_ref()?.draft();
        match field {
            Field::ActionParam { state, action, key } => draft
                .states
                .get(state)?
                .actions_on_enter
                .iter()
                .find(|a| a.id == *action)?
                .params
                .get(key)
                .cloned(),
            Field::SyncParam(key) => draft.sync.as_ref()?.source.params.get(key).cloned(),
            _ => None,
        }
    }

    fn kind(&self, field: &Field) -> Kind {
        match field {
            Field::Id
            | Field::Label
            | Field::Description
            | Field::OptionValue(_)
            | Field::OptionLabel(_)
            | Field::StateLabel(_)
            | Field::HaSuffix
            | Field::HaName => Kind::Text,
            Field::ActionParam { .. } | Field::SyncParam(_) => {
                match self.param_field(field).map(|f| f.kind) {
                    Some(FieldKind::Enum | FieldKind::Bool) => Kind::Choice,
                    _ => Kind::Text,
                }
            }
            Field::AddOption | Field::AddAction(_) | Field::Action { .. } => Kind::Button,
            _ => Kind::Choice,
        }
    }

    fn label(&self, field: &Field) -> String {
        match field {
            Field::Id => "ID".into(),
            Field::Label => "Label".into(),
            Field::Description => "Description".into(),
            Field::Category => "Category".into(),
            Field::Scope => "Scope".into(),
            Field::ControlType => "Control".into(),
            Field::DefaultState => "Default state".into(),
            Field::OptionValue(i) => format!("Option {} value", i + 1),
            Field::OptionLabel(i) => format!("Option {} label", i + 1),
            Field::AddOption => "+ add option".into(),
            Field::StateLabel(state) => format!("State \"{state}\""),
            Field::Action { .. } => "▪ action".into(),
            Field::ActionParam { key, .. } | Field::SyncParam(key) => self
                .param_field(field)
                .map_or_else(|| key.clone(), |f| f.label),
            Field::AddAction(_) => "+ add action".into(),
            Field::SyncEnabled => "Sync".into(),
            Field::SyncSource => "Source".into(),
            Field::SyncWhenTrue => "When true".into(),
            Field::SyncWhenFalse => "When false".into(),
            Field::SyncMode => "Mode".into(),
            Field::SyncTrigger => "Run actions on sync".into(),
            Field::HaEnabled => "Expose entity".into(),
            Field::HaSuffix => "Entity suffix".into(),
            Field::HaName => "Name template".into(),
        }
    }

    fn display_value(&self, field: &Field) -> String {
        let Some(editor) = &self.editor else {
            return String::new();
        };
        let draft = editor.draft();
        let option_label = |value: &str| {
            draft
                .control
                .options
                .iter()
                .find(|o| o.value == value)
                .map_or_else(|| value.to_owned(), |o| o.label.clone())
        };
        let sync = draft.sync.as_ref();
        match field {
            Field::Id => draft.id.clone(),
            Field::Label => draft.label.clone(),
            Field::Description => draft.description.clone(),
            Field::Category => draft.category.clone(),
            Field::Scope => draft.scope.to_string(),
            Field::ControlType => draft.control.control_type.to_string(),
            Field::DefaultState => option_label(&draft.default_state),
            Field::OptionValue(i) => draft
                .control
                .options
                .get(*i)
                .map(|o| o.value.clone())
                .unwrap_or_default(),
            Field::OptionLabel(i) => draft
                .control
                .options
                .get(*i)
                .map(|o| o.label.clone())
                .unwrap_or_default(),
            Field::StateLabel(state) => draft
                .states
                .get(state)
                .map(|s| s.label.clone())
                .unwrap_or_default(),
            Field::Action { state, action } => draft
                .states
                .get(state)
                .and_then(|s| s.actions_on_enter.iter().find(|a| a.id == *action))
                .map(|a| {
                    self.action_types
                        .iter()
                        .find(|t| t.id == a.type_id)
                        .map_or_else(|| a.type_id.clone(), |t| t.label.clone())
                })
                .unwrap_or_default(),
            Field::ActionParam { .. } | Field::SyncParam(_) => self
                .param_value(field)
                .map(|v| value_text(&v))
                .unwrap_or_default(),
            Field::AddOption | Field::AddAction(_) => String::new(),
            Field::SyncEnabled => if sync.is_some_and(|s| s.enabled) {
                "on".into()
            } else {
                "off".into()
            },
            Field::SyncSource => sync
                .map(|s| {
                    self.source_types
                        .iter()
                        .find(|t| t.id == s.source.type_id)
                        .map_or_else(|| s.source.type_id.clone(), |t| t.label.clone())
                })
                .unwrap_or_default(),
            Field::SyncWhenTrue => sync
                .map(|s| option_label(&s.mapping.when_true))
                .unwrap_or_default(),
            Field::SyncWhenFalse => sync
                .map(|s| option_label(&s.mapping.when_false))
                .unwrap_or_default(),
            Field::SyncMode => sync.map(|s| s.mode.to_string()).unwrap_or_default(),
            Field::SyncTrigger => yes_no(sync.is_some_and(|s| s.trigger_actions_on_sync)).into(),
            Field::HaEnabled => yes_no(draft.ha_expose.enabled).into(),
            Field::HaSuffix => draft.ha_expose.entity_suffix.clone(),
            Field::HaName => draft.ha_expose.name_template.clone(),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    fn set_text(&mut self, field: &Field, value: &str) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        match field {
            Field::Id => editor.set_id(value),
            Field::Label => editor.set_label(value),
            Field::Description => editor.set_description(value),
            Field::OptionValue(i) => editor.update_option(*i, Some(value), None),
            Field::OptionLabel(i) => editor.update_option(*i, None, Some(value)),
            Field::StateLabel(state) => editor.update_state_label(state, value),
            Field::ActionParam { state, action, key } => {
                editor.set_action_param(state, action, key, Value::String(value.to_owned()));
            }
            Field::SyncParam(key) => editor.set_sync_param(key, Value::String(value.to_owned())),
            Field::HaSuffix => editor.set_ha_entity_suffix(value),
            Field::HaName => editor.set_ha_name_template(value),
            _ => {}
        }
    }

    fn cycle(&mut self, field: &Field, forward: bool) {
        let param = self.param_field(field);
        let current = self.param_value(field);
        let categories = category_options(&self.categories);
        let source_types = Arc::clone(&self.source_types);
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let draft = editor.draft().clone();
        let option_values: Vec<String> = draft
            .control
            .options
            .iter()
            .map(|o| o.value.clone())
            .collect();

        match field {
            Field::Category => {
                if let Some(next) = pick(&categories, &draft.category, forward) {
                    editor.set_category(next);
                }
            }
            Field::Scope => editor.set_scope(match draft.scope {
                CapabilityScope::Device => CapabilityScope::Global,
                CapabilityScope::Global => CapabilityScope::Device,
            }),
            Field::ControlType => editor.set_control_type(match draft.control.control_type {
                ControlType::Switch => ControlType::Select,
                ControlType::Select => ControlType::Switch,
            }),
            Field::DefaultState => {
                if let Some(next) = pick(&option_values, &draft.default_state, forward) {
                    editor.set_default_state(next);
                }
            }
            Field::ActionParam { state, action, key } => {
                if let Some(value) = param
                    .as_ref()
                    .and_then(|p| next_param_value(p, current.as_ref(), forward))
                {
                    editor.set_action_param(state, action, key, value);
                }
            }
            Field::SyncParam(key) => {
                if let Some(value) = param
                    .as_ref()
                    .and_then(|p| next_param_value(p, current.as_ref(), forward))
                {
                    editor.set_sync_param(key, value);
                }
            }
            Field::SyncEnabled => {
                let enabled = draft.sync.as_ref().is_some_and(|s| s.enabled);
                editor.set_sync_enabled(!enabled, &source_types);
            }
            Field::SyncSource => {
                let ids: Vec<String> = source_types.iter().map(|t| t.id.clone()).collect();
                let current = draft.sync.as_ref().map_or("", |s| s.source.type_id.as_str());
                if let Some(next) = pick(&ids, current, forward) {
                    editor.set_sync_source_type(next, &source_types);
                }
            }
            Field::SyncWhenTrue | Field::SyncWhenFalse => {
                let Some(sync) = &draft.sync else {
                    return;
                };
                let (when_true, when_false) = (&sync.mapping.when_true, &sync.mapping.when_false);
                if *field == Field::SyncWhenTrue {
                    if let Some(next) = pick(&option_values, when_true, forward) {
                        editor.set_sync_mapping(next, when_false);
                    }
                } else if let Some(next) = pick(&option_values, when_false, forward) {
                    editor.set_sync_mapping(when_true, next);
                }
            }
            Field::SyncMode => {
                let mode = draft.sync.as_ref().map(|s| s.mode).unwrap_or_default();
                editor.set_sync_mode(match mode {
                    SyncMode::ExternalTruth => SyncMode::InternalTruth,
                    SyncMode::InternalTruth => SyncMode::ExternalTruth,
                });
            }
            Field::SyncTrigger => {
                let trigger = draft.sync.as_ref().is_some_and(|s| s.trigger_actions_on_sync);
                editor.set_trigger_actions_on_sync(!trigger);
            }
            Field::HaEnabled => editor.set_ha_enabled(!draft.ha_expose.enabled),
            _ => {}
        }
    }

    fn press(&mut self, field: &Field) {
        match field {
            Field::AddOption => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.add_select_option();
                }
            }
            Field::AddAction(state) => {
                if self.action_types.is_empty() {
                    self.error = Some("No action types available".into());
                } else {
                    self.picker = Some((state.clone(), 0));
                }
            }
            _ => {}
        }
    }

    fn remove(&mut self, field: &Field) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        match field {
            Field::OptionValue(i) | Field::OptionLabel(i) => {
                if !editor.remove_select_option(*i) {
                    self.error = Some("A select needs at least two options".into());
                }
            }
            Field::Action { state, action } => {
                editor.remove_action(state, action);
            }
            _ => {}
        }
    }

    fn step(&mut self, delta: isize) {
        self.cursor = step_index(self.cursor, delta, self.rows().len());
        self.input = None;
    }

    fn clamp_cursor(&mut self) {
        let len = self.rows().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    fn save(&mut self) -> Option<Action> {
        if self.saving {
            return None;
        }
        let editor = self.editor.as_ref()?;
        if let Err(e) = editor.validate() {
            self.error = Some(e.to_string());
            return None;
        }
        self.error = None;
        self.saving = true;
        Some(Action::SaveCapability(Box::new(editor.clone())))
    }

    fn close(&self) -> Action {
        if self.is_dirty() {
            Action::ShowConfirm(ConfirmAction::DiscardEdits)
        } else {
            Action::CloseEditor
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let Some((state, index)) = self.picker.take() else {
            return;
        };
        let len = self.action_types.len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.picker = Some((state, step_index(index, 1, len)));
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.picker = Some((state, step_index(index, -1, len)));
            }
            KeyCode::Enter => {
                let action_type = self.action_types.get(index).cloned();
                if let (Some(editor), Some(action_type)) = (self.editor.as_mut(), action_type) {
                    editor.add_action(&state, &action_type);
                }
            }
            KeyCode::Esc => {}
            _ => self.picker = Some((state, index)),
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn row_line(&self, field: &Field, active: bool) -> Line<'static> {
        let marker = if active { "▸ " } else { "  " };
        let pad = " ".repeat(field.indent());
        let label = self.label(field);
        let mut line = match self.kind(field) {
            Kind::Text => match &self.input {
                Some((f, input)) if active && f == field => input.line(&label, true),
                _ => TextField::with_value(self.display_value(field)).line(&label, active),
            },
            Kind::Choice => {
                let value = self.display_value(field);
                let label_style = if active {
                    theme::key_hint_key()
                } else {
                    theme::key_hint()
                };
                let value = if active {
                    Span::styled(format!("‹ {value} ›"), theme::table_selected())
                } else {
                    Span::styled(value, Style::default().fg(theme::AMBER))
                };
                Line::from(vec![Span::styled(format!("{label}: "), label_style), value])
            }
            Kind::Button => {
                let style = if active {
                    theme::table_selected()
                } else {
                    Style::default().fg(theme::TEAL)
                };
                let value = self.display_value(field);
                let mut spans = vec![Span::styled(label, style)];
                if !value.is_empty() {
                    spans.push(Span::styled(format!(" {value}"), theme::value()));
                }
                Line::from(spans)
            }
        };
        line.spans.insert(0, Span::styled(format!("{marker}{pad}"), theme::key_hint_key()));
        line
    }

    fn render_form(&self, frame: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        let mut cursor_line = 0;
        let mut section = "";
        for (i, field) in self.rows().iter().enumerate() {
            if field.section() != section {
                section = field.section();
                if !lines.is_empty() {
                    lines.push(Line::default());
                }
                lines.push(Line::from(Span::styled(
                    section,
                    Style::default().fg(theme::TEAL).add_modifier(Modifier::BOLD),
                )));
            }
            if i == self.cursor {
                cursor_line = lines.len();
            }
            lines.push(self.row_line(field, i == self.cursor));
        }

        let height = usize::from(area.height);
        let offset = (cursor_line + 3).saturating_sub(height);
        let offset = u16::try_from(offset).unwrap_or(u16::MAX);
        frame.render_widget(Paragraph::new(lines).scroll((offset, 0)), area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.saving {
            let throbber = Throbber::default()
                .label("Saving…")
                .style(theme::value())
                .throbber_style(Style::default().fg(theme::ACCENT));
            frame.render_stateful_widget(throbber, area, &mut self.throbber_state.clone());
            return;
        }
        let line = if let Some(err) = &self.error {
            Line::from(Span::styled(format!(" {err}"), theme::error()))
        } else if self
            .editor
            .as_ref()
            .is_some_and(|e| has_global_scope_violation(e.draft()))
        {
            Line::from(Span::styled(
                format!(" {GLOBAL_SCOPE_VIOLATION}"),
                Style::default().fg(theme::AMBER),
            ))
        } else if self.is_dirty() {
            Line::from(Span::styled(" unsaved changes", theme::key_hint()))
        } else {
            Line::default()
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_picker(&self, frame: &mut Frame, area: Rect, state: &str, index: usize) {
        let height = u16::try_from(self.action_types.len() + 2)
            .unwrap_or(u16::MAX)
            .min(16);
        let popup = centered_rect(area, 56, height);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .title(format!(" Add action on \"{state}\" "))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::BG_OVERLAY));
        let items: Vec<ListItem> = self
            .action_types
            .iter()
            .map(|t| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!(" {}", t.label), theme::value()),
                    Span::styled(format!("  {}", t.id), theme::key_hint()),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(theme::table_selected());
        let mut list_state = ListState::default().with_selected(Some(index));
        frame.render_stateful_widget(list, popup, &mut list_state);
    }
}

impl Component for EditorScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.editor.is_none() {
            return Ok(matches!(key.code, KeyCode::Esc).then_some(Action::CloseEditor));
        }
        if self.picker.is_some() {
            self.handle_picker_key(key);
            self.clamp_cursor();
            return Ok(None);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => return Ok(self.save()),
            KeyCode::Esc => return Ok(Some(self.close())),
            KeyCode::Tab | KeyCode::Down => {
                self.step(1);
                return Ok(None);
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.step(-1);
                return Ok(None);
            }
            _ => {}
        }
        if self.saving {
            return Ok(None);
        }

        let Some(field) = self.rows().get(self.cursor).cloned() else {
            return Ok(None);
        };
        if ctrl && key.code == KeyCode::Char('d') {
            self.remove(&field);
            self.input = None;
            self.clamp_cursor();
            return Ok(None);
        }

        match self.kind(&field) {
            Kind::Text => {
                if self.input.as_ref().is_none_or(|(f, _)| *f != field) {
                    let value = self.display_value(&field);
                    self.input = Some((field.clone(), TextField::with_value(value)));
                }
                let changed = self.input.as_mut().and_then(|(_, input)| {
                    input.handle_key(key).then(|| input.value().to_owned())
                });
                if let Some(value) = changed {
                    self.set_text(&field, &value);
                }
            }
            Kind::Choice => match key.code {
                KeyCode::Left | KeyCode::Char('h') => self.cycle(&field, false),
                KeyCode::Right | KeyCode::Char('l' | ' ') | KeyCode::Enter => {
                    self.cycle(&field, true);
                }
                _ => {}
            },
            Kind::Button => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                    self.press(&field);
                }
            }
        }
        self.clamp_cursor();
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::EditorLoaded(editor) => return Ok(self.load((**editor).clone())),
            Action::PrimitivesLoaded {
                action_types,
                source_types,
            } => {
                self.action_types = Arc::clone(action_types);
                self.source_types = Arc::clone(source_types);
                self.primitives_loaded = true;
            }
            Action::CapabilitiesLoaded { capabilities, .. } => {
                for category in categories_from_capabilities(capabilities) {
                    if !self.categories.contains(&category) {
                        self.categories.push(category);
                    }
                }
            }
            Action::EditorFailed(message) => {
                self.saving = false;
                self.error = Some(message.clone());
            }
            Action::CapabilitySaved(_) if self.saving => {
                self.clear();
                return Ok(Some(Action::CloseEditor));
            }
            Action::CloseEditor => self.clear(),
            Action::Tick if self.saving => self.throbber_state.calc_next(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = match &self.editor {
            Some(editor) if editor.is_new() => " New capability ".to_owned(),
            Some(editor) => format!(" Edit {} ", editor.draft().id),
            None => " Capability ".to_owned(),
        };
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

        if self.editor.is_none() {
            frame.render_widget(
                Paragraph::new(Span::styled("  Loading capability…", theme::key_hint())),
                layout[0],
            );
            return;
        }

        self.render_form(frame, layout[0]);
        self.render_status(frame, layout[1]);
        let hints = key_hints(&[
            ("Tab/↑↓", "field"),
            ("←/→", "change"),
            ("Enter", "add"),
            ("^D", "remove"),
            ("^S", "save"),
            ("Esc", "close"),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[2]);

        if let Some((state, index)) = &self.picker {
            self.render_picker(frame, area, state, *index);
        }
    }

    fn captures_input(&self) -> bool {
        true
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Editor"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(screen: &mut EditorScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key_event(key(KeyCode::Char(c))).unwrap();
        }
    }

    fn block_action() -> ActionType {
        ActionType {
            id: "routeros.address_list.add".into(),
            label: "Add to address list".into(),
            description: String::new(),
            param_schema: vec![
                ActionParamField {
                    key: "target".into(),
                    label: "Target".into(),
                    kind: FieldKind::Enum,
                    required: true,
                    description: None,
                    options: vec!["device.ip".into(), "static".into()],
                    visible_if: None,
                },
                ActionParamField {
                    key: "list".into(),
                    label: "List".into(),
                    kind: FieldKind::String,
                    required: true,
                    description: None,
                    options: Vec::new(),
                    visible_if: None,
                },
            ],
        }
    }

    fn new_screen() -> EditorScreen {
        let mut screen = EditorScreen::new();
        screen
            .update(&Action::PrimitivesLoaded {
                action_types: Arc::new(vec![block_action()]),
                source_types: Arc::new(Vec::new()),
            })
            .unwrap();
        let follow_up = screen
            .update(&Action::EditorLoaded(Box::new(CapabilityEditor::create())))
            .unwrap();
        assert!(follow_up.is_none());
        screen
    }

    #[test]
    fn typing_writes_through_to_the_draft() {
        let mut screen = new_screen();
        assert_eq!(screen.rows()[0], Field::Id);
        type_text(&mut screen, "vpn");
        screen.handle_key_event(key(KeyCode::Tab)).unwrap();
        type_text(&mut screen, "VPN");

        let draft = screen.editor.as_ref().unwrap().draft();
        assert_eq!(draft.id, "vpn");
        assert_eq!(draft.label, "VPN");
        assert!(screen.is_dirty());
    }

    #[test]
    fn save_validates_before_sending() {
        let mut screen = new_screen();
        assert!(screen.handle_key_event(ctrl('s')).unwrap().is_none());
        assert_eq!(
            screen.error.as_deref(),
            Some("Validation failed: Capability id is required")
        );

        type_text(&mut screen, "vpn");
        screen.handle_key_event(key(KeyCode::Tab)).unwrap();
        type_text(&mut screen, "VPN");
        let action = screen.handle_key_event(ctrl('s')).unwrap();
        assert!(matches!(action, Some(Action::SaveCapability(_))));
        assert!(screen.saving);

        // A second save while the first is in flight is ignored
        assert!(screen.handle_key_event(ctrl('s')).unwrap().is_none());

        screen
            .update(&Action::EditorFailed("id already exists".into()))
            .unwrap();
        assert!(!screen.saving);
        assert_eq!(screen.error.as_deref(), Some("id already exists"));
    }

    #[test]
    fn escape_confirms_only_when_dirty() {
        let mut screen = new_screen();
        assert!(matches!(
            screen.handle_key_event(key(KeyCode::Esc)).unwrap(),
            Some(Action::CloseEditor)
        ));
        type_text(&mut screen, "x");
        assert!(matches!(
            screen.handle_key_event(key(KeyCode::Esc)).unwrap(),
            Some(Action::ShowConfirm(ConfirmAction::DiscardEdits))
        ));
    }

    #[test]
    fn switching_to_select_exposes_option_rows() {
        let mut screen = new_screen();
        let control_row = screen
            .rows()
            .iter()
            .position(|f| *f == Field::ControlType)
            .unwrap();
        screen.cursor = control_row;
        screen.handle_key_event(key(KeyCode::Right)).unwrap();

        let rows = screen.rows();
        assert!(rows.contains(&Field::OptionValue(0)));
        assert!(rows.contains(&Field::AddOption));

        screen.cursor = rows.iter().position(|f| *f == Field::AddOption).unwrap();
        screen.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert_eq!(screen.editor.as_ref().unwrap().draft().control.options.len(), 3);

        // Removing down to the two-option minimum, then refusing
        screen.cursor = screen
            .rows()
            .iter()
            .position(|f| *f == Field::OptionLabel(2))
            .unwrap();
        screen.handle_key_event(ctrl('d')).unwrap();
        screen.cursor = screen
            .rows()
            .iter()
            .position(|f| *f == Field::OptionLabel(1))
            .unwrap();
        screen.handle_key_event(ctrl('d')).unwrap();
        assert_eq!(screen.editor.as_ref().unwrap().draft().control.options.len(), 2);
        assert_eq!(
            screen.error.as_deref(),
            Some("A select needs at least two options")
        );
    }

    #[test]
    fn picker_adds_action_with_param_rows() {
        let mut screen = new_screen();
        let add_row = screen
            .rows()
            .iter()
            .position(|f| *f == Field::AddAction("on".into()))
            .unwrap();
        screen.cursor = add_row;
        screen.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(screen.picker.is_some());
        screen.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(screen.picker.is_none());

        let rows = screen.rows();
        let params: Vec<&Field> = rows
            .iter()
            .filter(|f| matches!(f, Field::ActionParam { .. }))
            .collect();
        assert_eq!(params.len(), 2);

        // Enum params cycle through their options
        let target = rows
            .iter()
            .position(|f| matches!(f, Field::ActionParam { key, .. } if key == "target"))
            .unwrap();
        screen.cursor = target;
        assert_eq!(screen.display_value(&rows[target]), "device.ip");
        screen.handle_key_event(key(KeyCode::Right)).unwrap();
        assert_eq!(screen.display_value(&rows[target]), "static");
    }

    #[test]
    fn pick_starts_over_for_unknown_values() {
        let values = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(pick(&values, "a", true).unwrap(), "b");
        assert_eq!(pick(&values, "a", false).unwrap(), "b");
        assert_eq!(pick(&values, "zzz", true).unwrap(), "a");
        assert!(pick(&[], "a", true).is_none());
    }
}
