//! Capabilities screen: template catalogue with search, category tabs,
//! and entry points into the editor and assignments.

use std::sync::Arc;
use std::time::Instant;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
};
use tokio::sync::mpsc::UnboundedSender;

use presence_core::editor::{categories_from_capabilities, count_actions};
use presence_core::model::CapabilityScope;
use presence_core::{CapabilityListParams, CapabilityTemplate};

use crate::action::{Action, Resource};
use crate::component::Component;
use crate::debounce::Debounce;
use crate::theme;
use crate::widgets::{cycle_index, key_hints, step_index, sub_tabs, truncate};

pub struct CapabilitiesScreen {
    focused: bool,
    action_tx: Option<UnboundedSender<Action>>,
    params: CapabilityListParams,
    capabilities: Arc<Vec<CapabilityTemplate>>,
    /// Categories seen in unfiltered loads; a filtered result would hide
    /// the other tabs.
    categories: Vec<String>,
    table_state: TableState,
    search: Debounce<String>,
    loading: bool,
    loaded: bool,
}

impl CapabilitiesScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            action_tx: None,
            params: CapabilityListParams::default(),
            capabilities: Arc::new(Vec::new()),
            categories: Vec::new(),
            table_state: TableState::default(),
            search: Debounce::default(),
            loading: false,
            loaded: false,
        }
    }

    fn load(&mut self) -> Option<Action> {
        self.loading = true;
        Some(Action::Load(Resource::Capabilities(self.params.clone())))
    }

    fn selected(&self) -> Option<&CapabilityTemplate> {
        self.capabilities.get(self.table_state.selected()?)
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.capabilities.len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        self.table_state.select(Some(step_index(current, delta, len)));
    }

    /// Tabs are "All" followed by the known categories.
    fn category_index(&self) -> usize {
        self.categories
            .iter()
            .position(|c| *c == self.params.category)
            .map_or(0, |i| i + 1)
    }

    fn cycle_category(&mut self, forward: bool) -> Option<Action> {
        let next = cycle_index(self.category_index(), forward, self.categories.len() + 1);
        self.params.category = if next == 0 {
            String::new()
        } else {
            self.categories[next - 1].clone()
        };
        self.load()
    }

    fn set_search(&mut self, query: String) -> Option<Action> {
        if self.params.search == query {
            return None;
        }
        self.params.search = query;
        self.load()
    }

    fn apply_loaded(&mut self, params: &CapabilityListParams, capabilities: &Arc<Vec<CapabilityTemplate>>) {
        if *params != self.params {
            return;
        }
        self.loading = false;
        self.loaded = true;
        let keep = self.selected().map(|c| c.id.clone());
        self.capabilities = Arc::clone(capabilities);

        let found = categories_from_capabilities(capabilities);
        if params.search.trim().is_empty() && params.category.trim().is_empty() {
            self.categories = found;
        } else {
            for category in found {
                if !self.categories.contains(&category) {
                    self.categories.push(category);
                }
            }
        }

        let len = self.capabilities.len();
        let idx = keep
            .and_then(|id| self.capabilities.iter().position(|c| c.id == id))
            .unwrap_or_else(|| self.table_state.selected().unwrap_or(0));
        self.table_state
            .select((len > 0).then(|| idx.min(len - 1)));
    }
}

impl Component for CapabilitiesScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let action = match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_selection(1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_selection(-1);
                None
            }
            KeyCode::Char('d') if ctrl => {
                self.move_selection(10);
                None
            }
            KeyCode::Char('u') if ctrl => {
                self.move_selection(-10);
                None
            }
            KeyCode::Char('g') => {
                self.table_state.select(Some(0));
                None
            }
            KeyCode::Char('G') => {
                self.table_state
                    .select(Some(self.capabilities.len().saturating_sub(1)));
                None
            }
            KeyCode::Char('h') | KeyCode::Left => self.cycle_category(false),
            KeyCode::Char('l') | KeyCode::Right => self.cycle_category(true),
            KeyCode::Char('n') => Some(Action::OpenEditor(None)),
            KeyCode::Enter | KeyCode::Char('e') => {
                self.selected().map(|c| Action::OpenEditor(Some(c.id.clone())))
            }
            KeyCode::Char('y') => self
                .selected()
                .map(|c| Action::DuplicateCapability(Box::new(c.clone()))),
            KeyCode::Char('d') => self.selected().map(|c| Action::RequestDeleteCapability {
                id: c.id.clone(),
                label: c.label.clone(),
            }),
            KeyCode::Char('a') => self.selected().map(|c| Action::OpenAssignments {
                id: c.id.clone(),
                label: c.label.clone(),
                control: c.control.clone(),
            }),
            _ => None,
        };
        Ok(action)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.move_selection(1),
            MouseEventKind::ScrollUp => self.move_selection(-1),
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        let follow_up = match action {
            Action::CapabilitiesLoaded {
                params,
                capabilities,
            } => {
                self.apply_loaded(params, capabilities);
                None
            }
            Action::DataError(_) => {
                self.loading = false;
                None
            }
            Action::Refresh | Action::CapabilitySaved(_) | Action::CapabilityDeleted(_) => {
                if self.loaded || self.focused {
                    self.load()
                } else {
                    None
                }
            }
            Action::SearchInput(query) => {
                self.search.push(query.clone(), Instant::now());
                None
            }
            Action::SearchSubmit => self.search.flush().and_then(|q| self.set_search(q)),
            Action::CloseSearch => {
                self.search.cancel();
                self.set_search(String::new())
            }
            Action::Tick => self
                .search
                .poll(Instant::now())
                .and_then(|q| self.set_search(q)),
            _ => None,
        };
        Ok(follow_up)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = if self.params.search.is_empty() {
            format!(" Capabilities ({}) ", self.capabilities.len())
        } else {
            format!(
                " Capabilities ({}) [\"{}\"] ",
                self.capabilities.len(),
                self.params.search
            )
        };
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

        let mut labels = vec!["All".to_owned()];
        labels.extend(self.categories.iter().cloned());
        frame.render_widget(
            Paragraph::new(sub_tabs::render_sub_tabs(&labels, self.category_index())),
            layout[0],
        );

        if self.capabilities.is_empty() {
            let msg = if self.loading || !self.loaded {
                "  Loading capabilities…"
            } else {
                "  No capabilities. Press n to create one."
            };
            frame.render_widget(Paragraph::new(Span::styled(msg, theme::key_hint())), layout[1]);
        } else {
            let header = Row::new(
                ["Label", "ID", "Category", "Scope", "Control", "States", "Actions", "Sync", "HA"]
                    .into_iter()
                    .map(|h| Cell::from(h).style(theme::table_header())),
            );
            let rows: Vec<Row> = self
                .capabilities
                .iter()
                .map(|c| {
                    let scope_style = match c.scope {
                        CapabilityScope::Global => Style::default().fg(theme::MAGENTA),
                        CapabilityScope::Device => theme::value(),
                    };
                    let sync = match &c.sync {
                        Some(s) if s.enabled => s.source.type_id.clone(),
                        _ => "─".into(),
                    };
                    Row::new(vec![
                        Cell::from(c.label.clone()).style(
                            Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD),
                        ),
                        Cell::from(truncate(&c.id, 28)).style(theme::key_hint()),
                        Cell::from(if c.category.is_empty() {
                            "-".to_owned()
                        } else {
                            c.category.clone()
                        }),
                        Cell::from(c.scope.to_string()).style(scope_style),
                        Cell::from(c.control.control_type.to_string()),
                        Cell::from(c.states.len().to_string()),
                        Cell::from(count_actions(c).to_string()),
                        Cell::from(sync).style(Style::default().fg(theme::TEAL)),
                        Cell::from(if c.ha_expose.enabled { "on" } else { "off" })
                            .style(theme::online(c.ha_expose.enabled)),
                    ])
                    .style(theme::table_row())
                })
                .collect();
            let widths = [
                Constraint::Fill(2),
                Constraint::Fill(2),
                Constraint::Length(12),
                Constraint::Length(7),
                Constraint::Length(7),
                Constraint::Length(6),
                Constraint::Length(7),
                Constraint::Length(14),
                Constraint::Length(4),
            ];
            let table = Table::new(rows, widths)
                .header(header)
                .row_highlight_style(theme::table_selected());
            let mut state = self.table_state;
            frame.render_stateful_widget(table, layout[1], &mut state);
        }

        let hints = key_hints(&[
            ("j/k", "move"),
            ("←/→", "category"),
            ("Enter", "edit"),
            ("n", "new"),
            ("y", "duplicate"),
            ("d", "delete"),
            ("a", "assignments"),
            ("/", "search"),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[2]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if focused && !self.loaded && !self.loading {
            if let Some(action) = self.load() {
                if let Some(tx) = &self.action_tx {
                    let _ = tx.send(action);
                }
            }
        }
    }

    fn id(&self) -> &str {
        "Capabilities"
    }
}
