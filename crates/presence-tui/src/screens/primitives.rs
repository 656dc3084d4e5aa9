//! Primitives screen: the action and state-source catalogues exposed by
//! the add-on, with the parameter schema of the selected entry.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use tokio::sync::mpsc::UnboundedSender;

use presence_core::model::ActionParamField;
use presence_core::{ActionType, StateSourceType};

use crate::action::{Action, Resource};
use crate::component::Component;
use crate::theme;
use crate::widgets::{key_hints, step_index, sub_tabs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Tab {
    #[default]
    Actions,
    Sources,
}

impl Tab {
    fn index(self) -> usize {
        match self {
            Self::Actions => 0,
            Self::Sources => 1,
        }
    }

    fn toggle(self) -> Self {
        match self {
            Self::Actions => Self::Sources,
            Self::Sources => Self::Actions,
        }
    }
}

/// The fields both catalogues share.
struct Entry<'a> {
    id: &'a str,
    label: &'a str,
    description: &'a str,
    output_type: Option<&'a str>,
    schema: &'a [ActionParamField],
}

#[derive(Default)]
pub struct PrimitivesScreen {
    focused: bool,
    action_tx: Option<UnboundedSender<Action>>,
    tab: Tab,
    action_types: Option<Arc<Vec<ActionType>>>,
    source_types: Option<Arc<Vec<StateSourceType>>>,
    list_state: ListState,
    requested: bool,
}

impl PrimitivesScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Vec<Entry<'_>> {
        match self.tab {
            Tab::Actions => self
                .action_types
                .iter()
                .flat_map(|types| types.iter())
                .map(|t| Entry {
                    id: &t.id,
                    label: &t.label,
                    description: &t.description,
                    output_type: None,
                    schema: &t.param_schema,
                })
                .collect(),
            Tab::Sources => self
                .source_types
                .iter()
                .flat_map(|types| types.iter())
                .map(|t| Entry {
                    id: &t.id,
                    label: &t.label,
                    description: &t.description,
                    output_type: Some(&t.output_type),
                    schema: &t.param_schema,
                })
                .collect(),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.entries().len();
        if len == 0 {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(step_index(current, delta, len)));
    }

    fn switch_tab(&mut self) {
        self.tab = self.tab.toggle();
        let len = self.entries().len();
        self.list_state.select((len > 0).then_some(0));
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, entry: &Entry<'_>) {
        let mut lines = vec![
            Line::from(Span::styled(
                entry.label.to_owned(),
                Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(entry.id.to_owned(), theme::key_hint())),
        ];
        if !entry.description.is_empty() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                entry.description.to_owned(),
                theme::value(),
            )));
        }
        if let Some(output) = entry.output_type {
            lines.push(Line::from(vec![
                Span::styled("Output: ", theme::key_hint()),
                Span::styled(output.to_owned(), Style::default().fg(theme::TEAL)),
            ]));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Parameters",
            Style::default().fg(theme::TEAL).add_modifier(Modifier::BOLD),
        )));
        if entry.schema.is_empty() {
            lines.push(Line::from(Span::styled("  none", theme::key_hint())));
        }
        for field in entry.schema {
            let mut spans = vec![
                Span::styled(format!("  {}", field.key), theme::key_hint_key()),
                Span::styled(format!("  {}", field.kind), Style::default().fg(theme::MAGENTA)),
            ];
            if field.required {
                spans.push(Span::styled("  required", Style::default().fg(theme::AMBER)));
            }
            lines.push(Line::from(spans));
            lines.push(Line::from(Span::styled(
                format!("    {}", field.label),
                theme::value(),
            )));
            if !field.options.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("    one of: {}", field.options.join(", ")),
                    theme::key_hint(),
                )));
            }
            if let Some(cond) = &field.visible_if {
                lines.push(Line::from(Span::styled(
                    format!("    shown when {} = {}", cond.key, cond.equals),
                    theme::key_hint(),
                )));
            }
            if let Some(desc) = &field.description {
                lines.push(Line::from(Span::styled(format!("    {desc}"), theme::key_hint())));
            }
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }
}

impl Component for PrimitivesScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('h' | 'l') | KeyCode::Left | KeyCode::Right => self.switch_tab(),
            _ => {}
        }
        Ok(None)
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
        match action {
            Action::PrimitivesLoaded {
                action_types,
                source_types,
            } => {
                self.action_types = Some(Arc::clone(action_types));
                self.source_types = Some(Arc::clone(source_types));
                let len = self.entries().len();
                let idx = self.list_state.selected().unwrap_or(0);
                self.list_state.select((len > 0).then(|| idx.min(len - 1)));
            }
            Action::Refresh if self.requested => return Ok(Some(Action::Load(Resource::Primitives))),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Primitives ")
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

        let action_count = self.action_types.as_ref().map_or(0, |t| t.len());
        let source_count = self.source_types.as_ref().map_or(0, |t| t.len());
        let labels = [
            format!("Actions ({action_count})"),
            format!("State sources ({source_count})"),
        ];
        frame.render_widget(
            Paragraph::new(sub_tabs::render_sub_tabs(&labels, self.tab.index())),
            layout[0],
        );

        let entries = self.entries();
        if self.action_types.is_none() {
            frame.render_widget(
                Paragraph::new(Span::styled("  Loading primitives…", theme::key_hint())),
                layout[1],
            );
        } else if entries.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  Nothing registered.", theme::key_hint())),
                layout[1],
            );
        } else {
            let cols = Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(layout[1]);
            let items: Vec<ListItem> = entries
                .iter()
                .map(|e| {
                    ListItem::new(Line::from(vec![
                        Span::styled(format!(" {}", e.label), theme::value()),
                        Span::styled(format!("  {}", e.id), theme::key_hint()),
                    ]))
                })
                .collect();
            let list = List::new(items).highlight_style(theme::table_selected());
            let mut state = self.list_state;
            frame.render_stateful_widget(list, cols[0], &mut state);

            if let Some(entry) = self.list_state.selected().and_then(|i| entries.get(i)) {
                let detail = Block::default()
                    .borders(Borders::LEFT)
                    .border_style(theme::border_default());
                let detail_area = detail.inner(cols[1]);
                frame.render_widget(detail, cols[1]);
                self.render_detail(frame, detail_area, entry);
            }
        }

        let hints = key_hints(&[("j/k", "move"), ("←/→", "actions / sources")]);
        frame.render_widget(Paragraph::new(hints), layout[2]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if focused && !self.requested {
            self.requested = true;
            if let Some(tx) = &self.action_tx {
                let _ = tx.send(Action::Load(Resource::Primitives));
            }
        }
    }

    fn id(&self) -> &str {
        "Primitives"
    }
}
