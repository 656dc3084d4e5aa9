//! Per-device assignments of one capability: enable it for a device and
//! drive that device's state.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
};

use presence_core::model::CapabilityControl;
use presence_core::{CapabilityDeviceAssignment, CapabilityPatch, CapabilityTemplate};

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::theme;
use crate::widgets::{key_hints, next_state, state_label, step_index};

#[derive(Default)]
pub struct AssignmentsScreen {
    focused: bool,
    capability_id: Option<String>,
    label: String,
    control: Option<CapabilityControl>,
    assignments: Option<Arc<Vec<CapabilityDeviceAssignment>>>,
    table_state: TableState,
}

impl AssignmentsScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&mut self, id: &str, label: &str, control: &CapabilityControl) {
        if self.capability_id.as_deref() != Some(id) {
            self.assignments = None;
            self.table_state.select(None);
        }
        self.capability_id = Some(id.to_owned());
        label.clone_into(&mut self.label);
        self.control = Some(control.clone());
    }

    /// Keep the control current after the template is edited.
    fn learn_control(&mut self, template: &CapabilityTemplate) {
        if self.capability_id.as_deref() == Some(template.id.as_str()) {
            self.control = Some(template.control.clone());
        }
    }

    fn selected(&self) -> Option<&CapabilityDeviceAssignment> {
        self.assignments.as_ref()?.get(self.table_state.selected()?)
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.assignments.as_ref().map_or(0, |a| a.len());
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        self.table_state.select(Some(step_index(current, delta, len)));
    }

    fn patch(&self, patch: CapabilityPatch) -> Option<Action> {
        let assignment = self.selected()?;
        Some(Action::SetAssignment {
            capability_id: self.capability_id.clone()?,
            device_id: assignment.device_id.clone(),
            patch,
        })
    }

    fn toggle_enabled(&self) -> Option<Action> {
        let enabled = self.selected()?.enabled;
        self.patch(CapabilityPatch::enabled(!enabled))
    }

    fn change_state(&self, forward: bool) -> Option<Action> {
        let assignment = self.selected()?;
        if !assignment.enabled {
            return Some(Action::Notify(Notification::warning(format!(
                "Enable {} for {} first",
                self.label, assignment.device_name
            ))));
        }
        let control = self.control.as_ref()?;
        let next = next_state(control, &assignment.state, forward)?;
        self.patch(CapabilityPatch::state(next))
    }

    fn display_state<'a>(&'a self, state: &'a str) -> &'a str {
        self.control
            .as_ref()
            .map_or(state, |control| state_label(control, state))
    }
}

impl Component for AssignmentsScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_selection(1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_selection(-1);
                None
            }
            KeyCode::Char(' ' | 'l') | KeyCode::Right => self.change_state(true),
            KeyCode::Char('h') | KeyCode::Left => self.change_state(false),
            KeyCode::Char('e') | KeyCode::Enter => self.toggle_enabled(),
            KeyCode::Char('E') => self.capability_id.clone().map(|id| Action::OpenEditor(Some(id))),
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
        match action {
            Action::OpenAssignments { id, label, control } => self.open(id, label, control),
            Action::CapabilitySaved(template) => self.learn_control(template),
            Action::AssignmentsUpdated {
                capability_id,
                assignments,
            } if self.capability_id.as_ref() == Some(capability_id) => {
                let keep = self.selected().map(|a| a.device_id.clone());
                self.assignments = Some(Arc::clone(assignments));
                let idx = keep
                    .and_then(|id| assignments.iter().position(|a| a.device_id == id))
                    .or_else(|| self.table_state.selected())
                    .unwrap_or(0);
                self.table_state
                    .select((!assignments.is_empty()).then(|| idx.min(assignments.len() - 1)));
            }
            Action::CapabilityDeleted(id) if self.capability_id.as_ref() == Some(id) => {
                self.assignments = Some(Arc::new(Vec::new()));
                if self.focused {
                    return Ok(Some(Action::GoBack));
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = match &self.assignments {
            Some(list) => format!(" {} · assignments ({}) ", self.label, list.len()),
            None => format!(" {} · assignments ", self.label),
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

        let layout = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);

        match &self.assignments {
            None => frame.render_widget(
                Paragraph::new(Span::styled("  Loading assignments…", theme::key_hint())),
                layout[0],
            ),
            Some(list) if list.is_empty() => frame.render_widget(
                Paragraph::new(Span::styled(
                    "  No registered devices to assign.",
                    theme::key_hint(),
                )),
                layout[0],
            ),
            Some(list) => {
                let header = Row::new(
                    ["Device", "IP", "Presence", "Enabled", "State"]
                        .into_iter()
                        .map(|h| Cell::from(h).style(theme::table_header())),
                );
                let rows: Vec<Row> = list
                    .iter()
                    .map(|a| {
                        let state_style = if a.enabled {
                            Style::default().fg(theme::AMBER).add_modifier(Modifier::BOLD)
                        } else {
                            theme::key_hint()
                        };
                        Row::new(vec![
                            Cell::from(a.device_name.clone()).style(theme::value()),
                            Cell::from(a.device_ip.clone().unwrap_or_else(|| "─".into())),
                            Cell::from(if a.online { "● online" } else { "○ offline" })
                                .style(theme::online(a.online)),
                            Cell::from(if a.enabled { "yes" } else { "no" })
                                .style(theme::online(a.enabled)),
                            Cell::from(self.display_state(&a.state).to_owned()).style(state_style),
                        ])
                        .style(theme::table_row())
                    })
                    .collect();
                let widths = [
                    Constraint::Fill(2),
                    Constraint::Length(16),
                    Constraint::Length(10),
                    Constraint::Length(8),
                    Constraint::Fill(1),
                ];
                let table = Table::new(rows, widths)
                    .header(header)
                    .row_highlight_style(theme::table_selected());
                let mut state = self.table_state;
                frame.render_stateful_widget(table, layout[0], &mut state);
            }
        }

        let hints = key_hints(&[
            ("j/k", "move"),
            ("e", "enable/disable"),
            ("Space/←→", "state"),
            ("E", "edit template"),
            ("Esc", "back"),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[1]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Assignments"
    }
}
