//! Global capabilities: one state per capability, shared by the whole
//! network rather than bound to a device.

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

use presence_core::{CapabilityPatch, CapabilityUIModel};

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::theme;
use crate::widgets::{key_hints, next_state, state_label, step_index};

#[derive(Default)]
pub struct GlobalScreen {
    focused: bool,
    capabilities: Option<Arc<Vec<CapabilityUIModel>>>,
    table_state: TableState,
}

impl GlobalScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn selected(&self) -> Option<&CapabilityUIModel> {
        self.capabilities.as_ref()?.get(self.table_state.selected()?)
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.capabilities.as_ref().map_or(0, |c| c.len());
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        self.table_state.select(Some(step_index(current, delta, len)));
    }

    fn change_state(&self, forward: bool) -> Option<Action> {
        let cap = self.selected()?;
        if !cap.enabled {
            return Some(Action::Notify(Notification::warning(format!(
                "{} is disabled",
                cap.label
            ))));
        }
        let next = next_state(&cap.control, &cap.state, forward)?;
        Some(Action::SetGlobalCapability {
            capability_id: cap.id.clone(),
            patch: CapabilityPatch::state(next),
        })
    }
}

impl Component for GlobalScreen {
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
            KeyCode::Char(' ' | 'l') | KeyCode::Right | KeyCode::Enter => self.change_state(true),
            KeyCode::Char('h') | KeyCode::Left => self.change_state(false),
            KeyCode::Char('e') => self.selected().map(|c| Action::OpenEditor(Some(c.id.clone()))),
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
        if let Action::GlobalCapabilitiesUpdated(caps) = action {
            let keep = self.selected().map(|c| c.id.clone());
            self.capabilities = Some(Arc::clone(caps));
            let idx = keep
                .and_then(|id| caps.iter().position(|c| c.id == id))
                .or_else(|| self.table_state.selected())
                .unwrap_or(0);
            self.table_state
                .select((!caps.is_empty()).then(|| idx.min(caps.len() - 1)));
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let count = self.capabilities.as_ref().map_or(0, |c| c.len());
        let block = Block::default()
            .title(format!(" Global capabilities ({count}) "))
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

        match &self.capabilities {
            None => frame.render_widget(
                Paragraph::new(Span::styled("  Loading global capabilities…", theme::key_hint())),
                layout[0],
            ),
            Some(caps) if caps.is_empty() => frame.render_widget(
                Paragraph::new(Span::styled(
                    "  No global capabilities. Create one with scope \"global\".",
                    theme::key_hint(),
                )),
                layout[0],
            ),
            Some(caps) => {
                let header = Row::new(
                    ["Capability", "State", "Options", "Description"]
                        .into_iter()
                        .map(|h| Cell::from(h).style(theme::table_header())),
                );
                let rows: Vec<Row> = caps
                    .iter()
                    .map(|c| {
                        let state_style = if c.enabled {
                            Style::default().fg(theme::AMBER).add_modifier(Modifier::BOLD)
                        } else {
                            theme::key_hint()
                        };
                        let options = c
                            .control
                            .options
                            .iter()
                            .map(|o| o.label.as_str())
                            .collect::<Vec<_>>()
                            .join(" / ");
                        let state = if c.enabled {
                            state_label(&c.control, &c.state).to_owned()
                        } else {
                            format!("{} (disabled)", state_label(&c.control, &c.state))
                        };
                        Row::new(vec![
                            Cell::from(c.label.clone()).style(theme::value()),
                            Cell::from(state).style(state_style),
                            Cell::from(options).style(theme::key_hint()),
                            Cell::from(c.description.clone()),
                        ])
                        .style(theme::table_row())
                    })
                    .collect();
                let widths = [
                    Constraint::Fill(2),
                    Constraint::Length(18),
                    Constraint::Fill(2),
                    Constraint::Fill(3),
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
            ("Space/→", "next state"),
            ("←", "previous"),
            ("e", "edit template"),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[1]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Global"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use presence_core::model::{CapabilityControl, ControlOption, ControlType};

    use super::*;

    fn cap(id: &str, state: &str, enabled: bool) -> CapabilityUIModel {
        CapabilityUIModel {
            id: id.into(),
            label: id.to_uppercase(),
            description: String::new(),
            control: CapabilityControl {
                control_type: ControlType::Switch,
                options: vec![ControlOption::new("on", "On"), ControlOption::new("off", "Off")],
            },
            state: state.into(),
            enabled,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn space_flips_selected_switch() {
        let mut screen = GlobalScreen::new();
        screen
            .update(&Action::GlobalCapabilitiesUpdated(Arc::new(vec![
                cap("vpn", "off", true),
                cap("guest", "on", true),
            ])))
            .unwrap();
        screen.handle_key_event(key(KeyCode::Down)).unwrap();

        match screen.handle_key_event(key(KeyCode::Char(' '))).unwrap() {
            Some(Action::SetGlobalCapability {
                capability_id,
                patch,
            }) => {
                assert_eq!(capability_id, "guest");
                assert_eq!(patch, CapabilityPatch::state("off"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn disabled_capability_only_warns() {
        let mut screen = GlobalScreen::new();
        screen
            .update(&Action::GlobalCapabilitiesUpdated(Arc::new(vec![cap(
                "vpn", "off", false,
            )])))
            .unwrap();
        assert!(matches!(
            screen.handle_key_event(key(KeyCode::Char(' '))).unwrap(),
            Some(Action::Notify(_))
        ));
    }
}
