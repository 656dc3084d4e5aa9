//! Device drawer: identity, registration form, and per-device
//! capability controls.

use std::sync::Arc;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

use presence_core::format::{format_exact_timestamp, format_last_seen_label};
use presence_core::model::device::primary_interface;
use presence_core::registration::MAX_COMMENT_LEN;
use presence_core::{
    CapabilityPatch, CapabilityUIModel, Device, DeviceType, RegistrationForm, SubmitMode,
};

use crate::action::Action;
use crate::theme;
use crate::widgets::{cycle_index, key_hints, next_state, state_label, text_field::TextField};

const ICONS: [DeviceType; 3] = [DeviceType::Wifi, DeviceType::Wired, DeviceType::Unknown];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Name,
    Icon,
    Comment,
    Capability(usize),
}

pub struct DeviceDetail {
    device: Arc<Device>,
    name: TextField,
    icon: DeviceType,
    comment: TextField,
    focus: Focus,
    capabilities: Option<Arc<Vec<CapabilityUIModel>>>,
    error: Option<String>,
    /// Local edits not yet submitted; incoming refreshes leave the form alone.
    dirty: bool,
}

impl DeviceDetail {
    pub fn new(device: Arc<Device>) -> Self {
        let form = RegistrationForm::from_device(&device);
        Self {
            name: TextField::with_value(form.name),
            icon: form.icon,
            comment: TextField::with_value(form.comment),
            device,
            focus: Focus::Name,
            capabilities: None,
            error: None,
            dirty: false,
        }
    }

    pub fn mac(&self) -> &str {
        &self.device.mac
    }

    pub fn set_device(&mut self, device: Arc<Device>) {
        if device.mac != self.device.mac {
            return;
        }
        if !self.dirty {
            let form = RegistrationForm::from_device(&device);
            self.name.set_value(form.name);
            self.icon = form.icon;
            self.comment.set_value(form.comment);
        }
        self.device = device;
    }

    pub fn set_capabilities(&mut self, mac: &str, capabilities: Arc<Vec<CapabilityUIModel>>) {
        if mac != self.device.mac {
            return;
        }
        if let Focus::Capability(i) = self.focus {
            if i >= capabilities.len() {
                self.focus = Focus::Comment;
            }
        }
        self.capabilities = Some(capabilities);
    }

    fn form(&self) -> RegistrationForm {
        RegistrationForm {
            name: self.name.value().to_owned(),
            icon: self.icon,
            comment: self.comment.value().to_owned(),
        }
    }

    fn capability_count(&self) -> usize {
        self.capabilities.as_ref().map_or(0, |c| c.len())
    }

    fn focus_step(&mut self, forward: bool) {
        let caps = self.capability_count();
        let order: Vec<Focus> = [Focus::Name, Focus::Icon, Focus::Comment]
            .into_iter()
            .chain((0..caps).map(Focus::Capability))
            .collect();
        let idx = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[cycle_index(idx, forward, order.len())];
    }

    fn submit(&mut self) -> Option<Action> {
        match self.form().to_input() {
            Ok(input) => {
                self.error = None;
                self.dirty = false;
                Some(Action::SubmitDevice {
                    mac: self.device.mac.clone(),
                    input,
                    mode: SubmitMode::for_device(&self.device),
                })
            }
            Err(e) => {
                self.error = Some(e.to_string());
                None
            }
        }
    }

    /// Next (or previous) control value for the focused capability.
    fn cycle_state(&mut self, index: usize, forward: bool) -> Option<Action> {
        let cap = self.capabilities.as_ref()?.get(index)?;
        if !cap.enabled {
            self.error = Some(format!("{} is disabled for this device", cap.label));
            return None;
        }
        let next = next_state(&cap.control, &cap.state, forward)?;
        self.error = None;
        Some(Action::SetDeviceCapability {
            mac: self.device.mac.clone(),
            capability_id: cap.id.clone(),
            patch: CapabilityPatch::state(next),
        })
    }

    /// Keys while the drawer is open. Esc is handled by the owning screen.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.focus_step(true);
                return None;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_step(false);
                return None;
            }
            KeyCode::Enter => return self.submit(),
            _ => {}
        }

        match self.focus {
            Focus::Name => {
                if self.name.handle_key(key) {
                    self.dirty = true;
                }
                None
            }
            Focus::Comment => {
                if self.comment.handle_key(key) {
                    self.dirty = true;
                }
                None
            }
            Focus::Icon => {
                let forward = match key.code {
                    KeyCode::Right | KeyCode::Char(' ' | 'l') => true,
                    KeyCode::Left | KeyCode::Char('h') => false,
                    _ => return None,
                };
                let idx = ICONS.iter().position(|i| *i == self.icon).unwrap_or(2);
                self.icon = ICONS[cycle_index(idx, forward, ICONS.len())];
                self.dirty = true;
                None
            }
            Focus::Capability(i) => match key.code {
                KeyCode::Right | KeyCode::Char(' ' | 'l') => self.cycle_state(i, true),
                KeyCode::Left | KeyCode::Char('h') => self.cycle_state(i, false),
                _ => None,
            },
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let device = &self.device;
        let title = if device.name.is_empty() {
            device.mac.clone()
        } else {
            device.name.clone()
        };
        let block = Block::default()
            .title(format!(" {title} "))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let caps_height = u16::try_from(self.capability_count().max(1))
            .unwrap_or(u16::MAX)
            .saturating_add(2);
        let layout = Layout::vertical([
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Min(caps_height.min(12)),
            Constraint::Length(1),
        ])
        .split(inner);

        self.render_meta(frame, layout[0]);
        self.render_form(frame, layout[1]);
        self.render_capabilities(frame, layout[2]);

        let mode = SubmitMode::for_device(device);
        let hints = key_hints(&[
            ("Tab", "next"),
            ("Enter", mode.label()),
            ("Space", "toggle"),
            ("Esc", "close"),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[3]);
    }

    fn render_meta(&self, frame: &mut Frame, area: Rect) {
        let d = &self.device;
        let now = Utc::now();
        let field = |label: &str, value: String, style: Style| {
            Line::from(vec![
                Span::styled(format!("  {label:<14}"), theme::key_hint()),
                Span::styled(value, style),
            ])
        };
        let lines = vec![
            field("MAC", d.mac.clone(), theme::value()),
            field("Vendor", d.vendor.clone(), theme::value()),
            field(
                "IP",
                d.last_ip.clone().unwrap_or_else(|| "-".into()),
                theme::value(),
            ),
            field(
                "Interface",
                primary_interface(d).unwrap_or_else(|| "-".into()),
                theme::value(),
            ),
            field(
                "Presence",
                format_last_seen_label(d.online, d.last_seen_at, now),
                theme::online(d.online),
            ),
            field("Last seen", format_exact_timestamp(d.last_seen_at), theme::value()),
            field("First seen", format_exact_timestamp(d.first_seen_at), theme::value()),
            field(
                "Sources",
                if d.last_sources.is_empty() {
                    "-".into()
                } else {
                    d.last_sources.join(", ")
                },
                theme::value(),
            ),
            field(
                "Status",
                d.status.to_string(),
                theme::status(d.is_registered()),
            ),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_form(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

        let header = Line::from(Span::styled(
            "  Registration",
            Style::default().fg(theme::TEAL).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(header), rows[0]);

        self.name
            .render(frame, indent(rows[1]), "Name", self.focus == Focus::Name);

        let icon_style = if self.focus == Focus::Icon {
            theme::key_hint_key()
        } else {
            theme::key_hint()
        };
        let icon = Line::from(vec![
            Span::styled("Icon: ", icon_style),
            Span::styled(format!("‹ {} ›", self.icon), theme::value()),
        ]);
        frame.render_widget(Paragraph::new(icon), indent(rows[2]));

        let comment_label = format!(
            "Comment ({}/{MAX_COMMENT_LEN})",
            self.comment.value().chars().count()
        );
        self.comment.render(
            frame,
            indent(rows[3]),
            &comment_label,
            self.focus == Focus::Comment,
        );

        if let Some(err) = &self.error {
            frame.render_widget(
                Paragraph::new(Span::styled(format!("  {err}"), theme::error()))
                    .wrap(Wrap { trim: true }),
                rows[4],
            );
        }
    }

    fn render_capabilities(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from(Span::styled(
            "  Controls",
            Style::default().fg(theme::TEAL).add_modifier(Modifier::BOLD),
        ))];

        match &self.capabilities {
            None => lines.push(Line::from(Span::styled("  loading…", theme::key_hint()))),
            Some(caps) if caps.is_empty() => lines.push(Line::from(Span::styled(
                "  No controls available for this device.",
                theme::key_hint(),
            ))),
            Some(caps) => {
                for (i, cap) in caps.iter().enumerate() {
                    let active = self.focus == Focus::Capability(i);
                    let marker = if active { "▸ " } else { "  " };
                    let state_label = state_label(&cap.control, &cap.state);
                    let state_style = if !cap.enabled {
                        theme::key_hint()
                    } else if active {
                        theme::table_selected()
                    } else {
                        Style::default().fg(theme::AMBER)
                    };
                    let mut spans = vec![
                        Span::styled(format!("  {marker}"), theme::key_hint_key()),
                        Span::styled(format!("{:<24}", cap.label), theme::value()),
                        Span::styled(format!("[{state_label}]"), state_style),
                    ];
                    if !cap.enabled {
                        spans.push(Span::styled("  disabled", theme::key_hint()));
                    }
                    lines.push(Line::from(spans));
                }
            }
        }
        frame.render_widget(Paragraph::new(lines), area);
    }
}

fn indent(area: Rect) -> Rect {
    Rect {
        x: area.x + 2,
        width: area.width.saturating_sub(2),
        ..area
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use presence_core::model::{CapabilityControl, ControlOption, ControlType};
    use presence_core::DeviceStatus;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn device(status: DeviceStatus) -> Arc<Device> {
        Arc::new(Device {
            mac: "AA:BB:CC:DD:EE:FF".into(),
            name: "Phone".into(),
            vendor: "Apple".into(),
            icon: Some("wifi".into()),
            comment: None,
            status,
            online: true,
            last_seen_at: None,
            connected_since_at: None,
            last_ip: Some("192.168.88.10".into()),
            last_subnet: None,
            last_sources: vec!["wifi".into()],
            raw_sources: None,
            created_at: None,
            updated_at: Utc::now(),
            first_seen_at: None,
        })
    }

    fn select_cap(enabled: bool) -> CapabilityUIModel {
        CapabilityUIModel {
            id: "internet".into(),
            label: "Internet".into(),
            description: String::new(),
            control: CapabilityControl {
                control_type: ControlType::Select,
                options: vec![
                    ControlOption::new("allow", "Allow"),
                    ControlOption::new("deny", "Deny"),
                    ControlOption::new("limit", "Limit"),
                ],
            },
            state: "allow".into(),
            enabled,
        }
    }

    #[test]
    fn enter_submits_with_mode_for_status() {
        let mut detail = DeviceDetail::new(device(DeviceStatus::New));
        match detail.handle_key(key(KeyCode::Enter)) {
            Some(Action::SubmitDevice { mac, input, mode }) => {
                assert_eq!(mac, "AA:BB:CC:DD:EE:FF");
                assert_eq!(input.name.as_deref(), Some("Phone"));
                assert_eq!(input.icon.as_deref(), Some("wifi"));
                assert_eq!(mode, SubmitMode::Register);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn blank_name_reports_validation_error() {
        let mut detail = DeviceDetail::new(device(DeviceStatus::Registered));
        detail.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(detail.handle_key(key(KeyCode::Enter)).is_none());
        assert_eq!(detail.error.as_deref(), Some("Validation failed: Display name is required"));
    }

    #[test]
    fn refresh_does_not_clobber_local_edits() {
        let mut detail = DeviceDetail::new(device(DeviceStatus::Registered));
        detail.handle_key(key(KeyCode::Char('!')));
        let mut updated = (*device(DeviceStatus::Registered)).clone();
        updated.name = "Renamed elsewhere".into();
        detail.set_device(Arc::new(updated));
        assert_eq!(detail.name.value(), "Phone!");
    }

    #[test]
    fn select_cycles_and_disabled_blocks() {
        let mut detail = DeviceDetail::new(device(DeviceStatus::Registered));
        detail.set_capabilities("AA:BB:CC:DD:EE:FF", Arc::new(vec![select_cap(true)]));
        detail.focus = Focus::Capability(0);

        match detail.handle_key(key(KeyCode::Left)) {
            Some(Action::SetDeviceCapability { patch, .. }) => {
                assert_eq!(patch, CapabilityPatch::state("limit"));
            }
            other => panic!("unexpected {other:?}"),
        }

        detail.set_capabilities("AA:BB:CC:DD:EE:FF", Arc::new(vec![select_cap(false)]));
        assert!(detail.handle_key(key(KeyCode::Char(' '))).is_none());
        assert!(detail.error.is_some());
    }
}
