//! Single-line text input backed by `tui_input`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};
use tui_input::{Input, InputRequest};

use crate::theme;

#[derive(Debug, Clone, Default)]
pub struct TextField {
    input: Input,
}

impl TextField {
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            input: Input::default().with_value(value.into()),
        }
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.input = Input::default().with_value(value.into());
    }

    /// Apply an editing key. Returns true when the value changed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let Some(request) = input_request(key) else {
            return false;
        };
        self.input
            .handle(request)
            .is_some_and(|changed| changed.value)
    }

    /// Render `label: value` with a block cursor when active.
    pub fn render(&self, frame: &mut Frame, area: Rect, label: &str, active: bool) {
        let line = self.line(label, active);
        frame.render_widget(Paragraph::new(line), area);
    }

    pub fn line(&self, label: &str, active: bool) -> Line<'static> {
        let label_style = if active {
            theme::key_hint_key()
        } else {
            theme::key_hint()
        };
        let mut spans = vec![Span::styled(format!("{label}: "), label_style)];
        if active {
            let cursor = self.input.visual_cursor();
            let value = self.input.value();
            let (before, rest) = split_at_char(value, cursor);
            let mut chars = rest.chars();
            let under = chars.next().map_or_else(|| " ".to_owned(), String::from);
            spans.push(Span::styled(before.to_owned(), theme::value()));
            spans.push(Span::styled(under, Style::default().bg(theme::ACCENT).fg(theme::BG_OVERLAY)));
            spans.push(Span::styled(chars.as_str().to_owned(), theme::value()));
        } else {
            spans.push(Span::styled(self.input.value().to_owned(), theme::value()));
        }
        Line::from(spans)
    }
}

fn split_at_char(value: &str, chars: usize) -> (&str, &str) {
    let idx = value
        .char_indices()
        .nth(chars)
        .map_or(value.len(), |(i, _)| i);
    value.split_at(idx)
}

/// Map a crossterm key to a `tui_input` request.
fn input_request(key: KeyEvent) -> Option<InputRequest> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('u') if ctrl => Some(InputRequest::DeleteLine),
        KeyCode::Char('w') if ctrl => Some(InputRequest::DeletePrevWord),
        KeyCode::Char('a') if ctrl => Some(InputRequest::GoToStart),
        KeyCode::Char('e') if ctrl => Some(InputRequest::GoToEnd),
        KeyCode::Char(c) if !ctrl => Some(InputRequest::InsertChar(c)),
        KeyCode::Backspace => Some(InputRequest::DeletePrevChar),
        KeyCode::Delete => Some(InputRequest::DeleteNextChar),
        KeyCode::Left => Some(InputRequest::GoToPrevChar),
        KeyCode::Right => Some(InputRequest::GoToNextChar),
        KeyCode::Home => Some(InputRequest::GoToStart),
        KeyCode::End => Some(InputRequest::GoToEnd),
        _ => None,
    }
}
