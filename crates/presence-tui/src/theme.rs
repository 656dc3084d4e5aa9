//! Palette and semantic styles for the dashboard.

use ratatui::style::{Color, Modifier, Style};

// ── Palette ───────────────────────────────────────────────────────────

pub const ACCENT: Color = Color::Rgb(97, 175, 239); // #61afef
pub const TEAL: Color = Color::Rgb(86, 182, 194); // #56b6c2
pub const AMBER: Color = Color::Rgb(229, 192, 123); // #e5c07b
pub const MAGENTA: Color = Color::Rgb(198, 120, 221); // #c678dd
pub const ONLINE_GREEN: Color = Color::Rgb(152, 195, 121); // #98c379
pub const ERROR_RED: Color = Color::Rgb(224, 108, 117); // #e06c75

pub const TEXT: Color = Color::Rgb(200, 204, 212); // #c8ccd4
pub const MUTED: Color = Color::Rgb(92, 99, 112); // #5c6370
pub const BG_SELECTED: Color = Color::Rgb(44, 49, 60); // #2c313c
pub const BG_OVERLAY: Color = Color::Rgb(33, 37, 43); // #21252b

// ── Semantic styles ───────────────────────────────────────────────────

pub fn title_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn border_focused() -> Style {
    Style::default().fg(ACCENT)
}

pub fn border_default() -> Style {
    Style::default().fg(MUTED)
}

pub fn table_header() -> Style {
    Style::default()
        .fg(TEAL)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

pub fn table_row() -> Style {
    Style::default().fg(TEXT)
}

pub fn table_selected() -> Style {
    Style::default()
        .fg(ACCENT)
        .bg(BG_SELECTED)
        .add_modifier(Modifier::BOLD)
}

pub fn tab_active() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn tab_inactive() -> Style {
    Style::default().fg(TEXT)
}

/// Muted text for field labels and hints.
pub fn key_hint() -> Style {
    Style::default().fg(MUTED)
}

pub fn key_hint_key() -> Style {
    Style::default().fg(TEAL).add_modifier(Modifier::BOLD)
}

pub fn value() -> Style {
    Style::default().fg(TEXT)
}

pub fn online(online: bool) -> Style {
    Style::default().fg(if online { ONLINE_GREEN } else { MUTED })
}

/// Registered devices read normally; new ones are flagged.
pub fn status(registered: bool) -> Style {
    Style::default().fg(if registered { TEXT } else { AMBER })
}

pub fn error() -> Style {
    Style::default().fg(ERROR_RED)
}
