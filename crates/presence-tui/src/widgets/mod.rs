pub mod sub_tabs;
pub mod text_field;

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};

use presence_core::model::{CapabilityControl, ControlType};

use crate::theme;

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.width.saturating_sub(width) / 2;
    let y = area.height.saturating_sub(height) / 2;
    Rect::new(area.x + x, area.y + y, width, height)
}

/// Truncate to `max` characters, appending an ellipsis when cut.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_owned();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// `key label  key label` hint line.
pub fn key_hints(pairs: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(pairs.len() * 2 + 1);
    spans.push(Span::raw(" "));
    for (key, label) in pairs {
        spans.push(Span::styled(format!("{key} "), theme::key_hint_key()));
        spans.push(Span::styled(format!("{label}  "), theme::key_hint()));
    }
    Line::from(spans)
}

/// Move `current` by `delta` within `0..len`, saturating at both ends.
pub fn step_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}

/// Move `current` by one within `0..len`, wrapping around.
pub fn cycle_index(current: usize, forward: bool, len: usize) -> usize {
    match (len, forward) {
        (0, _) => 0,
        (_, true) => (current + 1) % len,
        (_, false) => (current + len - 1) % len,
    }
}

/// The state after `current` for a capability control: a switch flips,
/// a select steps through its options. `None` when nothing would change.
pub fn next_state(control: &CapabilityControl, current: &str, forward: bool) -> Option<String> {
    let next = match control.control_type {
        ControlType::Switch => {
            let next = if current == "on" { "off" } else { "on" };
            next.to_owned()
        }
        ControlType::Select => {
            let options = &control.options;
            let idx = options.iter().position(|o| o.value == current).unwrap_or(0);
            options.get(cycle_index(idx, forward, options.len()))?.value.clone()
        }
    };
    (next != current).then_some(next)
}

/// Display label of `state`, falling back to the raw value.
pub fn state_label<'a>(control: &'a CapabilityControl, state: &'a str) -> &'a str {
    control
        .options
        .iter()
        .find(|o| o.value == state)
        .map_or(state, |o| o.label.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("kitchen", 10), "kitchen");
        assert_eq!(truncate("living room tv", 8), "living …");
        assert_eq!(truncate("ümlaut", 6), "ümlaut");
    }

    #[test]
    fn index_stepping() {
        assert_eq!(step_index(0, -1, 5), 0);
        assert_eq!(step_index(3, 10, 5), 4);
        assert_eq!(step_index(0, 1, 0), 0);
        assert_eq!(cycle_index(4, true, 5), 0);
        assert_eq!(cycle_index(0, false, 5), 4);
    }

    #[test]
    fn switch_flips_and_select_wraps() {
        use presence_core::model::ControlOption;

        let switch = CapabilityControl {
            control_type: ControlType::Switch,
            options: vec![ControlOption::new("on", "On"), ControlOption::new("off", "Off")],
        };
        assert_eq!(next_state(&switch, "off", true).as_deref(), Some("on"));
        assert_eq!(next_state(&switch, "on", false).as_deref(), Some("off"));

        let select = CapabilityControl {
            control_type: ControlType::Select,
            options: vec![
                ControlOption::new("allow", "Allow"),
                ControlOption::new("limit", "Limit"),
                ControlOption::new("deny", "Deny"),
            ],
        };
        assert_eq!(next_state(&select, "deny", true).as_deref(), Some("allow"));
        assert_eq!(next_state(&select, "allow", false).as_deref(), Some("deny"));
        assert_eq!(state_label(&select, "limit"), "Limit");
        assert_eq!(state_label(&select, "gone"), "gone");

        let single = CapabilityControl {
            control_type: ControlType::Select,
            options: vec![ControlOption::new("only", "Only")],
        };
        assert_eq!(next_state(&single, "only", true), None);
    }

    #[test]
    fn centered_rect_fits_small_areas() {
        let area = Rect::new(0, 0, 20, 10);
        let r = centered_rect(area, 60, 5);
        assert!(r.width <= 16);
        assert_eq!(r.height, 5);
        assert!(r.x + r.width <= area.width);
    }
}
