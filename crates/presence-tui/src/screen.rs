//! Screen identifiers and tab-bar ordering.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    Devices, // 1
    Capabilities, // 2
    Global,       // 3
    Primitives,   // 4
    /// Devices bound to one capability; opened from Capabilities with `a`.
    Assignments,
    /// Capability editor; full-frame, opened with `n` / `e`.
    Editor,
}

impl ScreenId {
    /// Screens in tab-bar order.
    pub const ALL: [ScreenId; 4] = [
        Self::Devices,
        Self::Capabilities,
        Self::Global,
        Self::Primitives,
    ];

    /// Number key for this screen; 0 for screens outside the tab bar.
    pub fn number(self) -> u8 {
        match self {
            Self::Devices => 1,
            Self::Capabilities => 2,
            Self::Global => 3,
            Self::Primitives => 4,
            Self::Assignments | Self::Editor => 0,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Devices),
            2 => Some(Self::Capabilities),
            3 => Some(Self::Global),
            4 => Some(Self::Primitives),
            _ => None,
        }
    }

    /// Next tab, wrapping. Off-bar screens continue from Capabilities.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(1);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(1);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Whether the screen owns the whole frame and every key.
    pub fn is_modal(self) -> bool {
        matches!(self, Self::Editor)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Devices => "Devices",
            Self::Capabilities => "Capabilities",
            Self::Global => "Global",
            Self::Primitives => "Primitives",
            Self::Assignments => "Assignments",
            Self::Editor => "Editor",
        }
    }

    /// Compact label for narrow terminals (< 80 cols).
    pub fn label_short(self) -> &'static str {
        match self {
            Self::Devices => "Dev",
            Self::Capabilities => "Caps",
            Self::Global => "Glob",
            Self::Primitives => "Prim",
            Self::Assignments => "Asgn",
            Self::Editor => "Edit",
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_round_trip_for_tabs() {
        for id in ScreenId::ALL {
            assert_eq!(ScreenId::from_number(id.number()), Some(id));
        }
        assert_eq!(ScreenId::from_number(0), None);
        assert_eq!(ScreenId::from_number(5), None);
    }

    #[test]
    fn tab_cycling_wraps() {
        assert_eq!(ScreenId::Primitives.next(), ScreenId::Devices);
        assert_eq!(ScreenId::Devices.prev(), ScreenId::Primitives);
        assert_eq!(ScreenId::Assignments.next(), ScreenId::Global);
    }
}
