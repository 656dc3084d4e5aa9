//! Screen implementations. Each screen is a top-level Component.

pub mod assignments;
pub mod capabilities;
pub mod device_detail;
pub mod devices;
pub mod editor;
pub mod global;
pub mod primitives;

use crate::component::Component;
use crate::screen::ScreenId;

/// Create every screen component, tab-bar screens and overlays alike.
pub fn create_screens(page_size: usize) -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (
            ScreenId::Devices,
            Box::new(devices::DevicesScreen::new(page_size)),
        ),
        (
            ScreenId::Capabilities,
            Box::new(capabilities::CapabilitiesScreen::new()),
        ),
        (ScreenId::Global, Box::new(global::GlobalScreen::new())),
        (
            ScreenId::Primitives,
            Box::new(primitives::PrimitivesScreen::new()),
        ),
        (
            ScreenId::Assignments,
            Box::new(assignments::AssignmentsScreen::new()),
        ),
        (ScreenId::Editor, Box::new(editor::EditorScreen::new())),
    ]
}
