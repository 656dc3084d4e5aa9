//! Device registration / edit form.

use presence_api::types::{Device, DeviceInput};

use crate::error::CoreError;
use crate::model::{DeviceType, default_device_name};

pub const MAX_COMMENT_LEN: usize = 200;

/// Whether submitting the form registers a new device or edits one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Register,
    Save,
}

impl SubmitMode {
    pub fn for_device(device: &Device) -> Self {
        if device.is_registered() {
            Self::Save
        } else {
            Self::Register
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Register => "Register",
            Self::Save => "Save",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub icon: DeviceType,
    pub comment: String,
}

impl RegistrationForm {
    /// Prefill from a device, inferring the icon when none is stored.
    pub fn from_device(device: &Device) -> Self {
        Self {
            name: device.name.clone(),
            icon: DeviceType::parse_stored_icon(device.icon.as_deref(), DeviceType::infer(device)),
            comment: device.comment.clone().unwrap_or_default(),
        }
    }

    /// Validate and build the request body. An unknown icon is omitted.
    pub fn to_input(&self) -> Result<DeviceInput, CoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("Display name is required"));
        }
        if self.comment.chars().count() > MAX_COMMENT_LEN {
            return Err(CoreError::validation("Comment is too long"));
        }
        Ok(DeviceInput {
            name: Some(name.to_owned()),
            icon: self.icon.to_stored_icon(),
            comment: Some(self.comment.clone()),
        })
    }
}

/// Request bodies for registering every unregistered device in
/// `selection` under its default name.
pub fn bulk_registrations<'a, I>(selection: I) -> Vec<(String, DeviceInput)>
where
    I: IntoIterator<Item = &'a Device>,
{
    selection
        .into_iter()
        .filter(|d| !d.is_registered())
        .map(|d| {
            (
                d.mac.clone(),
                DeviceInput {
                    name: Some(default_device_name(&d.mac)),
                    ..DeviceInput::default()
                },
            )
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::merge::tests::device;
    use presence_api::types::DeviceStatus;

    #[test]
    fn prefill_infers_icon() {
        let mut d = device("AA:BB:CC:DD:EE:FF", "Phone");
        d.last_sources = vec!["wifi".into()];
        let form = RegistrationForm::from_device(&d);
        assert_eq!(form.icon, DeviceType::Wifi);
        assert_eq!(form.comment, "");

        d.icon = Some("ethernet".into());
        assert_eq!(RegistrationForm::from_device(&d).icon, DeviceType::Wired);
    }

    #[test]
    fn name_is_trimmed_and_required() {
        let mut form = RegistrationForm {
            name: "   ".into(),
            ..RegistrationForm::default()
        };
        assert!(form.to_input().unwrap_err().to_string().contains("Display name is required"));

        form.name = "  Kitchen TV ".into();
        let input = form.to_input().unwrap();
        assert_eq!(input.name.as_deref(), Some("Kitchen TV"));
        assert_eq!(input.icon, None);
    }

    #[test]
    fn comment_limit() {
        let mut form = RegistrationForm {
            name: "x".into(),
            icon: DeviceType::Wired,
            comment: "é".repeat(MAX_COMMENT_LEN),
        };
        assert_eq!(form.to_input().unwrap().icon.as_deref(), Some("wired"));
        form.comment.push('!');
        assert!(form.to_input().unwrap_err().to_string().contains("Comment is too long"));
    }

    #[test]
    fn submit_label_depends_on_status() {
        let mut d = device("m", "n");
        assert_eq!(SubmitMode::for_device(&d).label(), "Register");
        d.status = DeviceStatus::Registered;
        assert_eq!(SubmitMode::for_device(&d).label(), "Save");
    }

    #[test]
    fn bulk_skips_registered() {
        let a = device("AA:BB:CC:DD:EE:01", "a");
        let mut b = device("AA:BB:CC:DD:EE:02", "b");
        b.status = DeviceStatus::Registered;
        let out = bulk_registrations([&a, &b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1.name.as_deref(), Some("Device EE:01"));
    }
}
