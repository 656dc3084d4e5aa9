//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use presence_core::{
    CapabilityPatch, CapabilityTemplate, DeviceFilter, OnlineScope, RegistrationScope,
    SavedView, SavedViews, SetStateResult, SortColumn,
};

use crate::cli::{DeviceFilterArgs, GlobalOpts, OnlineArg, PatchArgs, RegistrationArg, SortArg};
use crate::error::CliError;

// ── Argument translation ────────────────────────────────────────────

pub fn filter_from_args(args: &DeviceFilterArgs) -> DeviceFilter {
    let mut filter = DeviceFilter {
        registration: match args.status {
            RegistrationArg::All => RegistrationScope::All,
            RegistrationArg::New => RegistrationScope::New,
            RegistrationArg::Registered => RegistrationScope::Registered,
            RegistrationArg::Unregistered => RegistrationScope::Unregistered,
        },
        online: match args.online {
            OnlineArg::Any => OnlineScope::Any,
            OnlineArg::Online => OnlineScope::Online,
            OnlineArg::Offline => OnlineScope::Offline,
        },
        search: args.search.clone().unwrap_or_default(),
        ..DeviceFilter::default()
    };
    extend_facets(&mut filter, args);
    filter
}

/// Layer flag values over a saved view's filter. Scopes and search
/// replace the view's only when given a non-default value.
pub fn merge_filter_args(mut base: DeviceFilter, args: &DeviceFilterArgs) -> DeviceFilter {
    let flags = filter_from_args(args);
    if flags.registration != RegistrationScope::All {
        base.registration = flags.registration;
    }
    if flags.online != OnlineScope::Any {
        base.online = flags.online;
    }
    if !flags.search.trim().is_empty() {
        base.search = flags.search;
    }
    extend_facets(&mut base, args);
    base
}

fn extend_facets(filter: &mut DeviceFilter, args: &DeviceFilterArgs) {
    use presence_core::Facet;
    for (facet, values) in [
        (Facet::Vendor, &args.vendors),
        (Facet::Source, &args.sources),
        (Facet::Subnet, &args.subnets),
    ] {
        for value in values {
            if !filter.selected(facet).contains(value) {
                filter.toggle(facet, value);
            }
        }
    }
}

pub fn sort_column(arg: SortArg) -> SortColumn {
    match arg {
        SortArg::Name => SortColumn::Name,
        SortArg::Mac => SortColumn::Mac,
        SortArg::Vendor => SortColumn::Vendor,
        SortArg::Ip => SortColumn::LastIp,
        SortArg::LastSeen => SortColumn::LastSeen,
        SortArg::Status => SortColumn::Status,
        SortArg::Online => SortColumn::Online,
    }
}

/// `--state` / `--enable` / `--disable` as a patch. Emptiness is
/// rejected later by the patch's own validation.
pub fn patch_from_args(args: &PatchArgs) -> CapabilityPatch {
    CapabilityPatch {
        state: args.state.clone(),
        enabled: match (args.enable, args.disable) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
    }
}

// ── Saved views ─────────────────────────────────────────────────────

pub fn load_saved_views() -> SavedViews {
    SavedViews::load(presence_config::data_dir().join(presence_core::saved_views::SAVED_VIEWS_FILE))
}

/// Look a view up by id, then by exact name.
pub fn find_view<'a>(views: &'a SavedViews, key: &str) -> Result<&'a SavedView, CliError> {
    views
        .views()
        .iter()
        .find(|v| v.id.to_string() == key)
        .or_else(|| views.views().iter().find(|v| v.name == key))
        .ok_or_else(|| CliError::NotFound {
            resource_type: "view".into(),
            identifier: key.into(),
            list_command: "views list".into(),
        })
}

// ── Interaction ─────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving with `--yes`. Refuses to
/// guess when stdin is not a terminal.
pub fn confirm(message: &str, action: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Print a status line to stderr unless `--quiet`.
pub fn notice(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}

/// Report a state change, including any action warnings.
pub fn report_state_change(global: &GlobalOpts, what: &str, result: &SetStateResult) {
    notice(global, &format!("✓ {what}"));
    for warning in &result.warnings {
        eprintln!("  ⚠ {}: {}", warning.type_id, warning.message);
    }
}

// ── Files ───────────────────────────────────────────────────────────

/// Read a capability template for `--from-file`.
pub fn read_template(path: &Path) -> Result<CapabilityTemplate, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("not a capability template: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_args() -> DeviceFilterArgs {
        DeviceFilterArgs {
            status: RegistrationArg::All,
            online: OnlineArg::Any,
            search: None,
            vendors: Vec::new(),
            sources: Vec::new(),
            subnets: Vec::new(),
        }
    }

    #[test]
    fn flags_extend_saved_view_facets() {
        let base = DeviceFilter {
            registration: RegistrationScope::New,
            vendors: vec!["Apple".into()],
            ..DeviceFilter::default()
        };
        let mut args = filter_args();
        args.vendors = vec!["Acme".into(), "Apple".into()];
        args.online = OnlineArg::Online;

        let merged = merge_filter_args(base, &args);
        assert_eq!(merged.registration, RegistrationScope::New);
        assert_eq!(merged.online, OnlineScope::Online);
        assert_eq!(merged.vendors, vec!["Acme".to_owned(), "Apple".to_owned()]);
    }

    #[test]
    fn patch_flags() {
        let patch = patch_from_args(&PatchArgs {
            state: None,
            enable: false,
            disable: true,
        });
        assert_eq!(patch.enabled, Some(false));
        assert!(patch.state.is_none());
    }
}
