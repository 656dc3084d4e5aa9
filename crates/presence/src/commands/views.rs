//! Saved device views. Stored locally; no add-on connection needed.

use tabled::Tabled;

use presence_core::{DeviceFilter, SavedView};

use crate::cli::{GlobalOpts, ViewsArgs, ViewsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ViewRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    registration: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Search")]
    search: String,
    #[tabled(rename = "Facets")]
    facets: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&SavedView> for ViewRow {
    fn from(v: &SavedView) -> Self {
        let facets: Vec<String> = [
            ("vendor", &v.vendors),
            ("source", &v.sources),
            ("subnet", &v.subnets),
        ]
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(label, values)| format!("{label}={}", values.join("|")))
        .collect();
        Self {
            name: v.name.clone(),
            registration: v.registration_scope.to_string(),
            online: v.online_scope.to_string(),
            search: v.search.clone(),
            facets: facets.join(" "),
            id: v.id.to_string(),
        }
    }
}

pub fn handle(args: ViewsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut views = util::load_saved_views();

    match args.command {
        ViewsCommand::List => {
            let out = output::render_list(&global.output, views.views(), |x| ViewRow::from(x), |v| {
                v.name.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ViewsCommand::Save { name, filter } => {
            let filter: DeviceFilter = util::filter_from_args(&filter);
            let saved = match name {
                Some(name) => views.add_named(name, &filter)?,
                None => views.add(&filter)?,
            };
            util::notice(global, &format!("✓ Saved view '{}' ({})", saved.name, saved.id));
            Ok(())
        }

        ViewsCommand::Remove { view } => {
            let id = util::find_view(&views, &view)?.id;
            views.remove(id)?;
            util::notice(global, &format!("✓ Removed view '{view}'"));
            Ok(())
        }
    }
}
