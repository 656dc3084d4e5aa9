// ── Saved filter views ──
//
// A small JSON file in the data directory; newest first, capped at
// `MAX_SAVED_VIEWS`. A missing or corrupt file loads as an empty list.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::CoreError;
use crate::filter::{DeviceFilter, OnlineScope, RegistrationScope};

pub const MAX_SAVED_VIEWS: usize = 12;
pub const SAVED_VIEWS_FILE: &str = "saved-views.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedView {
    pub id: Uuid,
    pub name: String,
    pub registration_scope: RegistrationScope,
    pub online_scope: OnlineScope,
    pub search: String,
    pub vendors: Vec<String>,
    pub sources: Vec<String>,
    pub subnets: Vec<String>,
}

impl SavedView {
    pub fn from_filter(name: String, filter: &DeviceFilter) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            registration_scope: filter.registration,
            online_scope: filter.online,
            search: filter.search.clone(),
            vendors: filter.vendors.clone(),
            sources: filter.sources.clone(),
            subnets: filter.subnets.clone(),
        }
    }

    pub fn to_filter(&self) -> DeviceFilter {
        DeviceFilter {
            registration: self.registration_scope,
            online: self.online_scope,
            search: self.search.clone(),
            vendors: self.vendors.clone(),
            sources: self.sources.clone(),
            subnets: self.subnets.clone(),
        }
    }
}

/// Persistent, ordered collection of saved views.
#[derive(Debug, Default)]
pub struct SavedViews {
    path: Option<PathBuf>,
    views: Vec<SavedView>,
}

impl SavedViews {
    /// In-memory only; nothing is written.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let views = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<Vec<SavedView>>(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring unreadable saved views");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        Self {
            path: Some(path),
            views,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn views(&self) -> &[SavedView] {
        &self.views
    }

    pub fn get(&self, id: Uuid) -> Option<&SavedView> {
        self.views.iter().find(|v| v.id == id)
    }

    /// Save `filter` as a new view named after the current local time.
    pub fn add(&mut self, filter: &DeviceFilter) -> Result<&SavedView, CoreError> {
        let name = format!("View {}", chrono::Local::now().format("%H:%M:%S"));
        self.add_named(name, filter)
    }

    pub fn add_named(&mut self, name: String, filter: &DeviceFilter) -> Result<&SavedView, CoreError> {
        self.views.insert(0, SavedView::from_filter(name, filter));
        self.views.truncate(MAX_SAVED_VIEWS);
        self.persist()?;
        Ok(&self.views[0])
    }

    pub fn remove(&mut self, id: Uuid) -> Result<bool, CoreError> {
        let before = self.views.len();
        self.views.retain(|v| v.id != id);
        let removed = self.views.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<(), CoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let persistence = |reason: String| CoreError::Persistence {
            what: "saved views".into(),
            reason,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| persistence(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.views).map_err(|e| persistence(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| persistence(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filter(search: &str) -> DeviceFilter {
        DeviceFilter {
            registration: RegistrationScope::New,
            search: search.into(),
            vendors: vec!["Dell".into()],
            ..DeviceFilter::default()
        }
    }

    #[test]
    fn newest_first_and_capped() {
        let mut views = SavedViews::ephemeral();
        for i in 0..15 {
            views.add_named(format!("v{i}"), &filter("x")).unwrap();
        }
        assert_eq!(views.views().len(), MAX_SAVED_VIEWS);
        assert_eq!(views.views()[0].name, "v14");
        assert_eq!(views.views()[11].name, "v3");
    }

    #[test]
    fn default_name_is_time_of_day() {
        let mut views = SavedViews::ephemeral();
        let view = views.add(&filter("x")).unwrap();
        assert!(view.name.starts_with("View "));
        assert_eq!(view.name.len(), "View HH:MM:SS".len());
    }

    #[test]
    fn apply_restores_filter() {
        let mut views = SavedViews::ephemeral();
        let id = views.add(&filter("tv")).unwrap().id;
        assert_eq!(views.get(id).unwrap().to_filter(), filter("tv"));
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SAVED_VIEWS_FILE);

        let mut views = SavedViews::load(&path);
        let keep = views.add_named("keep".into(), &filter("a")).unwrap().id;
        let drop = views.add_named("drop".into(), &filter("b")).unwrap().id;
        assert!(views.remove(drop).unwrap());
        assert!(!views.remove(drop).unwrap());

        let reloaded = SavedViews::load(&path);
        assert_eq!(reloaded.views().len(), 1);
        assert_eq!(reloaded.views()[0].id, keep);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SAVED_VIEWS_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert!(SavedViews::load(&path).views().is_empty());
    }
}
