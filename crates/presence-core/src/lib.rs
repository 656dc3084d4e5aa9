//! Reactive data layer between `presence-api` and the CLI / TUI.
//!
//! - **[`Controller`]**: connection lifecycle, background polling with
//!   pause/resume, and a command channel whose mutations update the cache
//!   optimistically and roll back on failure.
//!   [`Controller::oneshot()`](Controller::oneshot) serves single CLI
//!   invocations.
//!
//! - **[`QueryCache`]**: one [`QueryStore`] per resource, keyed by
//!   hierarchical [`QueryKey`]s. Prefix invalidation, stale times, and a
//!   structural merge that keeps unchanged device lists pointer-identical.
//!
//! - **[`QueryStream<T>`]**: subscription handle exposing `current()` /
//!   `latest()` / `changed()` for reactive rendering.
//!
//! - View logic shared by every front end: the device [`filter`] pipeline,
//!   [`table`] sorting and pagination, [`saved_views`], the device
//!   [`registration`] form, and the capability [`editor`].

pub mod command;
pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod filter;
pub mod format;
pub mod model;
pub mod registration;
pub mod saved_views;
pub mod store;
pub mod stream;
pub mod table;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{ClientConfig, TlsVerification};
pub use controller::{ConnectionState, Controller, PollTargets};
pub use editor::CapabilityEditor;
pub use error::CoreError;
pub use filter::{DeviceFilter, Facet, FacetOptions, OnlineScope, RegistrationScope, Summary};
pub use registration::{RegistrationForm, SubmitMode};
pub use saved_views::{SavedView, SavedViews};
pub use store::{DeviceList, QueryCache, QueryKey, QueryState, QueryStore};
pub use stream::QueryStream;
pub use table::{DeviceListView, Pagination, SortColumn, SortDirection};

pub use model::{
    ActionType, CapabilityDeviceAssignment, CapabilityListParams, CapabilityPatch,
    CapabilityTemplate, CapabilityUIModel, Device, DeviceInput, DeviceListParams, DeviceStatus,
    DeviceType, HealthStatus, SetStateResult, StateSourceType,
};

// Re-export the API-level base path so consumers need only this crate.
pub use presence_api::BasePath;
