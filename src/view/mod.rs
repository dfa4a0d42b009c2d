//! Presentation layer: status thresholds, widgets, and the app-state reducer.

pub mod app;
pub mod snapshot;
pub mod status;
pub mod widgets;

pub use app::{reduce, AppState, Section, StatePatch, UiEvent};
pub use snapshot::DashboardSnapshot;
pub use status::Status;
