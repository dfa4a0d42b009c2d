//! Application state and the UI reducer: `(&AppState, UiEvent) -> StatePatch`.
//!
//! The reducer never mutates; [`AppState::apply`] is the only writer. Charts
//! are keyed series rebuilt from the dataset snapshot on every data update.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::widgets::{chart_series, last_updated, ChartKey, ChartSeries};
use crate::data::Dataset;

/// How long the load-failure banner stays up.
pub const BANNER_TTL_MS: u64 = 5_000;

pub const LOAD_FAILED_MESSAGE: &str = "خطا در بارگذاری داده‌ها. لطفاً فایل data.csv را بررسی کنید.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Dashboard,
    Environment,
    Machinery,
    Security,
}

impl Section {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "dashboard" => Some(Section::Dashboard),
            "environment" => Some(Section::Environment),
            "machinery" => Some(Section::Machinery),
            "security" => Some(Section::Security),
            _ => None,
        }
    }

    pub fn charts(&self) -> &'static [ChartKey] {
        match self {
            Section::Dashboard => &[ChartKey::Temperature],
            Section::Environment => &[ChartKey::Light],
            Section::Machinery => &[ChartKey::Voltage, ChartKey::Current, ChartKey::Vibration],
            Section::Security => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub dataset: Option<Dataset>,
    pub section: Section,
    pub charts: HashMap<ChartKey, ChartSeries>,
    pub online: bool,
    pub banner: Option<Banner>,
    pub last_updated: Option<String>,
    /// Charts the renderer still has to redraw.
    pub redraw: Vec<ChartKey>,
    pub now_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Navigate(Section),
    Resize,
    DataUpdated(Dataset),
    ConnectionChanged(bool),
    LoadFailed(String),
    Tick(u64),
}

/// Fields left as `None` are unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub dataset: Option<Dataset>,
    pub section: Option<Section>,
    pub charts: Option<HashMap<ChartKey, ChartSeries>>,
    pub online: Option<bool>,
    /// `Some(None)` clears the banner.
    pub banner: Option<Option<Banner>>,
    pub last_updated: Option<String>,
    pub redraw: Vec<ChartKey>,
    pub now_ms: Option<u64>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        *self == StatePatch::default()
    }
}

pub fn build_charts(dataset: &Dataset) -> HashMap<ChartKey, ChartSeries> {
    ChartKey::ALL
        .iter()
        .map(|key| (*key, chart_series(&dataset.readings, *key)))
        .collect()
}

pub fn reduce(state: &AppState, event: UiEvent) -> StatePatch {
    match event {
        UiEvent::Navigate(section) => StatePatch {
            section: Some(section),
            redraw: section
                .charts()
                .iter()
                .copied()
                .filter(|key| state.charts.contains_key(key))
                .collect(),
            ..StatePatch::default()
        },
        UiEvent::Resize => {
            let mut redraw: Vec<ChartKey> = state.charts.keys().copied().collect();
            redraw.sort();
            StatePatch {
                redraw,
                ..StatePatch::default()
            }
        }
        UiEvent::DataUpdated(dataset) => StatePatch {
            charts: Some(build_charts(&dataset)),
            online: Some(dataset.origin.is_online()),
            last_updated: dataset.latest().map(last_updated),
            redraw: state.section.charts().to_vec(),
            dataset: Some(dataset),
            ..StatePatch::default()
        },
        UiEvent::ConnectionChanged(online) if online != state.online => StatePatch {
            online: Some(online),
            ..StatePatch::default()
        },
        UiEvent::ConnectionChanged(_) => StatePatch::default(),
        UiEvent::LoadFailed(message) => StatePatch {
            online: Some(false),
            banner: Some(Some(Banner {
                message,
                expires_at_ms: state.now_ms + BANNER_TTL_MS,
            })),
            ..StatePatch::default()
        },
        UiEvent::Tick(now_ms) => {
            let expired = state
                .banner
                .as_ref()
                .map(|b| now_ms >= b.expires_at_ms)
                .unwrap_or(false);
            StatePatch {
                now_ms: Some(now_ms),
                banner: if expired { Some(None) } else { None },
                ..StatePatch::default()
            }
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(dataset) = patch.dataset {
            self.dataset = Some(dataset);
        }
        if let Some(section) = patch.section {
            self.section = section;
        }
        if let Some(charts) = patch.charts {
            self.charts = charts;
        }
        if let Some(online) = patch.online {
            self.online = online;
        }
        if let Some(banner) = patch.banner {
            self.banner = banner;
        }
        if let Some(label) = patch.last_updated {
            self.last_updated = Some(label);
        }
        if let Some(now_ms) = patch.now_ms {
            self.now_ms = now_ms;
        }
        for key in patch.redraw {
            if !self.redraw.contains(&key) {
                self.redraw.push(key);
            }
        }
    }

    pub fn dispatch(&mut self, event: UiEvent) {
        let patch = reduce(self, event);
        self.apply(patch);
    }

    /// Hands the pending redraw list to the renderer.
    pub fn take_redraw(&mut self) -> Vec<ChartKey> {
        std::mem::take(&mut self.redraw)
    }
}
