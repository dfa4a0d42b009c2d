use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::app::{AppState, Section};
use super::status::{self, Labeled, Status};
use super::widgets::{
    connection_label, gauge, kpi, security_log, security_stats, ChartSeries, Gauge, Kpi,
    SecurityLogRow, SecurityStats,
};
use crate::data::DataOrigin;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardPanel {
    pub temperature: Kpi,
    pub gas: Kpi,
    pub voltage: Kpi,
    pub security: Labeled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentPanel {
    pub temperature: Gauge,
    pub gas: Gauge,
    pub flame: Labeled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineryPanel {
    pub motor: Labeled,
    pub power: Labeled,
    pub ultrasonic: Labeled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPanel {
    pub stats: SecurityStats,
    pub log: Vec<SecurityLogRow>,
}

/// Everything the dashboard shows for one state, ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub section: Section,
    pub online: bool,
    pub connection: String,
    pub origin: Option<DataOrigin>,
    pub rows: usize,
    pub last_updated: Option<String>,
    pub banner: Option<String>,
    /// `None` until a dataset with at least one row is loaded.
    pub dashboard: Option<DashboardPanel>,
    pub environment: Option<EnvironmentPanel>,
    pub machinery: Option<MachineryPanel>,
    pub security: Option<SecurityPanel>,
    pub charts: BTreeMap<String, ChartSeries>,
}

impl DashboardSnapshot {
    pub fn from_state(state: &AppState) -> Self {
        let dataset = state.dataset.as_ref();
        let latest = dataset.and_then(|d| d.latest());

        let dashboard = latest.map(|r| DashboardPanel {
            temperature: kpi(r.temp_c(), "°C", status::temperature(r.temp_c())),
            gas: kpi(r.gas(), "ppm", status::gas(r.gas())),
            voltage: kpi(r.voltage(), "V", status::voltage(r.voltage())),
            security: status::security(r),
        });
        let environment = latest.map(|r| EnvironmentPanel {
            temperature: gauge(r.temp_c(), 0.0, 50.0),
            gas: gauge(r.gas(), 0.0, 500.0),
            flame: status::flame_indicator(r),
        });
        let machinery = latest.map(|r| MachineryPanel {
            motor: status::motor(r),
            power: status::power(r),
            ultrasonic: status::ultrasonic(r),
        });
        let security = dataset.filter(|d| !d.is_empty()).map(|d| SecurityPanel {
            stats: security_stats(&d.readings),
            log: security_log(&d.readings),
        });

        let charts = state
            .charts
            .iter()
            .map(|(key, series)| (key.column().to_string(), series.clone()))
            .collect();

        Self {
            section: state.section,
            online: state.online,
            connection: connection_label(state.online).to_string(),
            origin: dataset.map(|d| d.origin),
            rows: dataset.map(|d| d.len()).unwrap_or(0),
            last_updated: state.last_updated.clone(),
            banner: state.banner.as_ref().map(|b| b.message.clone()),
            dashboard,
            environment,
            machinery,
            security,
            charts,
        }
    }

    /// Worst status across every panel.
    pub fn overall(&self) -> Status {
        let mut worst = Status::Normal;
        if let Some(d) = &self.dashboard {
            worst = worst
                .max(d.temperature.status)
                .max(d.gas.status)
                .max(d.voltage.status)
                .max(d.security.status);
        }
        if let Some(m) = &self.machinery {
            worst = worst.max(m.motor.status).max(m.power.status).max(m.ultrasonic.status);
        }
        worst
    }
}
