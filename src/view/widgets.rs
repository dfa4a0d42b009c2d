//! Derived widgets. Every function here is a pure function of readings.

use serde::{Deserialize, Serialize};

use super::status::Status;
use crate::data::Reading;

pub const SECURITY_LOG_LIMIT: usize = 20;
pub const EMPTY_VALUE: &str = "--";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub value: Option<f64>,
    /// One decimal, or `--` when the reading has no number.
    pub display: String,
    pub unit: String,
    pub status: Status,
}

pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => EMPTY_VALUE.to_string(),
    }
}

pub fn kpi(value: Option<f64>, unit: &str, status: Status) -> Kpi {
    Kpi {
        value,
        display: format_value(value),
        unit: unit.to_string(),
        status,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub display: String,
    pub min: f64,
    pub max: f64,
    /// Share of the arc to fill, in [0, 1].
    pub fill: f64,
}

pub fn gauge_fill(value: f64, min: f64, max: f64) -> f64 {
    if max <= min || !value.is_finite() {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

pub fn gauge(value: Option<f64>, min: f64, max: f64) -> Gauge {
    Gauge {
        display: format_value(value),
        min,
        max,
        fill: value.map(|v| gauge_fill(v, min, max)).unwrap_or(0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKey {
    Temperature,
    Light,
    Voltage,
    Current,
    Vibration,
}

impl ChartKey {
    pub const ALL: [ChartKey; 5] = [
        ChartKey::Temperature,
        ChartKey::Light,
        ChartKey::Voltage,
        ChartKey::Current,
        ChartKey::Vibration,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            ChartKey::Temperature => "TempC",
            ChartKey::Light => "Light",
            ChartKey::Voltage => "Voltage",
            ChartKey::Current => "Current",
            ChartKey::Vibration => "Vibration",
        }
    }

    /// How many of the newest points the chart shows.
    pub fn window(&self) -> usize {
        match self {
            ChartKey::Vibration => 15,
            _ => 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    /// `Time` of each point.
    pub labels: Vec<String>,
    /// Gaps where the cell was not numeric.
    pub values: Vec<Option<f64>>,
}

pub fn chart_series(readings: &[Reading], key: ChartKey) -> ChartSeries {
    let start = readings.len().saturating_sub(key.window());
    let tail = &readings[start..];
    ChartSeries {
        labels: tail.iter().map(Reading::time).collect(),
        values: tail.iter().map(|r| r.number(key.column())).collect(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityStats {
    pub total: usize,
    pub sound: usize,
    pub fire: usize,
}

pub fn security_stats(readings: &[Reading]) -> SecurityStats {
    let sound = readings.iter().filter(|r| r.sound()).count();
    let fire = readings.iter().filter(|r| r.flame()).count();
    SecurityStats {
        total: sound + fire,
        sound,
        fire,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityLogRow {
    pub time: String,
    pub icon: String,
    pub message: String,
    pub status: Status,
    pub label: String,
}

impl SecurityLogRow {
    fn event(reading: &Reading, icon: &str, message: &str, status: Status) -> Self {
        Self {
            time: format!("{} {}", reading.date(), reading.time()),
            icon: icon.to_string(),
            message: message.to_string(),
            status,
            label: status.log_label().to_string(),
        }
    }

    fn placeholder() -> Self {
        Self {
            time: EMPTY_VALUE.to_string(),
            icon: String::new(),
            message: "هیچ رویداد امنیتی ثبت نشده".to_string(),
            status: Status::Normal,
            label: Status::Normal.log_label().to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.time == EMPTY_VALUE && self.icon.is_empty()
    }
}

/// Newest row first, sound before flame within a row, capped at
/// `SECURITY_LOG_LIMIT`. A single placeholder row when nothing fired.
pub fn security_log(readings: &[Reading]) -> Vec<SecurityLogRow> {
    let mut rows = Vec::new();
    for r in readings.iter().rev() {
        if r.sound() {
            rows.push(SecurityLogRow::event(r, "🔊", "تشخیص صدای غیرعادی", Status::Warning));
        }
        if r.flame() {
            rows.push(SecurityLogRow::event(r, "🔥", "تشخیص آتش!", Status::Error));
        }
        if rows.len() >= SECURITY_LOG_LIMIT {
            break;
        }
    }
    rows.truncate(SECURITY_LOG_LIMIT);
    if rows.is_empty() {
        rows.push(SecurityLogRow::placeholder());
    }
    rows
}

pub fn last_updated(reading: &Reading) -> String {
    format!("آخرین بروزرسانی: {} {}", reading.date(), reading.time())
}

pub fn connection_label(online: bool) -> &'static str {
    if online {
        "آنلاین"
    } else {
        "آفلاین"
    }
}
