//! Sensor dataset: CSV parsing, the synthetic fallback, and the loader
//! that chooses between them.

pub mod source;
pub mod synthetic;

use serde::{Deserialize, Serialize};

pub use source::{DataSource, DataOrigin, Dataset};

/// Columns that stay text even when they look numeric.
pub const TIMESTAMP_COLUMNS: [&str; 2] = ["Date", "Time"];

pub const DELIMITER: char = ',';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    fn coerce(column: &str, raw: &str) -> Self {
        if TIMESTAMP_COLUMNS.contains(&column) || raw.is_empty() {
            return FieldValue::Text(raw.to_string());
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One row of the sensor feed, fields in header order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    fields: Vec<(String, FieldValue)>,
}

impl Reading {
    pub fn new(fields: Vec<(String, FieldValue)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(FieldValue::as_number)
    }

    pub fn text(&self, column: &str) -> String {
        self.get(column).map(|v| v.to_string()).unwrap_or_default()
    }

    /// Alarm columns count as raised only when they hold the number 1.
    fn flag(&self, column: &str) -> bool {
        self.number(column) == Some(1.0)
    }

    pub fn date(&self) -> String {
        self.text("Date")
    }

    pub fn time(&self) -> String {
        self.text("Time")
    }

    pub fn temp_c(&self) -> Option<f64> {
        self.number("TempC")
    }

    pub fn gas(&self) -> Option<f64> {
        self.number("Gas")
    }

    pub fn voltage(&self) -> Option<f64> {
        self.number("Voltage")
    }

    pub fn vibration(&self) -> Option<f64> {
        self.number("Vibration")
    }

    pub fn light(&self) -> Option<f64> {
        self.number("Light")
    }

    pub fn ultrasonic(&self) -> Option<f64> {
        self.number("Ultrasonic")
    }

    pub fn power(&self) -> Option<f64> {
        self.number("Power")
    }

    pub fn current(&self) -> Option<f64> {
        self.number("Current")
    }

    pub fn sound(&self) -> bool {
        self.flag("Sound")
    }

    pub fn flame(&self) -> bool {
        self.flag("Flame")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub readings: Vec<Reading>,
    pub header: Vec<String>,
    /// Rows whose field count did not match the header.
    pub dropped: usize,
}

/// Splits the text on newlines; the first line is the header. No quoting.
pub fn parse_csv_report(text: &str) -> ParseReport {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    if lines.len() < 2 {
        return ParseReport::default();
    }
    let header: Vec<String> = lines[0]
        .split(DELIMITER)
        .map(|h| h.trim().to_string())
        .collect();

    let mut report = ParseReport {
        header,
        ..ParseReport::default()
    };
    for line in &lines[1..] {
        let values: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
        if values.len() != report.header.len() {
            report.dropped += 1;
            continue;
        }
        let fields = report
            .header
            .iter()
            .zip(values)
            .map(|(column, raw)| (column.clone(), FieldValue::coerce(column, raw)))
            .collect();
        report.readings.push(Reading::new(fields));
    }
    report
}

pub fn parse_csv(text: &str) -> Vec<Reading> {
    parse_csv_report(text).readings
}
