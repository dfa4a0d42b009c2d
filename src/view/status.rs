//! Threshold classification for each sensor.

use serde::{Deserialize, Serialize};

use crate::data::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Normal,
    Warning,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Normal => "normal",
            Status::Warning => "warning",
            Status::Error => "error",
        }
    }

    /// Label used in the security log's type column.
    pub fn log_label(&self) -> &'static str {
        match self {
            Status::Normal => "اطلاعات",
            Status::Warning => "هشدار",
            Status::Error => "خطر",
        }
    }
}

/// A status with the text shown next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labeled {
    pub status: Status,
    pub text: String,
}

impl Labeled {
    fn new(status: Status, text: &str) -> Self {
        Self {
            status,
            text: text.to_string(),
        }
    }
}

const NORMAL_TEXT: &str = "عادی";

// Comparisons against NaN are all false, so a missing reading lands on Normal.
fn value(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

pub fn temperature(temp: Option<f64>) -> Status {
    let t = value(temp);
    if t < 15.0 || t > 35.0 {
        Status::Error
    } else if t < 18.0 || t > 30.0 {
        Status::Warning
    } else {
        Status::Normal
    }
}

pub fn gas(gas: Option<f64>) -> Status {
    let g = value(gas);
    if g > 400.0 {
        Status::Error
    } else if g > 300.0 {
        Status::Warning
    } else {
        Status::Normal
    }
}

pub fn voltage(voltage: Option<f64>) -> Status {
    let v = value(voltage);
    if v < 200.0 || v > 240.0 {
        Status::Error
    } else if v < 210.0 || v > 230.0 {
        Status::Warning
    } else {
        Status::Normal
    }
}

/// Flame outranks sound.
pub fn security(reading: &Reading) -> Labeled {
    if reading.flame() {
        Labeled::new(Status::Error, "خطر آتش!")
    } else if reading.sound() {
        Labeled::new(Status::Warning, "هشدار صوتی")
    } else {
        Labeled::new(Status::Normal, "امن")
    }
}

pub fn motor(reading: &Reading) -> Labeled {
    let v = value(reading.vibration());
    if v > 15.0 {
        Labeled::new(Status::Error, "خطرناک")
    } else if v > 10.0 {
        Labeled::new(Status::Warning, "هشدار")
    } else {
        Labeled::new(Status::Normal, NORMAL_TEXT)
    }
}

pub fn power(reading: &Reading) -> Labeled {
    let p = value(reading.power());
    if p < 50.0 {
        Labeled::new(Status::Warning, "کم")
    } else if p > 150.0 {
        Labeled::new(Status::Warning, "زیاد")
    } else {
        Labeled::new(Status::Normal, NORMAL_TEXT)
    }
}

pub fn ultrasonic(reading: &Reading) -> Labeled {
    let d = value(reading.ultrasonic());
    if d < 50.0 {
        Labeled::new(Status::Error, "خطر")
    } else if d < 80.0 {
        Labeled::new(Status::Warning, "هشدار")
    } else {
        Labeled::new(Status::Normal, NORMAL_TEXT)
    }
}

pub fn flame_indicator(reading: &Reading) -> Labeled {
    if reading.flame() {
        Labeled::new(Status::Error, "هشدار آتش!")
    } else {
        Labeled::new(Status::Normal, NORMAL_TEXT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_csv;

    #[test]
    fn temperature_bands() {
        assert_eq!(temperature(Some(14.9)), Status::Error);
        assert_eq!(temperature(Some(17.0)), Status::Warning);
        assert_eq!(temperature(Some(25.0)), Status::Normal);
        assert_eq!(temperature(Some(30.5)), Status::Warning);
        assert_eq!(temperature(Some(36.0)), Status::Error);
        assert_eq!(temperature(None), Status::Normal);
    }

    #[test]
    fn gas_and_voltage_bands() {
        assert_eq!(gas(Some(300.0)), Status::Normal);
        assert_eq!(gas(Some(301.0)), Status::Warning);
        assert_eq!(gas(Some(410.0)), Status::Error);
        assert_eq!(voltage(Some(195.0)), Status::Error);
        assert_eq!(voltage(Some(205.0)), Status::Warning);
        assert_eq!(voltage(Some(220.0)), Status::Normal);
        assert_eq!(voltage(Some(235.0)), Status::Warning);
        assert_eq!(voltage(Some(241.0)), Status::Error);
    }

    #[test]
    fn flame_outranks_sound() {
        let rows = parse_csv("Date,Time,Sound,Flame\nd,t,1,1\nd,t,1,0\nd,t,0,0");
        assert_eq!(security(&rows[0]).status, Status::Error);
        assert_eq!(security(&rows[0]).text, "خطر آتش!");
        assert_eq!(security(&rows[1]).text, "هشدار صوتی");
        assert_eq!(security(&rows[2]).status, Status::Normal);
    }

    #[test]
    fn machinery_labels() {
        let rows = parse_csv("Date,Time,Vibration,Power,Ultrasonic\nd,t,16,40,45\nd,t,12,160,70\nd,t,5,100,120");
        assert_eq!(motor(&rows[0]).text, "خطرناک");
        assert_eq!(power(&rows[0]).text, "کم");
        assert_eq!(ultrasonic(&rows[0]).status, Status::Error);
        assert_eq!(motor(&rows[1]).status, Status::Warning);
        assert_eq!(power(&rows[1]).text, "زیاد");
        assert_eq!(ultrasonic(&rows[1]).text, "هشدار");
        assert_eq!(motor(&rows[2]).text, NORMAL_TEXT);
        assert_eq!(power(&rows[2]).status, Status::Normal);
        assert_eq!(ultrasonic(&rows[2]).status, Status::Normal);
    }
}
