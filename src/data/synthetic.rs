use chrono::{DateTime, Duration, Local, TimeZone};
use rand::Rng;

use super::{FieldValue, Reading};

pub const SYNTHETIC_ROWS: usize = 50;
pub const SYNTHETIC_STEP_MINUTES: i64 = 10;

fn uniform<R: Rng>(rng: &mut R, low: f64, span: f64) -> f64 {
    low + rng.gen::<f64>() * span
}

fn alarm<R: Rng>(rng: &mut R, threshold: f64) -> f64 {
    if rng.gen::<f64>() > threshold {
        1.0
    } else {
        0.0
    }
}

/// Plausible readings ending at `now`, one every ten minutes, oldest first.
pub fn synthesize<Tz, R>(now: DateTime<Tz>, rng: &mut R) -> Vec<Reading>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    R: Rng,
{
    let mut rows = Vec::with_capacity(SYNTHETIC_ROWS);
    for i in (0..SYNTHETIC_ROWS as i64).rev() {
        let at = now.clone() - Duration::minutes(i * SYNTHETIC_STEP_MINUTES);
        let fields = vec![
            ("Date".to_string(), FieldValue::Text(at.format("%Y/%m/%d").to_string())),
            ("Time".to_string(), FieldValue::Text(at.format("%H:%M:%S").to_string())),
            ("TempC".to_string(), FieldValue::Number(uniform(rng, 22.0, 8.0))),
            ("Light".to_string(), FieldValue::Number(uniform(rng, 800.0, 200.0))),
            ("Gas".to_string(), FieldValue::Number(uniform(rng, 200.0, 100.0))),
            ("Vibration".to_string(), FieldValue::Number(uniform(rng, 5.0, 15.0))),
            ("Voltage".to_string(), FieldValue::Number(uniform(rng, 220.0, 10.0))),
            ("Ultrasonic".to_string(), FieldValue::Number(uniform(rng, 100.0, 100.0))),
            ("Power".to_string(), FieldValue::Number(uniform(rng, 100.0, 50.0))),
            ("Current".to_string(), FieldValue::Number(uniform(rng, 0.5, 1.0))),
            ("Sound".to_string(), FieldValue::Number(alarm(rng, 0.9))),
            ("Flame".to_string(), FieldValue::Number(alarm(rng, 0.95))),
        ];
        rows.push(Reading::new(fields));
    }
    rows
}

pub fn synthesize_now() -> Vec<Reading> {
    synthesize(Local::now(), &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fifty_rows_ascending_ending_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let rows = synthesize(now, &mut StdRng::seed_from_u64(7));
        assert_eq!(rows.len(), SYNTHETIC_ROWS);
        assert_eq!(rows[0].date(), "2024/03/20");
        assert_eq!(rows[0].time(), "03:50:00");
        assert_eq!(rows[49].time(), "12:00:00");

        let stamps: Vec<String> = rows.iter().map(|r| format!("{} {}", r.date(), r.time())).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn values_stay_in_range() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        for r in synthesize(now, &mut StdRng::seed_from_u64(42)) {
            let t = r.temp_c().unwrap();
            assert!((22.0..30.0).contains(&t));
            let g = r.gas().unwrap();
            assert!((200.0..300.0).contains(&g));
            let v = r.voltage().unwrap();
            assert!((220.0..230.0).contains(&v));
            let c = r.current().unwrap();
            assert!((0.5..1.5).contains(&c));
            let s = r.number("Sound").unwrap();
            assert!(s == 0.0 || s == 1.0);
        }
    }

    #[test]
    fn same_seed_same_rows() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let a = synthesize(now, &mut StdRng::seed_from_u64(1));
        let b = synthesize(now, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
