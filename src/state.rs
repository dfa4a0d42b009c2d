use url::Url;

use crate::cache::policy::StoreNames;
use crate::cache::WorkerConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Origin the dashboard is served from; same-origin assets are static.
    pub origin: String,
    pub data_path: String,
    pub cache_db: String,
    pub fetch_timeout_secs: u64,
    pub refresh_secs: u64,
    /// The 30 s page refresh ships disabled.
    pub refresh_enabled: bool,
    /// Whether scheduled background sync is available.
    pub periodic_sync: bool,
    pub run_once: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            origin: std::env::var("DASH_ORIGIN").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            data_path: std::env::var("DATA_PATH").unwrap_or_else(|_| "/data.csv".to_string()),
            cache_db: std::env::var("CACHE_DB").unwrap_or_else(|_| "./smartfactory-cache.sqlite".to_string()),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
            refresh_secs: std::env::var("REFRESH_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30),
            refresh_enabled: std::env::var("REFRESH_ENABLED").ok().and_then(|v| parse_flag(&v)).unwrap_or(false),
            periodic_sync: std::env::var("PERIODIC_SYNC").ok().and_then(|v| parse_flag(&v)).unwrap_or(false),
            run_once: std::env::var("RUN_ONCE").ok().and_then(|v| parse_flag(&v)).unwrap_or(false),
        }
    }

    pub fn origin_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.origin)
    }

    pub fn worker_config(&self) -> Result<WorkerConfig, url::ParseError> {
        Ok(WorkerConfig {
            origin: self.origin_url()?,
            data_path: self.data_path.clone(),
            stores: StoreNames::current(),
            periodic_sync_supported: self.periodic_sync,
        })
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
