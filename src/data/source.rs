use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use super::synthetic::synthesize_now;
use super::{parse_csv_report, Reading};
use crate::cache::http::Request;
use crate::cache::network::Fetcher;
use crate::error::DataError;
use crate::logging::{log, log_failure, obj, v_num, v_str, Domain, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Network,
    /// Network failed; the worker answered from its data store.
    Cache,
    Synthetic,
}

impl DataOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataOrigin::Network => "network",
            DataOrigin::Cache => "cache",
            DataOrigin::Synthetic => "synthetic",
        }
    }

    /// Only a live network answer counts as online.
    pub fn is_online(&self) -> bool {
        matches!(self, DataOrigin::Network)
    }
}

/// A full replacement for the previous dataset; never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub readings: Vec<Reading>,
    pub origin: DataOrigin,
}

impl Dataset {
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

type Generator = Box<dyn Fn() -> Vec<Reading> + Send + Sync>;

pub struct DataSource {
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
    data_path: String,
    fallback: Generator,
}

impl DataSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, origin: Url, data_path: &str) -> Self {
        Self {
            fetcher,
            origin,
            data_path: data_path.to_string(),
            fallback: Box::new(synthesize_now),
        }
    }

    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn() -> Vec<Reading> + Send + Sync + 'static,
    {
        self.fallback = Box::new(fallback);
        self
    }

    /// Transport failures, bad statuses and empty bodies all end in the
    /// synthetic set. `NoData` only when that set is empty too.
    pub async fn load_dataset(&self) -> Result<Dataset, DataError> {
        match self.fetch_readings().await {
            Ok(dataset) => {
                log(
                    Level::Info,
                    Domain::Data,
                    "dataset_loaded",
                    obj(&[
                        ("origin", v_str(dataset.origin.as_str())),
                        ("rows", v_num(dataset.len() as f64)),
                    ]),
                );
                Ok(dataset)
            }
            Err(reason) => {
                log_failure(Domain::Data, "dataset_fallback", &self.data_path, &reason);
                let readings = (self.fallback)();
                if readings.is_empty() {
                    log(Level::Error, Domain::Data, "no_data", obj(&[]));
                    return Err(DataError::NoData);
                }
                Ok(Dataset {
                    readings,
                    origin: DataOrigin::Synthetic,
                })
            }
        }
    }

    async fn fetch_readings(&self) -> Result<Dataset, String> {
        let req = Request::get(&self.origin, &self.data_path).map_err(|e| e.to_string())?;
        let resp = self.fetcher.fetch(&req).await.map_err(|e| e.to_string())?;
        if !resp.is_success() {
            return Err(format!("HTTP {}: {}", resp.status, resp.status_text));
        }
        let report = parse_csv_report(&resp.text());
        if report.dropped > 0 {
            log(
                Level::Warn,
                Domain::Data,
                "rows_dropped",
                obj(&[("url", v_str(&req.key())), ("dropped", v_num(report.dropped as f64))]),
            );
        }
        if report.readings.is_empty() {
            return Err("empty dataset".to_string());
        }
        let origin = if resp.served_from_cache() {
            DataOrigin::Cache
        } else {
            DataOrigin::Network
        };
        Ok(Dataset {
            readings: report.readings,
            origin,
        })
    }
}
