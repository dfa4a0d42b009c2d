use async_trait::async_trait;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::http::{cache_key, Request, Response};
use crate::error::FetchError;

/// Anything that can answer a request: the raw network, or the cache
/// worker sitting in front of it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, req: &Request) -> Result<Response, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport(format!("client setup: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
        let method = Method::from_bytes(req.method.as_bytes())
            .map_err(|e| FetchError::InvalidUrl(format!("bad method {}: {}", req.method, e)))?;
        let resp = self
            .client
            .request(method, req.url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?
            .to_vec();

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }
}

/// In-process network with fixed routes. Unknown URLs and everything
/// while offline fail with a transport error.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Response>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, response: Response) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.to_string(), response);
        }
    }

    pub fn remove_route(&self, url: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.remove(url);
        }
    }

    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut flag) = self.offline.lock() {
            *flag = offline;
        }
    }

    /// Keys of every request seen, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
        let key = cache_key(&req.url);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.clone());
        }
        if self.offline.lock().map(|f| *f).unwrap_or(true) {
            return Err(FetchError::Transport("offline".to_string()));
        }
        self.routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(&key).cloned())
            .ok_or_else(|| FetchError::Transport(format!("no route to {}", key)))
    }
}
