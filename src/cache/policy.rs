//! Store identities, the install manifest, and request classification.

use std::time::Duration;
use url::Url;

use super::http::Request;

pub const CACHE_VERSION: &str = "v1.0.0";
pub const STATIC_STORE_PREFIX: &str = "smart-factory";
pub const DATA_STORE_PREFIX: &str = "smart-factory-data";

/// Data-store entries kept by cleanup.
pub const DATA_RETENTION: usize = 10;
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Timer name for the retention sweep.
pub const CLEANUP_JOB: &str = "data-cleanup";
/// Cache-Control hint on page-supplied data.
pub const CACHED_DATA_MAX_AGE_SECS: u64 = 300;

pub const SYNC_TAG: &str = "data-sync";
pub const PERIODIC_SYNC_TAG: &str = "data-refresh";

/// App shell fetched on install. Relative entries resolve against the origin.
pub const APP_SHELL: [&str; 7] = [
    "/",
    "/index.html",
    "/style.css",
    "/app.js",
    "/manifest.json",
    "https://cdn.jsdelivr.net/npm/chart.js",
    "https://fonts.googleapis.com/css2?family=Vazirmatn:wght@300;400;500;600;700&display=swap",
];

pub const OFFLINE_DOCUMENT: &str = "/index.html";

/// Paths served network-first.
pub const DATA_FILES: [&str; 1] = ["/data.csv"];

/// Third-party hosts whose assets are cached like same-origin ones.
pub const STATIC_HOSTS: [&str; 2] = ["cdn.jsdelivr.net", "fonts.googleapis.com"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Volatile tabular data: network-first.
    Data,
    /// App shell and library assets: cache-first.
    Static,
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    pub static_store: String,
    pub data_store: String,
}

impl StoreNames {
    pub fn for_version(version: &str) -> Self {
        Self {
            static_store: format!("{}-{}", STATIC_STORE_PREFIX, version),
            data_store: format!("{}-{}", DATA_STORE_PREFIX, version),
        }
    }

    pub fn current() -> Self {
        Self::for_version(CACHE_VERSION)
    }

    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_store || name == self.data_store
    }
}

pub fn classify(req: &Request, origin: &Url) -> RequestClass {
    if !req.is_get() {
        return RequestClass::Passthrough;
    }
    let path = req.url.path();
    if DATA_FILES.iter().any(|file| path.contains(file)) {
        return RequestClass::Data;
    }
    let same_origin = req.url.origin() == origin.origin();
    let static_host = req
        .url
        .host_str()
        .map(|host| STATIC_HOSTS.contains(&host))
        .unwrap_or(false);
    if same_origin || static_host {
        RequestClass::Static
    } else {
        RequestClass::Passthrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    fn class_of(target: &str) -> RequestClass {
        classify(&Request::get(&origin(), target).unwrap(), &origin())
    }

    #[test]
    fn data_paths_are_network_first() {
        assert_eq!(class_of("/data.csv"), RequestClass::Data);
        assert_eq!(class_of("/data.csv?t=1"), RequestClass::Data);
        assert_eq!(class_of("/reports/data.csv"), RequestClass::Data);
    }

    #[test]
    fn shell_and_cdn_assets_are_cache_first() {
        assert_eq!(class_of("/style.css"), RequestClass::Static);
        assert_eq!(class_of("https://cdn.jsdelivr.net/npm/chart.js"), RequestClass::Static);
        assert_eq!(class_of("https://fonts.googleapis.com/css2?family=Vazirmatn"), RequestClass::Static);
    }

    #[test]
    fn foreign_hosts_and_writes_pass_through() {
        assert_eq!(class_of("https://example.com/x.js"), RequestClass::Passthrough);
        let post = Request::get(&origin(), "/data.csv").unwrap().with_method("post");
        assert_eq!(classify(&post, &origin()), RequestClass::Passthrough);
    }

    #[test]
    fn store_names_carry_the_version() {
        let names = StoreNames::current();
        assert_eq!(names.static_store, "smart-factory-v1.0.0");
        assert_eq!(names.data_store, "smart-factory-data-v1.0.0");
        assert!(names.is_current("smart-factory-data-v1.0.0"));
        assert!(!names.is_current("smart-factory-v0.9.0"));
    }
}
