//! The cache worker: intercepts every request a page makes and decides
//! how to reconcile network and cache.
//!
//! ```text
//!   page ──fetch──► CacheWorker ──► Data?   network-first ─► data store
//!                        │          Static? cache-first   ─► static store
//!                        │          other   passthrough   ─► network
//!                        └──── mpsc ────► pages (DATA_UPDATED, SW_UPDATED)
//! ```
//!
//! Every lifecycle or background event goes through [`CacheWorker::dispatch`].
//! No handler returns an error: failures are logged and the request falls
//! through to the next available source.

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use url::Url;

use super::clients::Clients;
use super::http::{Destination, Request, Response, SERVED_BY_HEADER};
use super::lifecycle::{Lifecycle, LifecycleEvent, WorkerState};
use super::message::{ClientMessage, PageMessage, Reply, ReplyPort};
use super::network::Fetcher;
use super::notify::{ClickAction, Notification, NotificationCenter, PushPayload, NOTIFICATION_TAG};
use super::policy::{
    classify, RequestClass, StoreNames, APP_SHELL, CACHED_DATA_MAX_AGE_SECS, CLEANUP_JOB,
    DATA_RETENTION, OFFLINE_DOCUMENT, PERIODIC_SYNC_TAG, SYNC_TAG,
};
use super::store::CacheStorage;
use crate::error::{FetchError, StorageError};
use crate::logging::{log, log_cache, log_failure, obj, v_num, v_str, Domain, Level};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub data_path: String,
    pub stores: StoreNames,
    pub periodic_sync_supported: bool,
}

impl WorkerConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            data_path: "/data.csv".to_string(),
            stores: StoreNames::current(),
            periodic_sync_supported: false,
        }
    }
}

pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    PeriodicSync { tag: String },
    Message { data: Value, reply: Option<ReplyPort> },
    Push { data: Option<Vec<u8>> },
    NotificationClick { action: String },
    Cleanup,
}

impl WorkerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Fetch(_) => "fetch",
            WorkerEvent::Sync { .. } => "sync",
            WorkerEvent::PeriodicSync { .. } => "periodicsync",
            WorkerEvent::Message { .. } => "message",
            WorkerEvent::Push { .. } => "push",
            WorkerEvent::NotificationClick { .. } => "notificationclick",
            WorkerEvent::Cleanup => "cleanup",
        }
    }

    /// The event a named timer fires into the worker. `None` for timers
    /// the worker does not own.
    pub fn for_job(job: &str) -> Option<Self> {
        match job {
            CLEANUP_JOB => Some(WorkerEvent::Cleanup),
            PERIODIC_SYNC_TAG => Some(WorkerEvent::PeriodicSync {
                tag: PERIODIC_SYNC_TAG.to_string(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Done,
    Responded(Response),
    /// Not ours; the request goes to the network untouched.
    Passthrough,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

pub struct CacheWorker {
    cfg: WorkerConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Fetcher>,
    clients: Arc<Clients>,
    notifications: NotificationCenter,
    lifecycle: Mutex<Lifecycle>,
}

impl CacheWorker {
    pub fn new(
        cfg: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Fetcher>,
        clients: Arc<Clients>,
    ) -> Self {
        Self {
            cfg,
            storage,
            network,
            clients,
            notifications: NotificationCenter::new(),
            lifecycle: Mutex::new(Lifecycle::new()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.cfg
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle
            .lock()
            .map(|lc| lc.state)
            .unwrap_or(WorkerState::Parsed)
    }

    pub fn navigation_preload(&self) -> bool {
        self.lifecycle
            .lock()
            .map(|lc| lc.navigation_preload)
            .unwrap_or(false)
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.lifecycle.lock().map(|lc| lc.skip_waiting).unwrap_or(false)
    }

    pub fn skip_waiting(&self) {
        if let Ok(mut lc) = self.lifecycle.lock() {
            lc.skip_waiting = true;
        }
    }

    fn transition(&self, event: LifecycleEvent) -> bool {
        let result = match self.lifecycle.lock() {
            Ok(mut lc) => lc.apply(event),
            Err(_) => return false,
        };
        match result {
            Ok((prev, next)) => {
                log(
                    Level::Info,
                    Domain::System,
                    "lifecycle",
                    obj(&[("prev", v_str(prev.as_str())), ("next", v_str(next.as_str()))]),
                );
                true
            }
            Err(err) => {
                log(
                    Level::Error,
                    Domain::System,
                    "lifecycle_rejected",
                    obj(&[("error", v_str(&err.to_string()))]),
                );
                false
            }
        }
    }

    // =========================================================================
    // Dispatch table
    // =========================================================================

    pub async fn dispatch(&self, event: WorkerEvent) -> WorkerOutcome {
        log(
            Level::Debug,
            Domain::System,
            "dispatch",
            obj(&[("kind", v_str(event.kind()))]),
        );
        match event {
            WorkerEvent::Install => {
                self.install().await;
                WorkerOutcome::Done
            }
            WorkerEvent::Activate => {
                self.activate().await;
                WorkerOutcome::Done
            }
            WorkerEvent::Fetch(req) => match self.handle_fetch(&req).await {
                Some(resp) => WorkerOutcome::Responded(resp),
                None => WorkerOutcome::Passthrough,
            },
            WorkerEvent::Sync { tag } => {
                self.handle_sync(&tag).await;
                WorkerOutcome::Done
            }
            WorkerEvent::PeriodicSync { tag } => {
                self.handle_periodic_sync(&tag).await;
                WorkerOutcome::Done
            }
            WorkerEvent::Message { data, reply } => {
                self.handle_message(&data, reply).await;
                WorkerOutcome::Done
            }
            WorkerEvent::Push { data } => {
                self.handle_push(data.as_deref());
                WorkerOutcome::Done
            }
            WorkerEvent::NotificationClick { action } => {
                self.handle_notification_click(&action);
                WorkerOutcome::Done
            }
            WorkerEvent::Cleanup => {
                self.cleanup_data_cache().await;
                WorkerOutcome::Done
            }
        }
    }

    // =========================================================================
    // Install / Activate
    // =========================================================================

    /// Best-effort: a shell resource that cannot be fetched or stored is
    /// logged and skipped; install still completes.
    pub async fn install(&self) -> InstallReport {
        let mut report = InstallReport::default();
        if !self.transition(LifecycleEvent::BeginInstall) {
            return report;
        }
        let store = self.cfg.stores.static_store.clone();
        if let Err(err) = self.storage.open(&store).await {
            log_failure(Domain::Cache, "open_failed", &store, &err);
        }

        let fetches = APP_SHELL.iter().map(|target| self.precache(&store, target));
        for (target, result) in APP_SHELL.iter().zip(join_all(fetches).await) {
            match result {
                Ok(()) => report.cached.push(target.to_string()),
                Err(reason) => {
                    log(
                        Level::Warn,
                        Domain::Cache,
                        "precache_failed",
                        obj(&[("url", v_str(target)), ("error", v_str(&reason))]),
                    );
                    report.failed.push(target.to_string());
                }
            }
        }

        self.skip_waiting();
        self.transition(LifecycleEvent::InstallDone);
        log(
            Level::Info,
            Domain::Cache,
            "installed",
            obj(&[
                ("store", v_str(&store)),
                ("cached", v_num(report.cached.len() as f64)),
                ("failed", v_num(report.failed.len() as f64)),
            ]),
        );
        report
    }

    async fn precache(&self, store: &str, target: &str) -> Result<(), String> {
        let req = Request::get(&self.cfg.origin, target).map_err(|e| e.to_string())?;
        let resp = self.network.fetch(&req).await.map_err(|e| e.to_string())?;
        if !resp.is_success() {
            return Err(format!("status {}", resp.status));
        }
        self.storage
            .put(store, &req.key(), resp)
            .await
            .map_err(|e| e.to_string())
    }

    /// Deletes every store from a previous deployment and claims open
    /// pages. Returns the deleted store names.
    pub async fn activate(&self) -> Vec<String> {
        if !self.transition(LifecycleEvent::BeginActivate) {
            return Vec::new();
        }

        let stale: Vec<String> = match self.storage.store_names().await {
            Ok(names) => names
                .into_iter()
                .filter(|name| !self.cfg.stores.is_current(name))
                .collect(),
            Err(err) => {
                log_failure(Domain::Cache, "enumerate_failed", "", &err);
                Vec::new()
            }
        };
        let results = join_all(stale.iter().map(|name| self.storage.delete_store(name))).await;
        let mut deleted = Vec::new();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(_) => {
                    log_cache(Level::Info, "store_rotated", &name, "");
                    deleted.push(name);
                }
                Err(err) => log_failure(Domain::Cache, "rotate_failed", &name, &err),
            }
        }

        let claimed = self.clients.claim();
        if let Ok(mut lc) = self.lifecycle.lock() {
            lc.navigation_preload = true;
        }
        self.transition(LifecycleEvent::ActivateDone);
        let notified = self.clients.broadcast(&PageMessage::worker_updated());
        log(
            Level::Info,
            Domain::System,
            "activated",
            obj(&[
                ("deleted", v_num(deleted.len() as f64)),
                ("claimed", v_num(claimed as f64)),
                ("notified", v_num(notified as f64)),
            ]),
        );
        deleted
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// `None` means the request is not intercepted.
    pub async fn handle_fetch(&self, req: &Request) -> Option<Response> {
        match classify(req, &self.cfg.origin) {
            RequestClass::Data => Some(self.network_first(req).await),
            RequestClass::Static => Some(self.cache_first(req).await),
            RequestClass::Passthrough => None,
        }
    }

    async fn network_first(&self, req: &Request) -> Response {
        let store = &self.cfg.stores.data_store;
        let key = req.key();
        if let Err(err) = self.storage.open(store).await {
            log_failure(Domain::Cache, "open_failed", store, &err);
        }

        match self.network.fetch(req).await {
            Ok(resp) if resp.is_success() => {
                match self.storage.put(store, &key, resp.clone()).await {
                    Ok(()) => log_cache(Level::Info, "data_refreshed", store, &key),
                    Err(err) => log_failure(Domain::Cache, "put_failed", &key, &err),
                }
                resp
            }
            Ok(resp) => {
                log(
                    Level::Warn,
                    Domain::Data,
                    "data_status",
                    obj(&[("url", v_str(&key)), ("status", v_num(resp.status as f64))]),
                );
                self.cached_data(store, &key).await
            }
            Err(err) => {
                log_failure(Domain::Data, "network_unavailable", &key, &err);
                self.cached_data(store, &key).await
            }
        }
    }

    async fn cached_data(&self, store: &str, key: &str) -> Response {
        match self.storage.get(store, key).await {
            Ok(Some(resp)) => {
                log_cache(Level::Info, "served_from_cache", store, key);
                resp.with_header(SERVED_BY_HEADER, "cache")
            }
            Ok(None) => {
                log_cache(Level::Warn, "data_unavailable", store, key);
                Response::unavailable()
            }
            Err(err) => {
                log_failure(Domain::Cache, "read_failed", key, &err);
                Response::unavailable()
            }
        }
    }

    async fn cache_first(&self, req: &Request) -> Response {
        let key = req.key();
        match self.storage.match_any(&key).await {
            Ok(Some(resp)) => return resp,
            Ok(None) => {}
            Err(err) => log_failure(Domain::Cache, "read_failed", &key, &err),
        }

        match self.network.fetch(req).await {
            Ok(resp) => {
                if resp.status == 200 {
                    let store = &self.cfg.stores.static_store;
                    match self.storage.put(store, &key, resp.clone()).await {
                        Ok(()) => log_cache(Level::Debug, "asset_cached", store, &key),
                        Err(err) => log_failure(Domain::Cache, "put_failed", &key, &err),
                    }
                }
                resp
            }
            Err(err) => {
                log_failure(Domain::Cache, "asset_unavailable", &key, &err);
                self.offline_fallback(req).await
            }
        }
    }

    /// Last resort once cache and network have both failed.
    pub async fn offline_fallback(&self, req: &Request) -> Response {
        if req.is_navigation() {
            if let Ok(shell) = Request::get(&self.cfg.origin, OFFLINE_DOCUMENT) {
                match self.storage.match_any(&shell.key()).await {
                    Ok(Some(resp)) => return resp,
                    Ok(None) => {}
                    Err(err) => log_failure(Domain::Cache, "read_failed", &shell.key(), &err),
                }
            }
            return Response::timeout();
        }
        if req.destination == Destination::Image {
            return Response::placeholder_image();
        }
        Response::timeout()
    }

    // =========================================================================
    // Background reconciliation
    // =========================================================================

    pub async fn handle_sync(&self, tag: &str) -> bool {
        log(Level::Info, Domain::Sync, "sync", obj(&[("tag", v_str(tag))]));
        if tag != SYNC_TAG {
            return false;
        }
        self.sync_data().await
    }

    pub async fn handle_periodic_sync(&self, tag: &str) -> bool {
        if !self.cfg.periodic_sync_supported {
            log(Level::Debug, Domain::Sync, "periodic_sync_unsupported", obj(&[("tag", v_str(tag))]));
            return false;
        }
        log(Level::Info, Domain::Sync, "periodic_sync", obj(&[("tag", v_str(tag))]));
        if tag != PERIODIC_SYNC_TAG {
            return false;
        }
        self.sync_data().await
    }

    /// Re-fetches the data resource, overwrites the data-store entry and
    /// tells every page. Returns whether fresh data was stored.
    pub async fn sync_data(&self) -> bool {
        let req = match Request::get(&self.cfg.origin, &self.cfg.data_path) {
            Ok(req) => req,
            Err(err) => {
                log_failure(Domain::Sync, "sync_failed", &self.cfg.data_path, &err);
                return false;
            }
        };
        let key = req.key();
        let resp = match self.network.fetch(&req).await {
            Ok(resp) if resp.is_success() => resp,
            Ok(resp) => {
                log_failure(Domain::Sync, "sync_failed", &key, &format!("status {}", resp.status));
                return false;
            }
            Err(err) => {
                log_failure(Domain::Sync, "sync_failed", &key, &err);
                return false;
            }
        };
        if let Err(err) = self.storage.put(&self.cfg.stores.data_store, &key, resp).await {
            log_failure(Domain::Sync, "sync_failed", &key, &err);
            return false;
        }
        let notified = self.clients.broadcast(&PageMessage::data_updated());
        log(
            Level::Info,
            Domain::Sync,
            "synced",
            obj(&[("url", v_str(&key)), ("notified", v_num(notified as f64))]),
        );
        true
    }

    // =========================================================================
    // Retention
    // =========================================================================

    /// Keeps the newest `DATA_RETENTION` entries. Returns how many were evicted.
    pub async fn cleanup_data_cache(&self) -> usize {
        let store = &self.cfg.stores.data_store;
        let keys = match self.storage.keys(store).await {
            Ok(keys) => keys,
            Err(err) => {
                log_failure(Domain::Cache, "cleanup_failed", store, &err);
                return 0;
            }
        };
        if keys.len() <= DATA_RETENTION {
            return 0;
        }
        let stale = &keys[..keys.len() - DATA_RETENTION];
        let results = join_all(stale.iter().map(|key| self.storage.delete(store, key))).await;
        let mut evicted = 0;
        for (key, result) in stale.iter().zip(results) {
            match result {
                Ok(true) => evicted += 1,
                Ok(false) => {}
                Err(err) => log_failure(Domain::Cache, "evict_failed", key, &err),
            }
        }
        log(
            Level::Info,
            Domain::Cache,
            "cleanup",
            obj(&[("store", v_str(store)), ("evicted", v_num(evicted as f64))]),
        );
        evicted
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Every message with a reply port gets exactly one reply.
    pub async fn handle_message(&self, data: &Value, reply: Option<ReplyPort>) {
        log(Level::Info, Domain::Message, "message", obj(&[("payload", data.clone())]));
        let outcome = match ClientMessage::parse(data) {
            Some(ClientMessage::SkipWaiting) => {
                self.skip_waiting();
                Reply::ok()
            }
            Some(ClientMessage::CacheData { url, data }) => match self.cache_data(&url, &data).await {
                Ok(()) => Reply::ok(),
                Err(err) => Reply::failed(&err.to_string()),
            },
            None => Reply::ok(),
        };
        if let Some(port) = reply {
            if port.send(outcome).is_err() {
                log(Level::Debug, Domain::Message, "reply_dropped", obj(&[]));
            }
        }
    }

    /// Stores page-supplied CSV under `url` in the data store.
    pub async fn cache_data(&self, url: &str, data: &str) -> Result<(), StorageError> {
        let req = Request::get(&self.cfg.origin, url).map_err(|e| {
            log_failure(Domain::Message, "manual_cache_rejected", url, &e);
            StorageError::InvalidKey(url.to_string())
        })?;
        let resp = Response::ok("text/csv", data.as_bytes().to_vec())
            .with_header("cache-control", &format!("max-age={}", CACHED_DATA_MAX_AGE_SECS));
        let store = &self.cfg.stores.data_store;
        let result = self.storage.put(store, &req.key(), resp).await;
        match &result {
            Ok(()) => log_cache(Level::Info, "data_cached_manually", store, &req.key()),
            Err(err) => log_failure(Domain::Cache, "manual_cache_failed", &req.key(), err),
        }
        result
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub fn handle_push(&self, data: Option<&[u8]>) {
        let notification = Notification::from_push(PushPayload::from_bytes(data));
        log(
            Level::Info,
            Domain::Push,
            "push",
            obj(&[("title", v_str(&notification.title))]),
        );
        self.notifications.show(notification);
    }

    pub fn handle_notification_click(&self, action: &str) {
        log(Level::Info, Domain::Push, "notification_click", obj(&[("action", v_str(action))]));
        self.notifications.close(NOTIFICATION_TAG);
        match ClickAction::parse(action) {
            ClickAction::View => self.clients.open_window("/"),
            ClickAction::Dismiss => {}
            ClickAction::Default => {
                if self.clients.focus("/").is_none() {
                    self.clients.open_window("/");
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for CacheWorker {
    async fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
        match self.handle_fetch(req).await {
            Some(resp) => Ok(resp),
            None => self.network.fetch(req).await,
        }
    }
}
