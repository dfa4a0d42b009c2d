//! Lifecycle, rotation, retention, messaging and notification handlers,
//! each driven through the dispatch table.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use url::Url;

use smartfactory::cache::clients::Clients;
use smartfactory::cache::http::{Request, Response};
use smartfactory::cache::lifecycle::WorkerState;
use smartfactory::cache::message::{PageMessage, Reply};
use smartfactory::cache::network::ScriptedFetcher;
use smartfactory::cache::notify::NOTIFICATION_TAG;
use smartfactory::cache::policy::{
    StoreNames, APP_SHELL, CLEANUP_INTERVAL, CLEANUP_JOB, DATA_RETENTION, PERIODIC_SYNC_TAG, SYNC_TAG,
};
use smartfactory::cache::store::{CacheStorage, MemoryCacheStorage};
use smartfactory::cache::{CacheWorker, WorkerConfig, WorkerEvent, WorkerOutcome};
use smartfactory::schedule::{spawn_repeating, Scheduler};

struct Rig {
    worker: CacheWorker,
    net: Arc<ScriptedFetcher>,
    store: Arc<MemoryCacheStorage>,
    clients: Arc<Clients>,
    origin: Url,
    stores: StoreNames,
}

fn rig_with(periodic_sync: bool) -> Rig {
    let origin = Url::parse("http://localhost:8080/").unwrap();
    let net = Arc::new(ScriptedFetcher::new());
    let store = Arc::new(MemoryCacheStorage::new());
    let clients = Arc::new(Clients::new());
    let mut cfg = WorkerConfig::new(origin.clone());
    cfg.periodic_sync_supported = periodic_sync;
    let stores = cfg.stores.clone();
    let worker = CacheWorker::new(cfg, store.clone(), net.clone(), clients.clone());
    Rig {
        worker,
        net,
        store,
        clients,
        origin,
        stores,
    }
}

fn rig() -> Rig {
    rig_with(false)
}

impl Rig {
    fn key(&self, target: &str) -> String {
        Request::get(&self.origin, target).unwrap().key()
    }

    fn route_shell(&self) {
        for target in APP_SHELL {
            self.net.route(&self.key(target), Response::ok("text/plain", target));
        }
    }

    async fn message(&self, data: serde_json::Value) -> Reply {
        let (tx, rx) = oneshot::channel();
        let outcome = self
            .worker
            .dispatch(WorkerEvent::Message {
                data,
                reply: Some(tx),
            })
            .await;
        assert_eq!(outcome, WorkerOutcome::Done);
        rx.await.unwrap()
    }
}

#[tokio::test]
async fn install_caches_shell_best_effort() {
    let rig = rig();
    rig.route_shell();
    rig.net.remove_route(&rig.key("/manifest.json"));

    let report = rig.worker.install().await;
    assert_eq!(report.cached.len(), APP_SHELL.len() - 1);
    assert_eq!(report.failed, vec!["/manifest.json".to_string()]);
    assert_eq!(rig.worker.state(), WorkerState::Installed);

    let keys = rig.store.keys(&rig.stores.static_store).await.unwrap();
    assert_eq!(keys.len(), APP_SHELL.len() - 1);
    assert!(keys.contains(&rig.key("/index.html")));
}

#[tokio::test]
async fn install_completes_fully_offline() {
    let rig = rig();
    rig.net.set_offline(true);
    rig.worker.dispatch(WorkerEvent::Install).await;
    assert_eq!(rig.worker.state(), WorkerState::Installed);
}

#[tokio::test]
async fn activate_rotates_old_stores_and_claims_pages() {
    let rig = rig();
    let old = StoreNames::for_version("v0.9.0");
    for store in [&old.static_store, &old.data_store, &rig.stores.static_store] {
        rig.store.put(store, "http://localhost:8080/", Response::ok("text/html", "x")).await.unwrap();
    }
    let (page, mut rx) = rig.clients.register("/");

    rig.worker.dispatch(WorkerEvent::Install).await;
    rig.worker.dispatch(WorkerEvent::Activate).await;

    let names = rig.store.store_names().await.unwrap();
    assert!(names.iter().all(|n| rig.stores.is_current(n)), "left: {:?}", names);
    assert!(!names.contains(&old.data_store));
    assert_eq!(rig.worker.state(), WorkerState::Activated);
    assert!(rig.worker.navigation_preload());
    assert!(rig.clients.is_controlled(page));
    assert_eq!(rx.try_recv().unwrap(), PageMessage::worker_updated());
}

#[tokio::test]
async fn activate_before_install_is_ignored() {
    let rig = rig();
    assert!(rig.worker.activate().await.is_empty());
    assert_eq!(rig.worker.state(), WorkerState::Parsed);
}

#[tokio::test]
async fn cleanup_keeps_ten_newest_entries() {
    let rig = rig();
    for i in 0..14 {
        let key = rig.key(&format!("/data.csv?t={}", i));
        rig.store
            .put(&rig.stores.data_store, &key, Response::ok("text/csv", "x"))
            .await
            .unwrap();
    }

    assert_eq!(rig.worker.cleanup_data_cache().await, 4);
    let keys = rig.store.keys(&rig.stores.data_store).await.unwrap();
    assert_eq!(keys.len(), DATA_RETENTION);
    assert_eq!(keys[0], rig.key("/data.csv?t=4"));
    assert_eq!(keys[9], rig.key("/data.csv?t=13"));

    assert_eq!(rig.worker.cleanup_data_cache().await, 0);
}

#[tokio::test]
async fn cleanup_under_bound_or_failing_storage_is_noop() {
    let rig = rig();
    rig.store
        .put(&rig.stores.data_store, &rig.key("/data.csv"), Response::ok("text/csv", "x"))
        .await
        .unwrap();
    assert_eq!(rig.worker.dispatch(WorkerEvent::Cleanup).await, WorkerOutcome::Done);
    assert_eq!(rig.store.keys(&rig.stores.data_store).await.unwrap().len(), 1);

    rig.store.set_failing(true);
    assert_eq!(rig.worker.cleanup_data_cache().await, 0);
}

#[tokio::test(start_paused = true)]
async fn hourly_timer_trims_data_store() {
    let origin = Url::parse("http://localhost:8080/").unwrap();
    let store = Arc::new(MemoryCacheStorage::new());
    let cfg = WorkerConfig::new(origin);
    let data_store = cfg.stores.data_store.clone();
    let worker = Arc::new(CacheWorker::new(
        cfg,
        store.clone(),
        Arc::new(ScriptedFetcher::new()),
        Arc::new(Clients::new()),
    ));
    for i in 0..12 {
        let key = format!("http://localhost:8080/data.csv?t={}", i);
        store.put(&data_store, &key, Response::ok("text/csv", "x")).await.unwrap();
    }

    let timer_worker = worker.clone();
    let _cleanup = spawn_repeating(CLEANUP_INTERVAL, move || {
        let worker = timer_worker.clone();
        async move {
            if let Some(event) = WorkerEvent::for_job(CLEANUP_JOB) {
                worker.dispatch(event).await;
            }
        }
    });

    tokio::time::sleep(CLEANUP_INTERVAL - Duration::from_secs(1)).await;
    assert_eq!(store.keys(&data_store).await.unwrap().len(), 12);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let keys = store.keys(&data_store).await.unwrap();
    assert_eq!(keys.len(), DATA_RETENTION);
    assert_eq!(keys[0], "http://localhost:8080/data.csv?t=2");
}

#[tokio::test]
async fn stepped_timers_drive_cleanup_and_periodic_sync() {
    let rig = rig_with(true);
    rig.net.route(&rig.key("/data.csv"), Response::ok("text/csv", "fresh"));
    for i in 0..12 {
        let key = rig.key(&format!("/data.csv?t={}", i));
        rig.store
            .put(&rig.stores.data_store, &key, Response::ok("text/csv", "x"))
            .await
            .unwrap();
    }

    let mut timers = Scheduler::new();
    timers.every(CLEANUP_JOB, CLEANUP_INTERVAL);
    timers.every(PERIODIC_SYNC_TAG, Duration::from_secs(30));

    let mut fired = Vec::new();
    for _ in 0..CLEANUP_INTERVAL.as_secs() {
        for job in timers.advance(Duration::from_secs(1)) {
            if let Some(event) = WorkerEvent::for_job(&job) {
                rig.worker.dispatch(event).await;
            }
            fired.push(job);
        }
    }

    assert_eq!(fired.iter().filter(|j| j.as_str() == CLEANUP_JOB).count(), 1);
    assert_eq!(fired.iter().filter(|j| j.as_str() == PERIODIC_SYNC_TAG).count(), 120);
    let keys = rig.store.keys(&rig.stores.data_store).await.unwrap();
    assert_eq!(keys.len(), DATA_RETENTION);
    assert_eq!(keys.last(), Some(&rig.key("/data.csv")));
    assert!(WorkerEvent::for_job("page-refresh").is_none());
}

#[tokio::test]
async fn skip_waiting_message_is_recorded() {
    let rig = rig();
    assert!(!rig.worker.skip_waiting_requested());
    assert!(rig.message(json!({"type": "SKIP_WAITING"})).await.success);
    assert!(rig.worker.skip_waiting_requested());
}

#[tokio::test]
async fn every_message_gets_one_reply() {
    let rig = rig();
    assert!(rig.message(json!({"type": "SKIP_WAITING"})).await.success);
    assert!(rig.message(json!({"type": "PING"})).await.success);
    assert!(rig.message(json!(42)).await.success);

    rig.worker
        .dispatch(WorkerEvent::Message {
            data: json!({"type": "SKIP_WAITING"}),
            reply: None,
        })
        .await;
}

#[tokio::test]
async fn cache_data_message_stores_with_max_age() {
    let rig = rig();
    let reply = rig
        .message(json!({"type": "CACHE_DATA", "url": "/data.csv", "data": "Date,Time\n1,2"}))
        .await;
    assert_eq!(reply, Reply::ok());
    assert_eq!(reply.kind, "RESPONSE");

    let stored = rig
        .store
        .get(&rig.stores.data_store, &rig.key("/data.csv"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.text(), "Date,Time\n1,2");
    assert_eq!(stored.header("cache-control"), Some("max-age=300"));
    assert_eq!(stored.header("content-type"), Some("text/csv"));
}

#[tokio::test]
async fn cache_data_failure_still_replies() {
    let rig = rig();
    rig.store.set_failing(true);
    let reply = rig
        .message(json!({"type": "CACHE_DATA", "url": "/data.csv", "data": "x"}))
        .await;
    assert!(!reply.success);
    assert_eq!(reply.kind, "RESPONSE");
}

#[tokio::test]
async fn cache_data_with_unparseable_url_reports_bad_key() {
    let rig = rig();
    let reply = rig
        .message(json!({"type": "CACHE_DATA", "url": "http://[bad", "data": "x"}))
        .await;
    assert!(!reply.success);
    assert_eq!(reply.message, "invalid cache key: http://[bad");
    assert!(rig.store.store_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn sync_refreshes_data_and_notifies_pages() {
    let rig = rig();
    let (_a, mut rx_a) = rig.clients.register("/");
    let (_b, mut rx_b) = rig.clients.register("/");
    rig.net.route(&rig.key("/data.csv"), Response::ok("text/csv", "fresh"));

    rig.worker.dispatch(WorkerEvent::Sync { tag: SYNC_TAG.to_string() }).await;

    let stored = rig
        .store
        .get(&rig.stores.data_store, &rig.key("/data.csv"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.text(), "fresh");
    assert_eq!(rx_a.try_recv().unwrap(), PageMessage::data_updated());
    assert_eq!(rx_b.try_recv().unwrap(), PageMessage::data_updated());
}

#[tokio::test]
async fn sync_ignores_unknown_tags_and_failures() {
    let rig = rig();
    let (_page, mut rx) = rig.clients.register("/");
    rig.net.route(&rig.key("/data.csv"), Response::ok("text/csv", "fresh"));
    assert!(!rig.worker.handle_sync("other-tag").await);

    rig.net.set_offline(true);
    assert!(!rig.worker.handle_sync(SYNC_TAG).await);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn periodic_sync_requires_platform_support() {
    let unsupported = rig();
    unsupported.net.route(&unsupported.key("/data.csv"), Response::ok("text/csv", "x"));
    assert!(!unsupported.worker.handle_periodic_sync(PERIODIC_SYNC_TAG).await);
    assert!(unsupported.net.calls().is_empty());

    let supported = rig_with(true);
    supported.net.route(&supported.key("/data.csv"), Response::ok("text/csv", "x"));
    assert!(supported.worker.handle_periodic_sync(PERIODIC_SYNC_TAG).await);
    assert!(!supported.worker.handle_periodic_sync(SYNC_TAG).await);
}

#[tokio::test]
async fn push_then_click_view_opens_root() {
    let rig = rig();
    rig.worker
        .dispatch(WorkerEvent::Push {
            data: Some(br#"{"title":"Gas alarm","body":"Line 3"}"#.to_vec()),
        })
        .await;
    let shown = rig.worker.notifications().shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Gas alarm");
    assert_eq!(shown[0].tag, NOTIFICATION_TAG);

    rig.worker
        .dispatch(WorkerEvent::NotificationClick { action: "view".to_string() })
        .await;
    assert!(rig.worker.notifications().shown().is_empty());
    assert_eq!(rig.clients.opened_windows(), vec!["/".to_string()]);
}

#[tokio::test]
async fn click_dismiss_and_default() {
    let rig = rig();
    rig.worker.handle_push(None);
    rig.worker.handle_notification_click("dismiss");
    assert!(rig.worker.notifications().shown().is_empty());
    assert!(rig.clients.opened_windows().is_empty());

    rig.worker.handle_notification_click("");
    assert_eq!(rig.clients.opened_windows(), vec!["/".to_string()]);

    let (page, _rx) = rig.clients.register("/");
    rig.worker.handle_notification_click("");
    assert!(rig.clients.is_focused(page));
    assert_eq!(rig.clients.opened_windows().len(), 1);
}
