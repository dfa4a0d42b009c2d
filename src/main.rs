use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use smartfactory::cache::clients::Clients;
use smartfactory::cache::message::PageMessage;
use smartfactory::cache::network::{Fetcher, HttpFetcher};
use smartfactory::cache::policy::{CLEANUP_INTERVAL, CLEANUP_JOB, PERIODIC_SYNC_TAG};
use smartfactory::cache::store::CacheStorage;
use smartfactory::cache::{CacheWorker, WorkerEvent};
use smartfactory::data::DataSource;
use smartfactory::logging::{log, obj, ts_epoch_ms, v_bool, v_num, v_str, Domain, Level};
use smartfactory::schedule::{spawn_repeating, Scheduler};
use smartfactory::state::Config;
use smartfactory::storage::SqliteCacheStorage;
use smartfactory::view::app::LOAD_FAILED_MESSAGE;
use smartfactory::view::{AppState, DashboardSnapshot, UiEvent};

const PAGE_REFRESH_JOB: &str = "page-refresh";
/// Wall-clock step fed into the timer schedule and the banner expiry.
const CLOCK_PERIOD: Duration = Duration::from_secs(1);

async fn reload(source: &DataSource, app: &mut AppState) {
    match source.load_dataset().await {
        Ok(dataset) => app.dispatch(UiEvent::DataUpdated(dataset)),
        Err(err) => {
            log(
                Level::Error,
                Domain::View,
                "load_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            app.dispatch(UiEvent::LoadFailed(LOAD_FAILED_MESSAGE.to_string()));
        }
    }
}

fn render(app: &mut AppState) -> Result<()> {
    let redraw = app.take_redraw();
    let snapshot = DashboardSnapshot::from_state(app);
    log(
        Level::Debug,
        Domain::View,
        "render",
        obj(&[
            ("charts", v_num(redraw.len() as f64)),
            ("overall", v_str(snapshot.overall().as_str())),
        ]),
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let worker_cfg = cfg
        .worker_config()
        .with_context(|| format!("invalid DASH_ORIGIN {}", cfg.origin))?;

    let storage = SqliteCacheStorage::new(&cfg.cache_db)
        .with_context(|| format!("opening cache db {}", cfg.cache_db))?;
    storage.init()?;
    let storage: Arc<dyn CacheStorage> = Arc::new(storage);
    let network: Arc<dyn Fetcher> = Arc::new(
        HttpFetcher::new(cfg.fetch_timeout_secs).context("building http client")?,
    );
    let clients = Arc::new(Clients::new());
    let (_page, mut page_rx) = clients.register("/");

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("origin", v_str(&cfg.origin)),
            ("cache_db", v_str(&cfg.cache_db)),
            ("refresh", v_bool(cfg.refresh_enabled)),
            ("periodic_sync", v_bool(cfg.periodic_sync)),
        ]),
    );

    let worker = Arc::new(CacheWorker::new(worker_cfg.clone(), storage, network, clients));
    worker.dispatch(WorkerEvent::Install).await;
    worker.dispatch(WorkerEvent::Activate).await;

    let source = DataSource::new(worker.clone(), worker_cfg.origin.clone(), &cfg.data_path);
    let mut app = AppState::new();
    app.dispatch(UiEvent::Tick(ts_epoch_ms()));
    reload(&source, &mut app).await;
    render(&mut app)?;

    if cfg.run_once {
        return Ok(());
    }

    let mut timers = Scheduler::new();
    timers.every(CLEANUP_JOB, CLEANUP_INTERVAL);
    if cfg.periodic_sync {
        timers.every(PERIODIC_SYNC_TAG, Duration::from_secs(cfg.refresh_secs));
    }
    if cfg.refresh_enabled {
        timers.every(PAGE_REFRESH_JOB, Duration::from_secs(cfg.refresh_secs));
    }

    let (tick_tx, mut tick_rx) = mpsc::channel::<Instant>(1);
    let _clock = spawn_repeating(CLOCK_PERIOD, move || {
        let tx = tick_tx.clone();
        async move {
            // A full channel means the loop is still busy; the next tick
            // carries the elapsed time.
            let _ = tx.try_send(Instant::now());
        }
    });
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            msg = page_rx.recv() => match msg {
                Some(PageMessage::DataUpdated { message }) => {
                    log(Level::Info, Domain::View, "page_message", obj(&[("msg", v_str(&message))]));
                    reload(&source, &mut app).await;
                    render(&mut app)?;
                }
                Some(PageMessage::WorkerUpdated { message }) => {
                    log(Level::Info, Domain::View, "page_message", obj(&[("msg", v_str(&message))]));
                }
                None => break,
            },
            Some(now) = tick_rx.recv() => {
                let elapsed = now.saturating_duration_since(last_tick);
                last_tick = now;
                for job in timers.advance(elapsed) {
                    if job == PAGE_REFRESH_JOB {
                        reload(&source, &mut app).await;
                        render(&mut app)?;
                    } else if let Some(event) = WorkerEvent::for_job(&job) {
                        worker.dispatch(event).await;
                    }
                }

                let had_banner = app.banner.is_some();
                app.dispatch(UiEvent::Tick(ts_epoch_ms()));
                if had_banner && app.banner.is_none() {
                    render(&mut app)?;
                }
            }
        }
    }

    log(Level::Info, Domain::System, "shutdown", obj(&[]));
    Ok(())
}
