//! Structured logging for the dashboard and its cache worker.
//!
//! Every record is a single JSON line:
//! `{ts, seq, lvl, component, event, msg, url?, store?, tag?, data}`.
//! Lines go to stderr; when `LOG_DIR` is set they are also appended to
//! `LOG_DIR/events.jsonl`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_LEVEL").ok().as_deref())
    }

    /// Unset or unrecognised values mean `Info`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("trace") => Level::Trace,
            Some("debug") => Level::Debug,
            Some("warn") => Level::Warn,
            Some("error") => Level::Error,
            Some("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Cache,   // Store lookups, writes, rotation, eviction
    Data,    // Dataset fetch, parse, synthetic fallback
    Sync,    // Background reconciliation
    Message, // Page <-> worker control messages
    Push,    // Notifications
    View,    // Presentation state changes
    System,  // Startup, lifecycle, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Cache => "cache",
            Domain::Data => "data",
            Domain::Sync => "sync",
            Domain::Message => "message",
            Domain::Push => "push",
            Domain::View => "view",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled_in(std::env::var("LOG_DOMAINS").ok().as_deref())
    }

    // filter is a comma-separated list or "all"
    fn enabled_in(&self, filter: Option<&str>) -> bool {
        match filter {
            None | Some("all") => true,
            Some(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static FILE_SINK: OnceLock<Option<Mutex<BufWriter<File>>>> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

fn file_sink() -> Option<&'static Mutex<BufWriter<File>>> {
    FILE_SINK
        .get_or_init(|| open_sink(&PathBuf::from(std::env::var("LOG_DIR").ok()?)))
        .as_ref()
}

/// Appends to `dir/events.jsonl`, creating the directory if needed.
fn open_sink(dir: &Path) -> Option<Mutex<BufWriter<File>>> {
    if let Err(err) = create_dir_all(dir) {
        eprintln!("[log] failed to create log dir: {}", err);
        return None;
    }
    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("events.jsonl"))
    {
        Ok(file) => Some(Mutex::new(BufWriter::new(file))),
        Err(err) => {
            eprintln!("[log] failed to open events log: {}", err);
            None
        }
    }
}

fn write_line(sink: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = sink.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["url", "store", "tag", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = format_record(level, domain, event, fields);
    if let Some(sink) = file_sink() {
        write_line(sink, &line);
    }
    eprintln!("{}", line);
}

fn format_record(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> String {
    let (mut top, data) = split_fields(fields);
    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));

    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain helpers
// =============================================================================

pub fn log_cache(level: Level, event: &str, store: &str, url: &str) {
    log(
        level,
        Domain::Cache,
        event,
        obj(&[("store", v_str(store)), ("url", v_str(url))]),
    );
}

pub fn log_failure(domain: Domain, event: &str, url: &str, err: &dyn std::fmt::Display) {
    log(
        Level::Warn,
        domain,
        event,
        obj(&[("url", v_str(url)), ("error", v_str(&err.to_string()))]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

pub fn v_bool(b: bool) -> Value {
    Value::Bool(b)
}
