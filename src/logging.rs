//! Structured JSON-lines logging.
//!
//! Every record is one JSON object on stdout with a run id, a sequence
//! number, a level, a domain and a free-form `data` object. When the run
//! directory can be created the same lines are appended to
//! `<LOG_DIR>/<run_id>/events.jsonl` (info and above) and `trace.jsonl`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::sentiment::SentimentMap;

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
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
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
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Feed,      // Upstream fetch and extraction
    Sentiment, // Classification and aggregation
    Server,    // Request handling
    Audit,     // Spreadsheet audit rows
    System,    // Startup, config
    Profile,   // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Feed => "feed",
            Domain::Sentiment => "sentiment",
            Domain::Server => "server",
            Domain::Audit => "audit",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static CONSOLE: AtomicU8 = AtomicU8::new(Console::Stdout as u8);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

/// Where each record is echoed besides the run files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout = 0,
    Stderr = 1,
}

pub fn set_console(console: Console) {
    CONSOLE.store(console as u8, Ordering::SeqCst);
}

fn console() -> Console {
    match CONSOLE.load(Ordering::SeqCst) {
        1 => Console::Stderr,
        _ => Console::Stdout,
    }
}

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

type Sink = Mutex<BufWriter<File>>;

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Sink>,
    trace: Option<Sink>,
}

fn open_sink(path: PathBuf) -> Option<Sink> {
    match File::create(&path) {
        Ok(file) => Some(Mutex::new(BufWriter::new(file))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", path.display(), err);
            None
        }
    }
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);

        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
            return RunContext {
                run_id,
                events: None,
                trace: None,
            };
        }

        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        RunContext {
            events: open_sink(run_dir.join("events.jsonl")),
            trace: open_sink(run_dir.join("trace.jsonl")),
            run_id,
        }
    })
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in [
        "authorization",
        "Authorization",
        "access_token",
        "private_key",
        "assertion",
    ] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["currency", "path", "source", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(sink: &Option<Sink>, line: &str) {
    if let Some(writer) = sink {
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
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
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }

    emit_record(level, domain.as_str(), event, fields);
}

fn build_record(
    run_id: &str,
    level: Level,
    component: &str,
    event: &str,
    fields: Map<String, Value>,
) -> Value {
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let line = build_record(&ctx.run_id, level, component, event, fields).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    match console() {
        Console::Stdout => println!("{}", line),
        Console::Stderr => eprintln!("{}", line),
    }
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

/// One upstream fetch attempt. `status` is `None` when no response arrived.
pub fn log_feed_fetch(url: &str, status: Option<u16>, bytes: usize, sha256: &str, elapsed_ms: f64) {
    let ok = matches!(status, Some(s) if (200..300).contains(&s));
    log(
        if ok { Level::Info } else { Level::Error },
        Domain::Feed,
        "fetch",
        obj(&[
            ("source", v_str(url)),
            ("status", status.map(|s| json!(s)).unwrap_or(Value::Null)),
            ("bytes", json!(bytes)),
            ("sha256", v_str(sha256)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

pub fn log_events_parsed(format: &str, count: usize) {
    log(
        Level::Info,
        Domain::Feed,
        "parsed",
        obj(&[("format", v_str(format)), ("events", json!(count))]),
    );
}

pub fn log_event_skipped(currency: &str, impact: &str, reason: &str) {
    log(
        Level::Debug,
        Domain::Sentiment,
        "event_skipped",
        obj(&[
            ("currency", v_str(currency)),
            ("impact", v_str(impact)),
            ("reason", v_str(reason)),
        ]),
    );
}

pub fn log_sentiment(map: &SentimentMap, admitted: usize, skipped: usize) {
    let result: Map<String, Value> = map
        .iter()
        .map(|(code, signal)| (code.to_string(), v_str(signal.as_str())))
        .collect();
    log(
        Level::Info,
        Domain::Sentiment,
        "result",
        obj(&[
            ("admitted", json!(admitted)),
            ("skipped", json!(skipped)),
            ("sentiment", Value::Object(result)),
        ]),
    );
}

pub fn log_request(method: &str, path: &str, status: u16, elapsed_ms: f64) {
    log(
        if status >= 500 { Level::Error } else { Level::Info },
        Domain::Server,
        "request",
        obj(&[
            ("method", v_str(method)),
            ("path", v_str(path)),
            ("status", json!(status)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

pub fn log_audit_result(sink: &str, ok: bool, detail: &str) {
    log(
        if ok { Level::Info } else { Level::Error },
        Domain::Audit,
        "append",
        obj(&[
            ("sink", v_str(sink)),
            ("ok", Value::Bool(ok)),
            ("msg", v_str(detail)),
        ]),
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

// =============================================================================
// Profiling Scope
// =============================================================================

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }

    #[test]
    fn test_console_roundtrip() {
        set_console(Console::Stderr);
        assert_eq!(console(), Console::Stderr);
        set_console(Console::Stdout);
        assert_eq!(console(), Console::Stdout);
    }

    #[test]
    fn test_secrets_redacted() {
        let fields = sanitize_fields(obj(&[
            ("access_token", v_str("ya29.secret")),
            ("assertion", v_str("eyJ...")),
            ("sheet", v_str("Sheet1")),
        ]));
        assert_eq!(fields.get("access_token").unwrap(), "[REDACTED]");
        assert_eq!(fields.get("assertion").unwrap(), "[REDACTED]");
        assert_eq!(fields.get("sheet").unwrap(), "Sheet1");
    }

    #[test]
    fn test_record_layout() {
        let record = build_record(
            "r-test",
            Level::Warn,
            "feed",
            "fetch",
            obj(&[
                ("source", v_str("https://example.com")),
                ("msg", v_str("slow")),
                ("bytes", json!(10)),
            ]),
        );
        assert_eq!(record["run_id"], "r-test");
        assert_eq!(record["lvl"], "WARN");
        assert_eq!(record["component"], "feed");
        assert_eq!(record["msg"], "slow");
        assert_eq!(record["source"], "https://example.com");
        assert_eq!(record["data"]["bytes"], 10);
        assert!(record["data"].get("source").is_none());
    }
}
