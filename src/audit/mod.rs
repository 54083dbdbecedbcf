//! Best-effort audit trail: one spreadsheet row per rendered summary.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::AuditConfig;
use crate::logging::{log, log_audit_result, obj, v_str, Domain, Level};
use crate::sentiment::SentimentMap;

pub mod sheets;

pub use sheets::SheetsSink;

/// Timestamp plus one sentiment per tracked currency, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub timestamp: String,
    pub values: Vec<String>,
}

impl AuditRow {
    pub fn new(map: &SentimentMap, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            values: map.tracked().map(|(_, s)| s.to_string()).collect(),
        }
    }

    pub fn cells(&self) -> Vec<String> {
        std::iter::once(self.timestamp.clone())
            .chain(self.values.iter().cloned())
            .collect()
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn append(&self, row: &AuditRow) -> Result<()>;
}

/// Used when no credentials are configured; records nothing.
pub struct NullSink;

#[async_trait]
impl AuditSink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn append(&self, _row: &AuditRow) -> Result<()> {
        log(
            Level::Warn,
            Domain::Audit,
            "skipped",
            obj(&[("msg", v_str("no service account credentials"))]),
        );
        Ok(())
    }
}

/// Sheets sink when credentials are present and usable, otherwise [`NullSink`].
pub fn build_sink(cfg: &AuditConfig) -> Box<dyn AuditSink> {
    let Some(account) = cfg.credentials.clone() else {
        return Box::new(NullSink);
    };
    match SheetsSink::new(account, &cfg.sheet_id, &cfg.sheet_range, &cfg.api_base) {
        Ok(sink) => {
            log(
                Level::Info,
                Domain::Audit,
                "sink_ready",
                obj(&[("sink", v_str("sheets")), ("sheet_id", v_str(&cfg.sheet_id))]),
            );
            Box::new(sink)
        }
        Err(err) => {
            log(
                Level::Warn,
                Domain::Audit,
                "sink_disabled",
                obj(&[("msg", v_str(&format!("{:#}", err)))]),
            );
            Box::new(NullSink)
        }
    }
}

/// Append one row, swallowing any failure. Returns whether it succeeded.
pub async fn record_best_effort(sink: &dyn AuditSink, map: &SentimentMap, now: DateTime<Utc>) -> bool {
    let row = AuditRow::new(map, now);
    match sink.append(&row).await {
        Ok(()) => {
            log_audit_result(sink.name(), true, "row appended");
            true
        }
        Err(err) => {
            log_audit_result(sink.name(), false, &format!("{:#}", err));
            false
        }
    }
}
