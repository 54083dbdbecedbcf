//! Minimal HTTP/1.1 front end.
//!
//! Connections are accepted and answered strictly one after another, so
//! every request runs its own fetch-classify cycle with nothing shared.
//!
//! Endpoints:
//!   GET /                    - liveness text
//!   GET /summary.txt         - plain-text sentiment (also appends an audit row)
//!   GET /ForexSentiment.csv  - CSV attachment

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::audit::{record_best_effort, AuditSink};
use crate::feed::{FeedFormat, FeedSource};
use crate::logging::{log, log_request, obj, v_str, Domain, Level};
use crate::pipeline::snapshot;
use crate::render::{csv_disposition, render_csv, render_text};

pub const HOME_BODY: &str = "Forex Sentiment API is running!";
pub const ERROR_BODY: &str = "Internal Server Error";

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_LINE_BYTES: u64 = 8 * 1024;
const MAX_HEADER_LINES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl Response {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            headers: Vec::new(),
            body: body.into(),
        }
    }

    fn server_error() -> Self {
        Self::text(500, ERROR_BODY)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }

    pub fn to_http(&self) -> String {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\n",
            self.status,
            self.reason(),
            self.content_type
        );
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.body.len(),
            self.body
        ));
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Home,
    Summary,
    Csv,
}

fn route(path: &str) -> Option<Route> {
    let path = path.split('?').next().unwrap_or(path);
    match path {
        "/" => Some(Route::Home),
        "/summary.txt" => Some(Route::Summary),
        "/ForexSentiment.csv" => Some(Route::Csv),
        _ => None,
    }
}

/// Request handler with its collaborators, built once at startup.
pub struct App {
    feed: Box<dyn FeedSource>,
    format: FeedFormat,
    audit: Box<dyn AuditSink>,
    read_timeout: Duration,
}

impl App {
    pub fn new(feed: Box<dyn FeedSource>, format: FeedFormat, audit: Box<dyn AuditSink>) -> Self {
        Self {
            feed,
            format,
            audit,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Deadline for a client to deliver its request line and headers.
    /// A client that misses it is dropped without a response.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub async fn handle(&self, method: &str, path: &str) -> Response {
        self.handle_at(method, path, Utc::now()).await
    }

    /// Dispatch one request as of `now` (used for the summary header and audit row).
    pub async fn handle_at(&self, method: &str, path: &str, now: DateTime<Utc>) -> Response {
        let Some(route) = route(path) else {
            return Response::text(404, "Not Found");
        };
        if !method.eq_ignore_ascii_case("GET") {
            return Response::text(405, "Method Not Allowed");
        }

        match route {
            Route::Home => Response::text(200, HOME_BODY),
            Route::Summary => self.summary(path, now).await,
            Route::Csv => self.csv(path).await,
        }
    }

    async fn summary(&self, path: &str, now: DateTime<Utc>) -> Response {
        let map = match snapshot(self.feed.as_ref(), self.format).await {
            Ok(map) => map,
            Err(err) => return failed(path, &err),
        };
        record_best_effort(self.audit.as_ref(), &map, now).await;
        Response::text(200, render_text(&map, now))
    }

    async fn csv(&self, path: &str) -> Response {
        let map = match snapshot(self.feed.as_ref(), self.format).await {
            Ok(map) => map,
            Err(err) => return failed(path, &err),
        };
        match render_csv(&map) {
            Ok(body) => Response {
                status: 200,
                content_type: "text/csv; charset=utf-8",
                headers: vec![("Content-Disposition", csv_disposition())],
                body,
            },
            Err(err) => failed(path, &*err),
        }
    }
}

fn failed(path: &str, err: &(dyn std::error::Error + 'static)) -> Response {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    log(
        Level::Error,
        Domain::Server,
        "request_failed",
        obj(&[("path", v_str(path)), ("msg", v_str(&chain))]),
    );
    Response::server_error()
}

/// One line of at most `MAX_LINE_BYTES`. `None` when the line is cut off
/// by the cap or by the peer closing early.
async fn read_capped_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    (&mut *reader).take(MAX_LINE_BYTES).read_line(&mut line).await?;
    Ok(line.ends_with('\n').then_some(line))
}

/// Read the request line and skip the headers; bodies are never needed.
async fn read_request(stream: &mut TcpStream) -> Result<Option<(String, String)>> {
    let mut reader = BufReader::new(stream);
    let Some(line) = read_capped_line(&mut reader).await? else {
        return Ok(None);
    };
    let mut parts = line.split_whitespace();
    let (method, path) = match (parts.next(), parts.next()) {
        (Some(m), Some(p)) => (m.to_string(), p.to_string()),
        _ => return Ok(None),
    };

    for _ in 0..MAX_HEADER_LINES {
        match read_capped_line(&mut reader).await? {
            Some(header) if header.trim().is_empty() => return Ok(Some((method, path))),
            Some(_) => {}
            None => return Ok(None),
        }
    }
    Ok(None)
}

async fn handle_connection(app: &App, mut stream: TcpStream) -> Result<()> {
    let started = Instant::now();
    let request = match timeout(app.read_timeout, read_request(&mut stream)).await {
        Ok(read) => read?,
        Err(_) => {
            log(
                Level::Warn,
                Domain::Server,
                "read_timeout",
                obj(&[("timeout_ms", json!(app.read_timeout.as_millis() as u64))]),
            );
            return Ok(());
        }
    };
    let response = match request {
        Some((method, path)) => {
            let response = app.handle(&method, &path).await;
            log_request(
                &method,
                &path,
                response.status,
                started.elapsed().as_secs_f64() * 1000.0,
            );
            response
        }
        None => Response::text(400, "Bad Request"),
    };
    stream.write_all(response.to_http().as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Serve until the listener fails. Connection errors are logged and skipped.
pub async fn serve(listener: TcpListener, app: App) -> Result<()> {
    let addr = listener.local_addr()?;
    log(
        Level::Info,
        Domain::Server,
        "listening",
        obj(&[("addr", v_str(&addr.to_string()))]),
    );
    loop {
        let (stream, peer) = listener.accept().await?;
        if let Err(err) = handle_connection(&app, stream).await {
            log(
                Level::Warn,
                Domain::Server,
                "connection_error",
                obj(&[("peer", v_str(&peer.to_string())), ("msg", v_str(&format!("{:#}", err)))]),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditRow, NullSink};
    use crate::feed::{FeedError, StaticFeed};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    const XML: &str = "<weeklyevents>\
        <event><country>USD</country><impact>High</impact><actual>2.5%</actual><forecast>2.0%</forecast></event>\
        <event><country>EUR</country><impact>Medium</impact><actual>0.1</actual><forecast>0.4</forecast></event>\
        </weeklyevents>";

    struct DownFeed;

    #[async_trait]
    impl FeedSource for DownFeed {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(&self) -> Result<String, FeedError> {
            Err(FeedError::Status(503))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        rows: Arc<Mutex<Vec<AuditRow>>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn append(&self, row: &AuditRow) -> Result<()> {
            self.rows.lock().unwrap().push(row.clone());
            Ok(())
        }
    }

    fn app_with(feed: Box<dyn FeedSource>) -> App {
        App::new(feed, FeedFormat::Xml, Box::new(NullSink))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 7, 14, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_home() {
        let app = app_with(Box::new(DownFeed));
        let resp = app.handle("GET", "/").await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, HOME_BODY);
    }

    #[tokio::test]
    async fn test_summary_text() {
        let app = app_with(Box::new(StaticFeed::new("fixture", XML)));
        let resp = app.handle_at("GET", "/summary.txt", now()).await;
        assert_eq!(resp.status, 200);
        assert!(resp.body.starts_with("Date: 2024-06-07 14:00 GMT\n\n"));
        assert!(resp.body.contains("USD - Bullish"));
        assert!(resp.body.contains("EUR - Bearish"));
        assert!(resp.body.contains("CAD - Neutral"));
    }

    #[tokio::test]
    async fn test_csv_attachment() {
        let app = app_with(Box::new(StaticFeed::new("fixture", XML)));
        let resp = app.handle("GET", "/ForexSentiment.csv").await;
        assert_eq!(resp.status, 200);
        assert!(resp.content_type.starts_with("text/csv"));
        assert_eq!(
            resp.header("content-disposition"),
            Some("attachment; filename=ForexSentiment.csv")
        );
        assert!(resp.body.starts_with("Currency,Sentiment\r\nUSD,Bullish\r\nEUR,Bearish\r\n"));
    }

    #[tokio::test]
    async fn test_feed_failure_is_generic_500() {
        let app = app_with(Box::new(DownFeed));
        for path in ["/summary.txt", "/ForexSentiment.csv"] {
            let resp = app.handle("GET", path).await;
            assert_eq!(resp.status, 500);
            assert_eq!(resp.body, ERROR_BODY);
            assert!(!resp.body.contains("USD"));
        }
    }

    #[tokio::test]
    async fn test_summary_appends_audit_row_csv_does_not() {
        let sink = RecordingSink::default();
        let rows = sink.rows.clone();
        let app = App::new(
            Box::new(StaticFeed::new("fixture", XML)),
            FeedFormat::Xml,
            Box::new(sink),
        );

        app.handle_at("GET", "/summary.txt", now()).await;
        app.handle("GET", "/ForexSentiment.csv").await;

        let rows = rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, "2024-06-07 14:00:00");
        assert_eq!(rows[0].values[0], "Bullish");
        assert_eq!(rows[0].values[1], "Bearish");
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let app = app_with(Box::new(DownFeed));
        assert_eq!(app.handle("GET", "/nope").await.status, 404);
        assert_eq!(app.handle("POST", "/summary.txt").await.status, 405);
        assert_eq!(app.handle("GET", "/summary.txt?x=1").await.status, 500);
    }

    #[test]
    fn test_wire_format() {
        let resp = Response::text(200, "hi");
        assert_eq!(
            resp.to_http(),
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi"
        );
    }
}
