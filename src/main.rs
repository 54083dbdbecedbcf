use anyhow::{Context, Result};
use std::time::Duration;
use tokio::net::TcpListener;

use fxsentiment::audit::build_sink;
use fxsentiment::config::Config;
use fxsentiment::feed::HttpFeed;
use fxsentiment::logging::{log, obj, v_str, Domain, Level};
use fxsentiment::server::{serve, App};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("source", v_str(&cfg.feed.url)),
            ("format", v_str(cfg.feed.format.as_str())),
            ("port", json!(cfg.port)),
            ("audit_enabled", json!(cfg.audit.enabled())),
        ]),
    );

    let feed = HttpFeed::new(&cfg.feed).context("building feed client")?;
    let audit = build_sink(&cfg.audit);
    let app = App::new(Box::new(feed), cfg.feed.format, audit)
        .with_read_timeout(Duration::from_secs(cfg.read_timeout_secs));

    let listener = TcpListener::bind((cfg.bind_addr.as_str(), cfg.port))
        .await
        .with_context(|| format!("binding {}:{}", cfg.bind_addr, cfg.port))?;
    serve(listener, app).await
}
