use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

use super::{payload_digest, FeedError, FeedSource};
use crate::config::FeedConfig;
use crate::logging::log_feed_fetch;

/// Live calendar fetched over HTTP, one attempt per call.
pub struct HttpFeed {
    client: Client,
    url: String,
}

impl HttpFeed {
    pub fn new(cfg: &FeedConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            url: cfg.url.clone(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String, FeedError> {
        let started = Instant::now();
        let resp = match self.client.get(&self.url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                log_feed_fetch(&self.url, None, 0, "", elapsed_ms(started));
                return Err(err.into());
            }
        };

        let status = resp.status();
        if !status.is_success() {
            log_feed_fetch(&self.url, Some(status.as_u16()), 0, "", elapsed_ms(started));
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        log_feed_fetch(
            &self.url,
            Some(status.as_u16()),
            body.len(),
            &payload_digest(&body),
            elapsed_ms(started),
        );
        Ok(body)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Fixed payload, e.g. a saved calendar page.
pub struct StaticFeed {
    name: String,
    payload: String,
}

impl StaticFeed {
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String, FeedError> {
        Ok(self.payload.clone())
    }
}
