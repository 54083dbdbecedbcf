//! Upstream calendar feed: fetching and per-format event extraction.
//!
//! Every format produces the same [`RawEvent`] records so the sentiment
//! core never sees markup.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod events;
mod html;
mod http;
mod xml;

pub use events::RawEvent;
pub use http::{HttpFeed, StaticFeed};

/// Terminal failures for one request. Per-event problems never surface here.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(u16),
    #[error("feed payload is not a parseable calendar: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// Calendar web page, one `tr.calendar__row` per event.
    Html,
    /// XML export, one `<event>` element per event.
    Xml,
}

impl FeedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFormat::Html => "html",
            FeedFormat::Xml => "xml",
        }
    }

    /// Best guess from a feed location: `.xml` paths are XML, all else HTML.
    pub fn infer(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        if path.to_lowercase().ends_with(".xml") {
            FeedFormat::Xml
        } else {
            FeedFormat::Html
        }
    }
}

impl FromStr for FeedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(FeedFormat::Html),
            "xml" => Ok(FeedFormat::Xml),
            other => Err(format!("unknown feed format: {}", other)),
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of one raw feed payload per call.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<String, FeedError>;
}

/// Extract calendar events from a payload of the given format.
pub fn parse_events(format: FeedFormat, payload: &str) -> Result<Vec<RawEvent>, FeedError> {
    match format {
        FeedFormat::Html => html::parse(payload),
        FeedFormat::Xml => xml::parse(payload),
    }
}

/// Hex SHA-256 of a payload, logged with each fetch.
pub fn payload_digest(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}
