//! Live-feed path against an in-process calendar server.

mod common;

use common::{spawn_stub, Route};
use fxsentiment::config::{FeedConfig, DEFAULT_USER_AGENT};
use fxsentiment::feed::{FeedError, FeedFormat, FeedSource, HttpFeed};
use fxsentiment::pipeline::snapshot;
use fxsentiment::sentiment::Signal;

const CALENDAR_HTML: &str = include_str!("fixtures/calendar.html");
const CALENDAR_XML: &str = include_str!("fixtures/calendar.xml");

fn feed_config(url: String, format: FeedFormat) -> FeedConfig {
    FeedConfig {
        url,
        format,
        timeout_secs: 5,
        user_agent: DEFAULT_USER_AGENT.to_string(),
    }
}

#[tokio::test]
async fn html_calendar_end_to_end() {
    let stub = spawn_stub(vec![Route::new("/calendar", 200, "text/html", CALENDAR_HTML)]).await;
    let feed = HttpFeed::new(&feed_config(stub.url("/calendar"), FeedFormat::Html)).unwrap();

    let map = snapshot(&feed, FeedFormat::Html).await.unwrap();

    assert_eq!(map.get("USD"), Some(Signal::Bullish));
    assert_eq!(map.get("CAD"), Some(Signal::Bullish));
    assert_eq!(map.get("EUR"), Some(Signal::Bearish));
    // skipped rows never reach the map
    assert_eq!(map.get("JPY"), None);
    assert_eq!(map.get("GBP"), None);
    assert_eq!(map.get("CNY"), None);
    assert_eq!(map.tracked().filter(|(_, s)| *s == Signal::Neutral).count(), 5);

    let requests = stub.recorded();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].header("user-agent"), Some(DEFAULT_USER_AGENT));
}

#[tokio::test]
async fn xml_export_end_to_end() {
    let stub = spawn_stub(vec![Route::new("/ff_calendar_thisweek.xml", 200, "text/xml", CALENDAR_XML)]).await;
    let url = stub.url("/ff_calendar_thisweek.xml");
    assert_eq!(FeedFormat::infer(&url), FeedFormat::Xml);
    let feed = HttpFeed::new(&feed_config(url, FeedFormat::Xml)).unwrap();

    let map = snapshot(&feed, FeedFormat::Xml).await.unwrap();

    assert_eq!(map.get("AUD"), Some(Signal::Bearish));
    assert_eq!(map.get("NZD"), Some(Signal::Bullish));
    assert_eq!(map.sentiment("CHF"), Signal::Neutral);
    assert_eq!(map.len(), 2);
}

#[tokio::test]
async fn upstream_error_status_is_terminal() {
    let stub = spawn_stub(vec![Route::new("/calendar", 503, "text/plain", "maintenance")]).await;
    let feed = HttpFeed::new(&feed_config(stub.url("/calendar"), FeedFormat::Html)).unwrap();

    let err = feed.fetch().await.unwrap_err();
    assert!(matches!(err, FeedError::Status(503)));

    let err = snapshot(&feed, FeedFormat::Html).await.unwrap_err();
    assert_eq!(err.to_string(), "feed returned HTTP 503");
}

#[tokio::test]
async fn challenge_page_is_a_parse_error() {
    let page = "<html><body><h1>Just a moment...</h1></body></html>";
    let stub = spawn_stub(vec![Route::new("/calendar", 200, "text/html", page)]).await;
    let feed = HttpFeed::new(&feed_config(stub.url("/calendar"), FeedFormat::Html)).unwrap();

    let err = snapshot(&feed, FeedFormat::Html).await.unwrap_err();
    assert!(matches!(err, FeedError::Parse(_)));
}
