//! One request cycle: fetch, extract, classify, aggregate.

use serde_json::json;

use crate::feed::{parse_events, FeedError, FeedFormat, FeedSource, RawEvent};
use crate::logging::{log_event_skipped, log_events_parsed, log_sentiment, v_str, ProfileScope};
use crate::sentiment::{evaluate, CurrencyScore, SentimentMap};

/// Classify every event and reduce the admitted signals per currency.
///
/// Events that are filtered out or do not parse are logged and dropped;
/// they never stop the remaining events from being scored.
pub fn analyze(events: &[RawEvent]) -> SentimentMap {
    let mut score = CurrencyScore::new();
    let mut skipped = 0usize;
    for event in events {
        match evaluate(event) {
            Ok(signal) => score.push(&event.currency, signal),
            Err(skip) => {
                skipped += 1;
                log_event_skipped(&event.currency, &event.impact, skip.as_str());
            }
        }
    }
    let admitted = events.len() - skipped;
    let map = score.reduce();
    log_sentiment(&map, admitted, skipped);
    map
}

/// Fetch one payload from `source` and turn it into a sentiment snapshot.
///
/// Transport errors, bad statuses and structurally unparseable payloads
/// are terminal; nothing partial is returned.
pub async fn snapshot(source: &dyn FeedSource, format: FeedFormat) -> Result<SentimentMap, FeedError> {
    let _scope = ProfileScope::with_context(
        "snapshot",
        &[("source", v_str(source.name())), ("format", json!(format.as_str()))],
    );
    let payload = source.fetch().await?;
    let events = parse_events(format, &payload)?;
    log_events_parsed(format.as_str(), events.len());
    Ok(analyze(&events))
}
