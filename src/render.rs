//! Text and CSV renderings of a sentiment snapshot.
//!
//! Both list exactly the tracked currencies, in fixed order, with Neutral
//! for any currency that produced no signal.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use csv::{Terminator, WriterBuilder};

use crate::sentiment::SentimentMap;

pub const CSV_FILENAME: &str = "ForexSentiment.csv";

pub fn render_text(map: &SentimentMap, now: DateTime<Utc>) -> String {
    let mut lines = vec![format!("Date: {}", now.format("%Y-%m-%d %H:%M GMT")), String::new()];
    for (code, sentiment) in map.tracked() {
        lines.push(format!("{} - {}", code, sentiment));
    }
    lines.join("\n")
}

pub fn render_csv(map: &SentimentMap) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(["Currency", "Sentiment"])?;
    for (code, sentiment) in map.tracked() {
        writer.write_record([code, sentiment.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("csv flush failed: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// `Content-Disposition` value for the CSV download.
pub fn csv_disposition() -> String {
    format!("attachment; filename={}", CSV_FILENAME)
}
