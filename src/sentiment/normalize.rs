//! Admissibility filter and numeric normalization for raw calendar events.

use super::Signal;
use crate::feed::RawEvent;

/// Impact levels that produce a signal, matched as lowercase prefixes so
/// that both "High" and "High Impact Expected" are accepted.
const ACCEPTED_IMPACTS: [&str; 2] = ["high", "medium"];

/// Token the calendar prints when a value is not available.
const PLACEHOLDER: &str = "-";

/// Why an event produced no signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Impact is not High or Medium.
    Impact,
    /// Actual or forecast is missing, blank or the placeholder.
    MissingValue,
    /// Actual or forecast is present but not numeric.
    Unparseable,
}

impl Skip {
    pub fn as_str(&self) -> &'static str {
        match self {
            Skip::Impact => "impact",
            Skip::MissingValue => "missing_value",
            Skip::Unparseable => "unparseable",
        }
    }
}

fn impact_accepted(impact: &str) -> bool {
    let level = impact.trim().to_lowercase();
    ACCEPTED_IMPACTS.iter().any(|accepted| level.starts_with(accepted))
}

fn has_value(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        Some(v) => !v.is_empty() && v != PLACEHOLDER,
        None => false,
    }
}

/// True when the event is High/Medium impact and carries both values.
pub fn is_admissible(event: &RawEvent) -> bool {
    impact_accepted(&event.impact)
        && has_value(event.actual.as_deref())
        && has_value(event.forecast.as_deref())
}

/// Convert a calendar value such as `"1.2M"`, `"3.4K"`, `"5.6%"` or
/// `"1,250"` into a magnitude. Returns `None` for anything non-numeric.
pub fn convert(text: &str) -> Option<f64> {
    let mut cleaned = text.trim().replace(',', "");
    if cleaned.ends_with('%') {
        cleaned.pop();
    }
    let cleaned = cleaned.trim().to_uppercase();

    let (digits, scale) = if let Some(rest) = cleaned.strip_suffix('M') {
        (rest, 1_000_000.0)
    } else if let Some(rest) = cleaned.strip_suffix('K') {
        (rest, 1_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };

    let value: f64 = digits.trim().parse().ok()?;
    let scaled = value * scale;
    // f64 parsing accepts "inf" and "NaN"; neither is a calendar value.
    scaled.is_finite().then_some(scaled)
}

/// Strict three-way comparison of actual against forecast.
pub fn compare(actual: f64, forecast: f64) -> Signal {
    if actual > forecast {
        Signal::Bullish
    } else if actual < forecast {
        Signal::Bearish
    } else {
        Signal::Neutral
    }
}

/// Classify one event, reporting why it was skipped when it yields no signal.
pub fn evaluate(event: &RawEvent) -> Result<Signal, Skip> {
    if !impact_accepted(&event.impact) {
        return Err(Skip::Impact);
    }
    if !is_admissible(event) {
        return Err(Skip::MissingValue);
    }
    let (Some(actual), Some(forecast)) = (event.actual.as_deref(), event.forecast.as_deref()) else {
        return Err(Skip::MissingValue);
    };
    match (convert(actual), convert(forecast)) {
        (Some(a), Some(f)) => Ok(compare(a, f)),
        _ => Err(Skip::Unparseable),
    }
}

/// Signal for one event, or `None` when the event is not admissible or
/// its values do not parse.
pub fn classify(event: &RawEvent) -> Option<Signal> {
    evaluate(event).ok()
}
