use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::Signal;

/// Currencies rendered in every response, in output order.
pub const TRACKED_CURRENCIES: [&str; 8] = ["USD", "EUR", "JPY", "GBP", "AUD", "NZD", "CHF", "CAD"];

fn currency_key(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Signal counts for one currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub bullish: u32,
    pub bearish: u32,
    pub neutral: u32,
}

impl Tally {
    pub fn from_signals(signals: &[Signal]) -> Self {
        let mut tally = Tally::default();
        for signal in signals {
            match signal {
                Signal::Bullish => tally.bullish += 1,
                Signal::Bearish => tally.bearish += 1,
                Signal::Neutral => tally.neutral += 1,
            }
        }
        tally
    }

    /// Bullish count minus bearish count.
    pub fn score(&self) -> i64 {
        i64::from(self.bullish) - i64::from(self.bearish)
    }

    /// Net sentiment; equal bullish and bearish counts are Neutral.
    pub fn sentiment(&self) -> Signal {
        match self.score() {
            s if s > 0 => Signal::Bullish,
            s if s < 0 => Signal::Bearish,
            _ => Signal::Neutral,
        }
    }
}

/// Signals observed per currency within one feed snapshot.
#[derive(Debug, Clone, Default)]
pub struct CurrencyScore {
    signals: HashMap<String, Vec<Signal>>,
}

impl CurrencyScore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, currency: &str, signal: Signal) {
        self.signals
            .entry(currency_key(currency))
            .or_default()
            .push(signal);
    }

    pub fn signals(&self, currency: &str) -> &[Signal] {
        self.signals
            .get(&currency_key(currency))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Collapse every group to its net sentiment.
    pub fn reduce(self) -> SentimentMap {
        let entries = self
            .signals
            .into_iter()
            .map(|(currency, signals)| (currency, Tally::from_signals(&signals).sentiment()))
            .collect();
        SentimentMap { entries }
    }
}

/// Net sentiment per currency for one snapshot.
///
/// Holds every currency that produced at least one signal, tracked or not.
/// Lookups for absent currencies fall back to Neutral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentimentMap {
    entries: BTreeMap<String, Signal>,
}

impl SentimentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scored sentiment, `None` when the currency produced no signal.
    pub fn get(&self, currency: &str) -> Option<Signal> {
        self.entries.get(&currency_key(currency)).copied()
    }

    /// Sentiment with the Neutral default applied.
    pub fn sentiment(&self, currency: &str) -> Signal {
        self.get(currency).unwrap_or_default()
    }

    /// The eight tracked currencies in output order, defaults applied.
    pub fn tracked(&self) -> impl Iterator<Item = (&'static str, Signal)> + '_ {
        TRACKED_CURRENCIES
            .into_iter()
            .map(move |code| (code, self.sentiment(code)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Signal)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Group `(currency, signal)` pairs and reduce each group by
/// `count(Bullish) - count(Bearish)`.
pub fn aggregate<I, S>(signals: I) -> SentimentMap
where
    I: IntoIterator<Item = (S, Signal)>,
    S: AsRef<str>,
{
    let mut score = CurrencyScore::new();
    for (currency, signal) in signals {
        score.push(currency.as_ref(), signal);
    }
    score.reduce()
}
