//! Event classification and per-currency sentiment reduction.
//!
//! Each admissible calendar event yields exactly one [`Signal`] for its
//! currency; all signals of one feed snapshot are then reduced to one net
//! sentiment per currency. Both stages are pure and request-scoped.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod aggregate;
pub mod normalize;

pub use aggregate::{aggregate, CurrencyScore, SentimentMap, Tally, TRACKED_CURRENCIES};
pub use normalize::{classify, compare, convert, evaluate, is_admissible, Skip};

/// Directional reading for a currency.
///
/// Used both for a single event (actual vs forecast) and for the net
/// sentiment of a currency after aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Bullish => "Bullish",
            Signal::Bearish => "Bearish",
            Signal::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_labels() {
        assert_eq!(Signal::Bullish.to_string(), "Bullish");
        assert_eq!(Signal::Bearish.to_string(), "Bearish");
        assert_eq!(Signal::Neutral.to_string(), "Neutral");
    }

    #[test]
    fn test_signal_default() {
        assert_eq!(Signal::default(), Signal::Neutral);
    }
}
