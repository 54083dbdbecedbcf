/// One calendar entry as extracted from the upstream feed, all fields text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub currency: String,
    pub impact: String,
    pub actual: Option<String>,
    pub forecast: Option<String>,
}

impl RawEvent {
    pub fn new(currency: &str, impact: &str, actual: Option<&str>, forecast: Option<&str>) -> Self {
        Self {
            currency: currency.to_string(),
            impact: impact.to_string(),
            actual: actual.map(str::to_string),
            forecast: forecast.map(str::to_string),
        }
    }
}
