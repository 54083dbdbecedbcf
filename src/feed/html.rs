use scraper::{ElementRef, Html, Selector};

use super::{FeedError, RawEvent};

// Older and newer calendar markup name the value cells differently; each
// selector list covers both.
const TABLE: &str = "table.calendar__table";
const ROW: &str = "tr.calendar__row";
const CURRENCY: &str = "td.calendar__currency";
const IMPACT_CELL: &str = "td.impact, td.calendar__impact";
const IMPACT_ICON: &str = "span[title]";
const ACTUAL: &str = "td.actual, td.calendar__actual";
const FORECAST: &str = "td.forecast, td.calendar__forecast";

struct Selectors {
    table: Selector,
    row: Selector,
    currency: Selector,
    impact_cell: Selector,
    impact_icon: Selector,
    actual: Selector,
    forecast: Selector,
}

fn selector(css: &str) -> Result<Selector, FeedError> {
    Selector::parse(css).map_err(|e| FeedError::Parse(format!("selector {}: {}", css, e)))
}

impl Selectors {
    fn new() -> Result<Self, FeedError> {
        Ok(Self {
            table: selector(TABLE)?,
            row: selector(ROW)?,
            currency: selector(CURRENCY)?,
            impact_cell: selector(IMPACT_CELL)?,
            impact_icon: selector(IMPACT_ICON)?,
            actual: selector(ACTUAL)?,
            forecast: selector(FORECAST)?,
        })
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn first_text(row: ElementRef<'_>, sel: &Selector) -> Option<String> {
    row.select(sel).next().map(cell_text)
}

/// Impact is carried by the icon's `title` ("High Impact Expected");
/// some layouts print it as plain cell text instead.
fn impact_of(row: ElementRef<'_>, sels: &Selectors) -> Option<String> {
    let cell = row.select(&sels.impact_cell).next()?;
    let titled = cell
        .select(&sels.impact_icon)
        .filter_map(|icon| icon.value().attr("title"))
        .map(str::trim)
        .find(|t| !t.is_empty());
    match titled {
        Some(title) => Some(title.to_string()),
        None => Some(cell_text(cell)).filter(|t| !t.is_empty()),
    }
}

pub(super) fn parse(payload: &str) -> Result<Vec<RawEvent>, FeedError> {
    if payload.trim().is_empty() {
        return Err(FeedError::Parse("empty html payload".to_string()));
    }
    let sels = Selectors::new()?;
    let doc = Html::parse_document(payload);
    if doc.select(&sels.table).next().is_none() {
        return Err(FeedError::Parse("calendar table not found".to_string()));
    }

    let mut events = Vec::new();
    for row in doc.select(&sels.row) {
        let currency = match first_text(row, &sels.currency) {
            Some(c) if !c.is_empty() => c,
            _ => continue,
        };
        let impact = match impact_of(row, &sels) {
            Some(i) => i,
            None => continue,
        };
        events.push(RawEvent {
            currency,
            impact,
            actual: first_text(row, &sels.actual),
            forecast: first_text(row, &sels.forecast),
        });
    }
    Ok(events)
}
