use quick_xml::events::Event;
use quick_xml::Reader;

use super::{FeedError, RawEvent};

#[derive(Debug, Clone, Copy)]
enum Field {
    Currency,
    Impact,
    Actual,
    Forecast,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"currency" | b"country" => Some(Field::Currency),
            b"impact" => Some(Field::Impact),
            b"actual" => Some(Field::Actual),
            b"forecast" => Some(Field::Forecast),
            _ => None,
        }
    }
}

/// Child values of the `<event>` element being read.
#[derive(Debug, Default)]
struct Partial {
    currency: Option<String>,
    impact: Option<String>,
    actual: Option<String>,
    forecast: Option<String>,
}

impl Partial {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Currency => &mut self.currency,
            Field::Impact => &mut self.impact,
            Field::Actual => &mut self.actual,
            Field::Forecast => &mut self.forecast,
        }
    }

    /// Record that the child element exists, even if it stays empty.
    fn open(&mut self, field: Field) {
        self.slot(field).get_or_insert_with(String::new);
    }

    fn append(&mut self, field: Field, text: &str) {
        self.slot(field).get_or_insert_with(String::new).push_str(text);
    }

    fn finish(self) -> Option<RawEvent> {
        let currency = self.currency.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())?;
        let impact = self.impact.map(|i| i.trim().to_string()).filter(|i| !i.is_empty())?;
        Some(RawEvent {
            currency,
            impact,
            actual: self.actual.map(|a| a.trim().to_string()),
            forecast: self.forecast.map(|f| f.trim().to_string()),
        })
    }
}

fn malformed(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> FeedError {
    FeedError::Parse(format!("{} at byte {}", err, reader.buffer_position()))
}

pub(super) fn parse(payload: &str) -> Result<Vec<RawEvent>, FeedError> {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);

    let mut events = Vec::new();
    let mut current: Option<Partial> = None;
    let mut field: Option<Field> = None;
    let mut saw_root = false;

    loop {
        let event = reader.read_event().map_err(|e| malformed(&reader, e))?;
        match event {
            Event::Start(tag) => {
                saw_root = true;
                let name = tag.local_name();
                if name.as_ref() == b"event" {
                    current = Some(Partial::default());
                    field = None;
                } else if let Some(partial) = current.as_mut() {
                    field = Field::from_tag(name.as_ref());
                    if let Some(f) = field {
                        partial.open(f);
                    }
                }
            }
            Event::Empty(tag) => {
                saw_root = true;
                if let (Some(partial), Some(f)) =
                    (current.as_mut(), Field::from_tag(tag.local_name().as_ref()))
                {
                    partial.open(f);
                }
            }
            Event::Text(text) => {
                if let (Some(partial), Some(f)) = (current.as_mut(), field) {
                    let value = text.unescape().map_err(|e| malformed(&reader, e))?;
                    partial.append(f, &value);
                }
            }
            Event::CData(data) => {
                if let (Some(partial), Some(f)) = (current.as_mut(), field) {
                    let raw = data.into_inner();
                    partial.append(f, &String::from_utf8_lossy(&raw));
                }
            }
            Event::End(tag) => {
                if tag.local_name().as_ref() == b"event" {
                    if let Some(raw) = current.take().and_then(Partial::finish) {
                        events.push(raw);
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(FeedError::Parse("xml payload has no root element".to_string()));
    }
    Ok(events)
}
