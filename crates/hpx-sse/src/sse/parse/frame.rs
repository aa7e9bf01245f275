//! Assembles decoded lines into SSE events, following the
//! [HTML Living Standard](https://html.spec.whatwg.org/multipage/server-sent-events.html#event-stream-interpretation).

use std::time::Duration;

use super::constants::DEFAULT_EVENT_TYPE;
use crate::sse::types::Event;

/// A single decoded line of an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventLine<'a> {
    /// Comment line (starts with `:`).
    Comment,
    /// A field line; the value is empty when the line has no colon.
    Field {
        field_name: FieldName,
        field_value: &'a str,
    },
    /// An empty line (event delimiter).
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldName {
    Event,
    Data,
    Id,
    Retry,
    Ignored,
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        match name {
            "event" => Self::Event,
            "data" => Self::Data,
            "id" => Self::Id,
            "retry" => Self::Retry,
            _ => Self::Ignored,
        }
    }
}

fn read_line(line: &str) -> EventLine<'_> {
    if line.is_empty() {
        return EventLine::Empty;
    }
    match line.find(':') {
        Some(0) => EventLine::Comment,
        Some(colon_pos) => {
            let value = &line[colon_pos + 1..];
            // Strip single leading space if present.
            let value = value.strip_prefix(' ').unwrap_or(value);
            EventLine::Field {
                field_name: FieldName::from(&line[..colon_pos]),
                field_value: value,
            }
        }
        None => EventLine::Field {
            field_name: FieldName::from(line),
            field_value: "",
        },
    }
}

/// `retry:` must be a non-empty run of ASCII digits.
fn parse_retry(value: &str) -> Option<Duration> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok().map(Duration::from_millis)
}

/// Fields of the frame currently being accumulated.
#[derive(Debug, Default)]
struct Frame {
    event: Option<String>,
    data: Option<String>,
    retry: Option<Duration>,
}

/// Turns lines into [`Event`]s.
///
/// The in-progress frame belongs to one connection and is discarded by
/// [`reset`](Self::reset). The last event id and the retry interval belong to
/// the whole event source: they survive resets and drive resumption.
#[derive(Debug)]
pub struct EventParser {
    frame: Frame,
    last_event_id: String,
    retry: Duration,
    advertised_retry: Option<Duration>,
}

impl EventParser {
    /// Create a parser starting from the given retry interval and last event
    /// id.
    pub fn new(retry: Duration, last_event_id: Option<String>) -> Self {
        Self {
            frame: Frame::default(),
            last_event_id: last_event_id.unwrap_or_default(),
            retry,
            advertised_retry: None,
        }
    }

    /// Process one line, returning the event it completes, if any.
    pub fn parse(&mut self, line: &str) -> Option<Event> {
        match read_line(line) {
            EventLine::Empty => self.dispatch(),
            EventLine::Comment => None,
            EventLine::Field {
                field_name,
                field_value,
            } => {
                self.apply(field_name, field_value);
                None
            }
        }
    }

    fn apply(&mut self, field_name: FieldName, field_value: &str) {
        match field_name {
            FieldName::Event => self.frame.event = Some(field_value.to_owned()),
            FieldName::Data => match &mut self.frame.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(field_value);
                }
                None => self.frame.data = Some(field_value.to_owned()),
            },
            FieldName::Id => {
                if !field_value.contains('\0') {
                    self.last_event_id = field_value.to_owned();
                }
            }
            FieldName::Retry => {
                if let Some(retry) = parse_retry(field_value) {
                    self.retry = retry;
                    self.advertised_retry = Some(retry);
                    self.frame.retry = Some(retry);
                }
            }
            FieldName::Ignored => {}
        }
    }

    fn dispatch(&mut self) -> Option<Event> {
        let Frame { event, data, retry } = std::mem::take(&mut self.frame);
        let data = data?;

        let event = event
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_owned());

        Some(Event {
            event,
            data,
            id: self.last_event_id.clone(),
            retry,
        })
    }

    /// Discard the in-progress frame and return the retry interval to base
    /// the next reconnect delay on.
    pub fn reset(&mut self) -> Duration {
        self.frame = Frame::default();
        self.retry
    }

    /// The last event id seen on the stream, if non-empty.
    pub fn last_event_id(&self) -> Option<&str> {
        Some(self.last_event_id.as_str()).filter(|id| !id.is_empty())
    }

    /// The retry interval currently in effect.
    pub fn retry(&self) -> Duration {
        self.retry
    }

    /// The last `retry:` value the server sent, if it ever sent one.
    pub fn advertised_retry(&self) -> Option<Duration> {
        self.advertised_retry
    }
}
