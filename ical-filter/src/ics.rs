//! Runs filters over an iCalendar document.
//!
//! The feed is republished as it came in: only the content lines of events a
//! filter rewrites or drops change. Folding, line endings, property order and
//! every non-event component are copied through verbatim.

use std::borrow::Cow;
use std::fmt;

use icalendar::parser::{self, read_calendar, unfold, ParseString};
use icalendar::Property;
use thiserror::Error;
use tracing::{debug, warn};

use crate::chain::{process_event, Verdict};
use crate::{CalendarConfig, EventProperties, Field};

#[derive(Debug, Error)]
pub enum IcsError {
    #[error("document does not start with BEGIN:VCALENDAR")]
    NotACalendar,

    #[error("{0}")]
    Malformed(String),

    #[error("failed to serialize property: {0}")]
    Serialize(#[from] fmt::Error),
}

/// How many events survived a filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredFeed {
    pub body: String,
    pub stats: FilterStats,
}

impl CalendarConfig {
    /// Renames the calendar when a publish name is configured and runs every
    /// top-level `VEVENT` through the filter chain, leaving out dropped ones.
    ///
    /// Bodies that are not an iCalendar document are rejected, so an HTML
    /// error page is never republished as an empty calendar.
    pub fn filter_feed(&self, body: &str) -> Result<FilteredFeed, IcsError> {
        let text = body.strip_prefix('\u{feff}').unwrap_or(body);

        let head = text.trim_start().get(..15);
        if !head.is_some_and(|head| head.eq_ignore_ascii_case("BEGIN:VCALENDAR")) {
            return Err(IcsError::NotACalendar);
        }

        read_calendar(&unfold(text)).map_err(IcsError::Malformed)?;

        let rename = !self.publish_name.is_empty();
        let mut rename_pending = rename;

        let mut out = String::with_capacity(text.len());
        let mut stats = FilterStats::default();
        let mut depth = 0usize;
        let mut event: Option<FeedEvent<'_>> = None;

        if self.filters.is_empty() {
            debug!(calendar = %self.name, "no filters to evaluate");
        } else {
            debug!(calendar = %self.name, filters = self.filters.len(), "processing filters");
        }

        for line in content_lines(text) {
            let name = line_name(line);
            let opens = name.eq_ignore_ascii_case("BEGIN");
            let closes = name.eq_ignore_ascii_case("END");

            if let Some(current) = event.as_mut() {
                if current.push(line, opens, closes) {
                    depth -= 1;
                    if let Some(finished) = event.take() {
                        self.finish_event(finished, &mut out, &mut stats);
                    }
                }
                continue;
            }

            if depth == 1 {
                if (opens || closes) && rename_pending {
                    rename_pending = false;
                    out.push_str(&serialize(Property::new("NAME", &self.publish_name))?);
                    out.push_str(&serialize(Property::new("X-WR-CALNAME", &self.publish_name))?);
                } else if rename
                    && (name.eq_ignore_ascii_case("NAME") || name.eq_ignore_ascii_case("X-WR-CALNAME"))
                {
                    continue;
                }
            }

            if opens {
                depth += 1;
                if depth == 2 && component_name(line).eq_ignore_ascii_case("VEVENT") {
                    if self.filters.is_empty() {
                        stats.kept += 1;
                    } else {
                        event = Some(FeedEvent::new(line));
                        continue;
                    }
                }
            } else if closes {
                depth = depth.saturating_sub(1);
            }

            out.push_str(line);
        }

        if event.is_some() || depth != 0 {
            return Err(IcsError::Malformed("unterminated component".into()));
        }

        debug!(
            calendar = %self.name,
            kept = stats.kept,
            removed = stats.removed,
            "filter processing completed"
        );

        Ok(FilteredFeed { body: out, stats })
    }

    fn finish_event(&self, mut event: FeedEvent<'_>, out: &mut String, stats: &mut FilterStats) {
        match process_event(&self.filters, &mut event) {
            Verdict::Keep => {
                stats.kept += 1;
                event.write_to(out);
            }
            Verdict::Drop => {
                debug!(uid = ?event.uid(), "removing event");
                stats.removed += 1;
            }
        }
    }
}

/// Splits `text` into content lines. Folded continuation lines and line
/// endings stay attached to the line they belong to.
fn content_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut end = 0;

    for physical in text.split_inclusive('\n') {
        if end > start && !physical.starts_with([' ', '\t']) {
            lines.push(&text[start..end]);
            start = end;
        }
        end += physical.len();
    }

    if end > start {
        lines.push(&text[start..end]);
    }

    lines
}

fn line_name(line: &str) -> &str {
    let end = line.find([';', ':']).unwrap_or(line.len());
    line[..end].trim()
}

/// The `X` of a `BEGIN:X` or `END:X` line.
fn component_name(line: &str) -> &str {
    line.split_once(':').map_or("", |(_, name)| name.trim())
}

fn parse_property<'a>(unfolded: &'a str) -> Result<parser::Property<'a>, IcsError> {
    parser::Property::try_from(unfolded.trim_end_matches(['\r', '\n'])).map_err(IcsError::Malformed)
}

/// The unescaped value of a single content line.
fn decode(line: &str) -> Result<String, IcsError> {
    let unfolded = unfold(line);
    Ok(parse_property(&unfolded)?.val.as_str().to_owned())
}

/// Rewrites the value of `line`, keeping its parameters.
fn encode(line: &str, value: &str) -> Result<String, IcsError> {
    let unfolded = unfold(line);
    let mut property = parse_property(&unfolded)?;
    property.val = ParseString::from(value);
    serialize(Property::from(property))
}

fn serialize(property: Property) -> Result<String, IcsError> {
    let line: String = property.try_into()?;
    Ok(line)
}

struct EventLine<'a> {
    raw: Cow<'a, str>,
    field: Option<Field>,
    nested: bool,
    value: String,
}

/// A `VEVENT` block as it appeared in the feed, editable through
/// [`EventProperties`].
struct FeedEvent<'a> {
    lines: Vec<EventLine<'a>>,
    depth: usize,
    /// Where new properties go: before the first nested component.
    insert_at: Option<usize>,
}

impl<'a> FeedEvent<'a> {
    fn new(begin: &'a str) -> Self {
        Self {
            lines: vec![EventLine {
                raw: Cow::Borrowed(begin),
                field: None,
                nested: false,
                value: String::new(),
            }],
            depth: 0,
            insert_at: None,
        }
    }

    /// Appends a content line, returning `true` once the event's own `END`
    /// line has been read.
    fn push(&mut self, line: &'a str, opens: bool, closes: bool) -> bool {
        let nested = self.depth > 0 || opens;
        let mut field = None;
        let mut value = String::new();

        if opens {
            if self.depth == 0 && self.insert_at.is_none() {
                self.insert_at = Some(self.lines.len());
            }
            self.depth += 1;
        } else if closes {
            if self.depth == 0 {
                if self.insert_at.is_none() {
                    self.insert_at = Some(self.lines.len());
                }
                self.lines.push(EventLine {
                    raw: Cow::Borrowed(line),
                    field: None,
                    nested: false,
                    value,
                });
                return true;
            }
            self.depth -= 1;
        } else if !nested {
            if let Some(found) = Field::from_property_name(line_name(line)) {
                match decode(line) {
                    Ok(decoded) => {
                        field = Some(found);
                        value = decoded;
                    }
                    Err(err) => warn!(field = %found, error = %err, "unable to read event property"),
                }
            }
        }

        self.lines.push(EventLine {
            raw: Cow::Borrowed(line),
            field,
            nested,
            value,
        });
        false
    }

    fn line(&self, field: Field) -> Option<usize> {
        self.lines.iter().position(|line| line.field == Some(field))
    }

    fn uid(&self) -> Option<String> {
        self.lines
            .iter()
            .filter(|line| !line.nested)
            .find(|line| line_name(&line.raw).eq_ignore_ascii_case("UID"))
            .and_then(|line| decode(&line.raw).ok())
    }

    fn write_to(&self, out: &mut String) {
        for line in &self.lines {
            out.push_str(&line.raw);
        }
    }
}

impl EventProperties for FeedEvent<'_> {
    fn field_value(&self, field: Field) -> Option<&str> {
        self.line(field).map(|index| self.lines[index].value.as_str())
    }

    fn set_field(&mut self, field: Field, value: &str) {
        let rewritten = match self.line(field) {
            Some(index) => encode(&self.lines[index].raw, value).map(|raw| (index, raw, false)),
            None => serialize(Property::new(field.property_name(), value)).map(|raw| {
                let index = self
                    .insert_at
                    .unwrap_or_else(|| self.lines.len().saturating_sub(1));
                (index, raw, true)
            }),
        };

        let (index, raw, inserted) = match rewritten {
            Ok(rewritten) => rewritten,
            Err(err) => {
                warn!(field = %field, error = %err, "unable to rewrite event property");
                return;
            }
        };

        let line = EventLine {
            raw: Cow::Owned(raw),
            field: Some(field),
            nested: false,
            value: value.to_owned(),
        };

        if inserted {
            self.lines.insert(index, line);
            if let Some(insert_at) = self.insert_at.as_mut() {
                *insert_at += 1;
            }
        } else {
            self.lines[index] = line;
        }
    }
}
