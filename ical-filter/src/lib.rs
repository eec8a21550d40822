mod calendar;
mod chain;
mod event;
mod filter;
mod rules;

#[cfg(feature = "serde")]
mod de;

#[cfg(feature = "ics")]
mod ics;

pub use calendar::CalendarConfig;
pub use chain::{process_event, Verdict};
pub use event::{EventProperties, Field};
pub use filter::{Action, EventMatchRules, EventTransformRules, Filter};
pub use rules::{Pattern, StringMatchRule, StringTransformRule};

#[cfg(feature = "ics")]
pub use ics::{FilterStats, FilteredFeed, IcsError};
