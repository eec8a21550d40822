use tracing::{debug, warn};

use crate::event::{EventProperties, Field};
use crate::filter::{Action, Filter};

/// Outcome of running an event through a filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Drop,
}

/// Runs `event` through `filters` in order, rewriting it in place.
///
/// An event without a summary property is dropped before any filter is
/// consulted. The first matching filter with `remove` set drops the event;
/// the first matching filter with `stop` set keeps it with the rewrites
/// applied so far. Otherwise the event is kept.
pub fn process_event<E: EventProperties + ?Sized>(filters: &[Filter], event: &mut E) -> Verdict {
    let Some(summary) = event.field_value(Field::Summary).map(str::to_owned) else {
        warn!("unable to read event summary, event will be dropped");
        return Verdict::Drop;
    };

    for (rule_id, filter) in filters.iter().enumerate() {
        if !filter.matches_event(event) {
            continue;
        }

        debug!(
            rule_id,
            filter_description = %filter.description,
            event_summary = %summary,
            "filter match found"
        );

        match filter.act(event) {
            Action::Continue => continue,
            Action::Remove => {
                debug!(
                    action = "DELETE",
                    rule_id,
                    filter_description = %filter.description,
                    event_summary = %summary,
                    "event removed, no more rules will be processed"
                );
                return Verdict::Drop;
            }
            Action::Stop => {
                debug!(
                    rule_id,
                    filter_description = %filter.description,
                    event_summary = %summary,
                    "stop option is set, no more rules will be processed"
                );
                return Verdict::Keep;
            }
        }
    }

    debug!(event_summary = %summary, "rule processing complete, event will be kept");
    Verdict::Keep
}
