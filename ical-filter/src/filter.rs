#[cfg(feature = "serde")]
use serde::Deserialize;
use tracing::debug;

use crate::event::{EventProperties, Field};
use crate::rules::{StringMatchRule, StringTransformRule};

/// Match conditions, one per recognized event field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct EventMatchRules {
    pub summary: StringMatchRule,
    pub description: StringMatchRule,
    pub location: StringMatchRule,
    pub url: StringMatchRule,
}

impl EventMatchRules {
    #[must_use]
    pub fn get(&self, field: Field) -> &StringMatchRule {
        match field {
            Field::Summary => &self.summary,
            Field::Description => &self.description,
            Field::Location => &self.location,
            Field::Url => &self.url,
        }
    }
}

/// Rewrites, one per recognized event field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct EventTransformRules {
    pub summary: StringTransformRule,
    pub description: StringTransformRule,
    pub location: StringTransformRule,
    pub url: StringTransformRule,
}

impl EventTransformRules {
    #[must_use]
    pub fn get(&self, field: Field) -> &StringTransformRule {
        match field {
            Field::Summary => &self.summary,
            Field::Description => &self.description,
            Field::Location => &self.location,
            Field::Url => &self.url,
        }
    }
}

/// What the chain should do after a single filter has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The transform was applied; move on to the next filter.
    Continue,
    /// The transform was applied; keep the event and skip the remaining
    /// filters.
    Stop,
    /// Drop the event without transforming it.
    Remove,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct Filter {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub description: String,
    pub remove: bool,
    pub stop: bool,
    #[cfg_attr(feature = "serde", serde(rename = "match"))]
    pub matching: EventMatchRules,
    pub transform: EventTransformRules,
}

impl Filter {
    /// True when every field that carries conditions matches the event.
    /// A filter without any conditions matches every event.
    pub fn matches_event<E: EventProperties + ?Sized>(&self, event: &E) -> bool {
        for field in Field::ALL {
            let rule = self.matching.get(field);
            if rule.has_conditions() && !rule.matches(event.field_or_empty(field)) {
                debug!(
                    field = %field,
                    filter = %self.description,
                    "event does not match filter conditions"
                );
                return false;
            }
        }
        true
    }

    /// Applies every field rewrite. Each field is rewritten independently of
    /// the others.
    pub fn transform_event<E: EventProperties + ?Sized>(&self, event: &mut E) {
        for field in Field::ALL {
            self.transform.get(field).apply(field, event);
        }
    }

    /// Runs the filter's action on an event that already matched it.
    pub fn act<E: EventProperties + ?Sized>(&self, event: &mut E) -> Action {
        if self.remove {
            return Action::Remove;
        }

        self.transform_event(event);

        if self.stop {
            Action::Stop
        } else {
            Action::Continue
        }
    }

    /// Match rules whose regex could not be compiled.
    pub fn invalid_patterns(&self) -> impl Iterator<Item = (Field, &regex::Error)> + '_ {
        Field::ALL.into_iter().filter_map(move |field| {
            self.matching
                .get(field)
                .regex
                .error()
                .map(|err| (field, err))
        })
    }
}
