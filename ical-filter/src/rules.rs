use regex::Regex;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer};

use crate::event::{EventProperties, Field};

/// A regular expression condition, compiled once when the rule is built.
///
/// An empty source means the condition is unset. A source that fails to
/// compile is kept so it can be reported, and never matches anything.
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    source: String,
    compiled: Compiled,
}

#[derive(Debug, Clone, Default)]
enum Compiled {
    #[default]
    Unset,
    Valid(Regex),
    Invalid(regex::Error),
}

impl Pattern {
    pub fn new<S: Into<String>>(source: S) -> Self {
        let source = source.into();
        let compiled = if source.is_empty() {
            Compiled::Unset
        } else {
            match Regex::new(&source) {
                Ok(regex) => Compiled::Valid(regex),
                Err(err) => Compiled::Invalid(err),
            }
        };
        Self { source, compiled }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.source.is_empty()
    }

    /// The compile error, if the pattern is set but not a valid regex.
    #[must_use]
    pub fn error(&self) -> Option<&regex::Error> {
        match &self.compiled {
            Compiled::Invalid(err) => Some(err),
            _ => None,
        }
    }

    /// Searches `value` for the pattern anywhere. Unset patterns match everything.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        match &self.compiled {
            Compiled::Unset => true,
            Compiled::Valid(regex) => regex.is_match(value),
            Compiled::Invalid(err) => {
                warn!(regex = %self.source, error = %err, "error processing regex rule");
                false
            }
        }
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::de::string(deserializer).map(Self::new)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

/// Conditions on a single string property.
///
/// When `empty` is set it is the only condition consulted. Otherwise every
/// non-empty condition must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct StringMatchRule {
    pub empty: bool,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub contains: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub prefix: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub suffix: String,
    pub regex: Pattern,
}

impl StringMatchRule {
    #[must_use]
    pub fn has_conditions(&self) -> bool {
        self.empty
            || !self.contains.is_empty()
            || !self.prefix.is_empty()
            || !self.suffix.is_empty()
            || self.regex.is_set()
    }

    /// Evaluates the rule against `value`, where an absent property is `""`.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        if self.empty {
            return value.is_empty();
        }

        if !self.contains.is_empty() && !value.contains(self.contains.as_str()) {
            return false;
        }

        if !self.prefix.is_empty() && !value.starts_with(self.prefix.as_str()) {
            return false;
        }

        if !self.suffix.is_empty() && !value.ends_with(self.suffix.as_str()) {
            return false;
        }

        if self.regex.is_set() && !self.regex.is_match(value) {
            return false;
        }

        true
    }
}

/// Rewrite applied to a single string property. `remove` wins over `replace`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct StringTransformRule {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub replace: String,
    pub remove: bool,
}

impl StringTransformRule {
    pub fn apply<E: EventProperties + ?Sized>(&self, field: Field, event: &mut E) {
        if self.remove {
            event.clear_field(field);
        } else if !self.replace.is_empty() {
            event.set_field(field, &self.replace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    #[derive(Default)]
    struct Props(HashMap<Field, String>);

    impl EventProperties for Props {
        fn field_value(&self, field: Field) -> Option<&str> {
            self.0.get(&field).map(String::as_str)
        }

        fn set_field(&mut self, field: Field, value: &str) {
            self.0.insert(field, value.to_string());
        }
    }

    #[test]
    fn empty_is_evaluated_alone() {
        let rule = StringMatchRule {
            empty: true,
            contains: "x".into(),
            prefix: "nope".into(),
            regex: Pattern::new("^never$"),
            ..Default::default()
        };

        assert!(rule.matches(""));
        assert!(!rule.matches("x"));
    }

    #[test]
    fn contains() {
        let rule = StringMatchRule {
            contains: "ab".into(),
            ..Default::default()
        };

        assert!(rule.matches("xaby"));
        assert!(!rule.matches(""));
        assert!(!rule.matches("xy"));
    }

    #[test]
    fn prefix_and_suffix_must_both_hold() {
        let rule = StringMatchRule {
            prefix: "A".into(),
            suffix: "Z".into(),
            ..Default::default()
        };

        assert!(rule.matches("AxZ"));
        assert!(!rule.matches("Ax"));
        assert!(!rule.matches("xZ"));
    }

    #[test]
    fn regex_searches_anywhere() {
        let rule = StringMatchRule {
            regex: Pattern::new(r"\d{3}"),
            ..Default::default()
        };

        assert!(rule.matches("room 101 north"));
        assert!(!rule.matches("room one"));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let rule = StringMatchRule {
            regex: Pattern::new("("),
            ..Default::default()
        };

        assert!(rule.has_conditions());
        assert!(rule.regex.error().is_some());
        assert!(!rule.matches(""));
        assert!(!rule.matches("("));
        assert!(!rule.matches("anything"));
    }

    #[test]
    fn unset_rule() {
        let rule = StringMatchRule::default();

        assert!(!rule.has_conditions());
        assert!(rule.matches(""));
        assert!(rule.matches("anything"));
        assert!(rule.regex.error().is_none());
    }

    #[test]
    fn remove_wins_over_replace() {
        let mut event = Props::default();
        event.set_field(Field::Location, "Room 1");

        let rule = StringTransformRule {
            replace: "Room 2".into(),
            remove: true,
        };
        rule.apply(Field::Location, &mut event);

        assert_eq!(event.field_value(Field::Location), Some(""));
    }

    #[test]
    fn replace_is_idempotent() {
        let mut event = Props::default();
        event.set_field(Field::Summary, "Standup");

        let rule = StringTransformRule {
            replace: "X".into(),
            remove: false,
        };
        rule.apply(Field::Summary, &mut event);
        let once = event.field_value(Field::Summary).map(str::to_string);
        rule.apply(Field::Summary, &mut event);

        assert_eq!(event.field_value(Field::Summary), once.as_deref());
        assert_eq!(once.as_deref(), Some("X"));
    }

    #[test]
    fn no_action_leaves_field_untouched() {
        let mut event = Props::default();

        let rule = StringTransformRule::default();
        rule.apply(Field::Url, &mut event);

        assert_eq!(event.field_value(Field::Url), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_match_rule() {
        let rule: StringMatchRule = serde_yaml::from_str("prefix: Private\nregex: '[0-9]+'\n").unwrap();

        assert_eq!(rule.prefix, "Private");
        assert_eq!(rule.regex.as_str(), "[0-9]+");
        assert!(!rule.empty);
        assert!(rule.contains.is_empty());
        assert!(rule.matches("Private 42"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn numeric_scalars_load_as_text() {
        let rule: StringMatchRule = serde_yaml::from_str("prefix: 2024\nregex: 42\n").unwrap();
        assert_eq!(rule.prefix, "2024");
        assert_eq!(rule.regex.as_str(), "42");
        assert!(rule.matches("2024 review #42"));

        let rule: StringTransformRule = serde_yaml::from_str("replace: 0\n").unwrap();
        assert_eq!(rule.replace, "0");
    }
}
