#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::filter::Filter;

/// One proxied calendar: where to fetch it, who may read it, and the
/// ordered filters applied to its events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct CalendarConfig {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub publish_name: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub token: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::de::string"))]
    pub feed_url: String,
    pub filters: Vec<Filter>,
}

impl CalendarConfig {
    /// HTTP path the filtered feed is published under.
    #[must_use]
    pub fn feed_path(&self) -> String {
        format!("/calendars/{}/feed", self.name)
    }

    /// Exact comparison against the configured token. A calendar without a
    /// token accepts an empty one.
    #[must_use]
    pub fn authorize(&self, token: &str) -> bool {
        self.token == token
    }
}
