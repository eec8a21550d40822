//! Fetches an upstream feed, filters it and serializes the result.

use std::fmt;

use ical_filter::{CalendarConfig, IcsError};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info_span};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to fetch upstream feed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("failed to parse upstream feed: {0}")]
    Parse(String),

    #[error("failed to serialize calendar: {0}")]
    Serialize(#[from] fmt::Error),
}

impl From<IcsError> for FeedError {
    fn from(err: IcsError) -> Self {
        match err {
            IcsError::Serialize(err) => FeedError::Serialize(err),
            err => FeedError::Parse(err.to_string()),
        }
    }
}

/// HTTP client shared by every request.
pub fn client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Downloads the calendar's feed and applies its filters.
///
/// Any failure fails the whole request; there is no partial output.
pub async fn fetch(client: &Client, config: &CalendarConfig) -> Result<String, FeedError> {
    debug!(url = %config.feed_url, "fetching iCal feed");

    let body = client
        .get(&config.feed_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let span = info_span!("filter", calendar = %config.name);
    let feed = span.in_scope(|| config.filter_feed(&body))?;
    Ok(feed.body)
}
