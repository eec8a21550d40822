//! Configuration file loading and validation.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ical_filter::CalendarConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse config file: {message}")]
    Parse { message: String },

    #[error("no calendars found, configuration should define at least one calendar")]
    NoCalendars,

    #[error("calendar #{index} has an invalid name `{name}`, names must be non-empty and must not contain `/`")]
    InvalidName { index: usize, name: String },

    #[error("calendar `{name}` is defined more than once")]
    DuplicateName { name: String },

    #[error("calendar `{name}` feed URL must begin with http:// or https:// (got `{url}`)")]
    InvalidFeedUrl { name: String, url: String },

    #[error("calendar `{name}` has no token, authentication can only be disabled with `unsafe: true`")]
    MissingToken { name: String },
}

impl ConfigError {
    fn parse(err: impl ToString) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
}

impl Format {
    /// `.toml` files are TOML, everything else is read as YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub calendars: Vec<CalendarConfig>,
    /// Allows calendars without a token.
    #[serde(rename = "unsafe")]
    pub allow_unsafe: bool,
}

impl Config {
    /// Reads, parses and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&contents, Format::from_path(path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str, format: Format) -> Result<Self, ConfigError> {
        match format {
            Format::Yaml => serde_yaml::from_str(contents).map_err(ConfigError::parse),
            Format::Toml => toml::from_str(contents).map_err(ConfigError::parse),
        }
    }

    /// Checks every calendar and returns the first problem found. Issues that
    /// do not prevent serving are logged as warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calendars.is_empty() {
            return Err(ConfigError::NoCalendars);
        }

        let mut names = HashSet::new();

        for (index, calendar) in self.calendars.iter().enumerate() {
            if calendar.name.is_empty() || calendar.name.contains('/') {
                return Err(ConfigError::InvalidName {
                    index,
                    name: calendar.name.clone(),
                });
            }

            if !names.insert(calendar.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    name: calendar.name.clone(),
                });
            }

            if !calendar.feed_url.starts_with("http://") && !calendar.feed_url.starts_with("https://") {
                return Err(ConfigError::InvalidFeedUrl {
                    name: calendar.name.clone(),
                    url: calendar.feed_url.clone(),
                });
            }

            if calendar.token.is_empty() {
                warn!(calendar = %calendar.name, "calendar has no token set, authentication will be disabled");
                if !self.allow_unsafe {
                    return Err(ConfigError::MissingToken {
                        name: calendar.name.clone(),
                    });
                }
            }

            if calendar.filters.is_empty() {
                warn!(calendar = %calendar.name, "calendar has no filters and will be proxy-only");
            }

            for (rule_id, filter) in calendar.filters.iter().enumerate() {
                for (field, err) in filter.invalid_patterns() {
                    warn!(
                        calendar = %calendar.name,
                        rule_id,
                        field = %field,
                        error = %err,
                        "invalid regex, the rule will never match"
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    const YAML: &str = r#"
unsafe: false
calendars:
  - name: work
    publish_name: Work
    token: s3cret
    feed_url: https://example.com/work.ics
    filters:
      - description: drop private events
        remove: true
        match:
          summary:
            prefix: Private
      - description: hide rooms
        stop: true
        match:
          location:
            regex: "^Room [0-9]+$"
        transform:
          location:
            remove: true
  - name: holidays
    token: other
    feed_url: http://example.com/holidays.ics
"#;

    fn calendar(name: &str) -> CalendarConfig {
        CalendarConfig {
            name: name.into(),
            token: "token".into(),
            feed_url: format!("https://example.com/{name}.ics"),
            ..Default::default()
        }
    }

    fn config(calendars: Vec<CalendarConfig>) -> Config {
        Config {
            calendars,
            allow_unsafe: false,
        }
    }

    #[test]
    fn parse_yaml() {
        let config = Config::parse(YAML, Format::Yaml).unwrap();

        assert!(!config.allow_unsafe);
        assert_eq!(config.calendars.len(), 2);

        let work = &config.calendars[0];
        assert_eq!(work.publish_name, "Work");
        assert_eq!(work.filters.len(), 2);
        assert!(work.filters[0].remove);
        assert_eq!(work.filters[0].matching.summary.prefix, "Private");
        assert!(work.filters[1].stop);
        assert_eq!(work.filters[1].matching.location.regex.as_str(), "^Room [0-9]+$");
        assert!(work.filters[1].transform.location.remove);

        assert!(config.calendars[1].filters.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
unsafe = true

[[calendars]]
name = "public"
feed_url = "https://example.com/public.ics"

[[calendars.filters]]
description = "redact"

[calendars.filters.transform.summary]
replace = "Busy"
"#;
        let config = Config::parse(toml, Format::Toml).unwrap();

        assert!(config.allow_unsafe);
        assert_eq!(config.calendars[0].filters[0].transform.summary.replace, "Busy");
        config.validate().unwrap();
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("config.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("config.yml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("config.TOML")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("config")), Format::Yaml);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.calendars[0].name, "work");
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_malformed_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"calendars: [unterminated").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn requires_a_calendar() {
        let err = config(Vec::new()).validate().unwrap_err();
        assert!(matches!(err, ConfigError::NoCalendars));
    }

    #[test]
    fn rejects_unknown_scheme() {
        let mut cal = calendar("work");
        cal.feed_url = "webcal://example.com/work.ics".into();

        let err = config(vec![cal]).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFeedUrl { .. }));
    }

    #[test]
    fn missing_token_requires_unsafe() {
        let mut cal = calendar("work");
        cal.token.clear();

        let mut config = config(vec![cal]);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken { ref name } if name == "work"));

        config.allow_unsafe = true;
        config.validate().unwrap();
    }

    #[test]
    fn checks_calendars_after_one_without_filters() {
        let mut second = calendar("second");
        second.token.clear();

        let err = config(vec![calendar("first"), second]).validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken { .. }));
    }

    #[test]
    fn rejects_duplicate_and_invalid_names() {
        let err = config(vec![calendar("work"), calendar("work")])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { .. }));

        let err = config(vec![calendar("")]).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidName { index: 0, .. }));

        let err = config(vec![calendar("work"), calendar("a/b")])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidName { index: 1, .. }));
    }

    #[test]
    fn invalid_regex_is_not_fatal() {
        let yaml = r#"
calendars:
  - name: work
    token: t
    feed_url: https://example.com/work.ics
    filters:
      - match:
          summary:
            regex: "("
"#;
        let config = Config::parse(yaml, Format::Yaml).unwrap();
        config.validate().unwrap();
        assert!(config.calendars[0].filters[0].matching.summary.regex.error().is_some());
    }

    #[test]
    fn numeric_values_load_as_text() {
        let yaml = r#"
calendars:
  - name: 2024
    token: 1234
    feed_url: https://example.com/2024.ics
    filters:
      - match:
          summary:
            prefix: 2024
"#;
        let config = Config::parse(yaml, Format::Yaml).unwrap();
        let calendar = &config.calendars[0];
        assert_eq!(calendar.name, "2024");
        assert_eq!(calendar.token, "1234");
        assert_eq!(calendar.filters[0].matching.summary.prefix, "2024");
        config.validate().unwrap();

        let toml = r#"
[[calendars]]
name = "work"
token = 1234
feed_url = "https://example.com/work.ics"
"#;
        let config = Config::parse(toml, Format::Toml).unwrap();
        assert_eq!(config.calendars[0].token, "1234");
    }
}
