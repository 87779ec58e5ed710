use chrono::Duration;
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed duration as written in the config file
///
/// The text is kept as-is so that a bad value only fails where it is used (and gets logged there)
/// instead of rejecting the whole config file. Accepted values are an optional leading `-`
/// followed by anything [`humantime::parse_duration`] understands, e.g. `30m`, `1h 30m` or `-9h`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConfigDuration(String);

impl ConfigDuration {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the configured text into a duration.
    pub fn duration(&self) -> Result<Duration> {
        parse_config_duration(&self.0)
    }
}

impl fmt::Display for ConfigDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConfigDuration {
    fn from(value: &str) -> Self {
        ConfigDuration(value.to_owned())
    }
}

/// Parse a possibly negative human readable duration
pub fn parse_config_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim();
    let (negative, magnitude) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed).trim_start()),
    };

    let parsed = humantime::parse_duration(magnitude)
        .wrap_err_with(|| format!("could not parse duration: {:?}", value))?;
    let duration =
        Duration::from_std(parsed).map_err(|_| eyre!("duration is out of range: {:?}", value))?;

    Ok(if negative { -duration } else { duration })
}
