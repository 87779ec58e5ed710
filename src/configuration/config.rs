use chrono::Duration;
use color_eyre::eyre::{Result, WrapErr};
use figment::providers::{Format, Json, Serialized};
use figment::Figment;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{calendar_source_config::CalendarSourceConfig, types::config_duration::ConfigDuration};

pub const DEFAULT_CONFIG_NAME: &str = "calbell.json";
const DEFAULT_FETCH_PERIOD: &str = "30m";
const DEFAULT_FETCH_PERIOD_MINUTES: i64 = 30;
const MAX_FETCH_PERIOD_DAYS: i64 = 365;
const DEFAULT_NOTIFICATION_ICON: &str = "calendar_icon.svg";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// The directory against which relative paths in the config are resolved
    ///
    /// This is set to the directory containing the config file when it is loaded
    #[serde(skip)]
    pub base_dir: PathBuf,

    /// How often all calendars are downloaded again
    pub fetch_period: ConfigDuration,

    /// Add the configured default reminders even to events that bring their own alarms
    pub force_default_reminders: bool,

    /// The list of calendars to watch (can be urls and files)
    #[serde(rename = "calendars")]
    pub calendar_sources: Vec<CalendarSourceConfig>,

    /// A single command that opens the calendar client
    ///
    /// When set, the tray menu shows one "Open client" entry instead of one per calendar
    pub open_client_cmd: Option<String>,

    /// The icon shown in desktop notifications
    ///
    /// NOTE: This is relative to the config file
    pub notification_icon: String,
}

/// Sane default values for the config struct.
impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: ".".into(),
            fetch_period: DEFAULT_FETCH_PERIOD.into(),
            force_default_reminders: false,
            calendar_sources: Vec::new(),
            open_client_cmd: None,
            notification_icon: DEFAULT_NOTIFICATION_ICON.into(),
        }
    }
}

impl Config {
    /// Read the config file at `config_path`
    ///
    /// Failing to read the file is an error, but malformed contents only get logged and the
    /// default config is used instead.
    pub fn new(config_path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(config_path)
            .wrap_err_with(|| format!("failed to read config file: {:?}", config_path))?;

        let mut config = Config::from_json(&contents).unwrap_or_else(|err| {
            error!("failed to parse config file {:?}: {:#}", config_path, err);
            Config::default()
        });

        config.base_dir = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ".".into());
        debug!("base directory is set to: {:?}", config.base_dir);

        // surface a bad period right away rather than on the first fetch
        config.fetch_period_duration();

        info!(
            "config file {:?} loaded with {} calendars",
            config_path,
            config.calendar_sources.len()
        );
        Ok(config)
    }

    /// Parse the JSON text of a config file on top of the defaults
    pub fn from_json(contents: &str) -> Result<Config> {
        let config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Json::string(contents))
            .extract()?;
        Ok(config)
    }

    /// The fetch period, falling back to 30 minutes when the configured one is unusable
    ///
    /// Periods longer than a year are unusable too.
    pub fn fetch_period_duration(&self) -> Duration {
        match self.fetch_period.duration() {
            Ok(period) if period > Duration::zero() && period <= Duration::days(MAX_FETCH_PERIOD_DAYS) => {
                period
            }
            Ok(period) => {
                error!(
                    "fetch period must be positive and at most {} days, got {}; using {}",
                    MAX_FETCH_PERIOD_DAYS, period, DEFAULT_FETCH_PERIOD
                );
                Duration::minutes(DEFAULT_FETCH_PERIOD_MINUTES)
            }
            Err(err) => {
                error!("failed to parse fetch period: {:#}; using {}", err, DEFAULT_FETCH_PERIOD);
                Duration::minutes(DEFAULT_FETCH_PERIOD_MINUTES)
            }
        }
    }

    /// The global client command, if one is configured and not blank
    pub fn client_cmd(&self) -> Option<&str> {
        self.open_client_cmd
            .as_deref()
            .map(str::trim)
            .filter(|cmd| !cmd.is_empty())
    }

    pub fn calendar_source(&self, name: &str) -> Option<&CalendarSourceConfig> {
        self.calendar_sources.iter().find(|source| source.name == name)
    }

    /// The notification icon resolved against the config directory
    pub fn notification_icon_path(&self) -> PathBuf {
        self.base_dir.join(&self.notification_icon)
    }
}
