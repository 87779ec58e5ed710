use serde::{Deserialize, Serialize};

use super::types::config_duration::ConfigDuration;

/// A Config item representing a calendar source
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalendarSourceConfig {
    /// The name shown in the tray menu and in log messages
    pub name: String,

    /// The url or file path of the calendar
    ///
    /// NOTE: File paths are relative to the config file
    #[serde(rename = "url")]
    pub source: String,

    /// Reminders added to timed events that carry no alarms of their own
    #[serde(rename = "notification_offsets")]
    pub offsets: Vec<ConfigDuration>,

    /// Reminders added to full-day events that carry no alarms of their own
    #[serde(rename = "full_day_notifications_offsets")]
    pub full_day_offsets: Vec<ConfigDuration>,

    /// The command that opens this calendar in a client application
    pub open_client_cmd: Option<String>,
}

impl CalendarSourceConfig {
    /// The default reminder offsets for either full-day or timed events
    pub fn default_offsets(&self, full_day: bool) -> &[ConfigDuration] {
        if full_day {
            &self.full_day_offsets
        } else {
            &self.offsets
        }
    }

    /// The client command, if one is configured and not blank
    pub fn client_cmd(&self) -> Option<&str> {
        self.open_client_cmd
            .as_deref()
            .map(str::trim)
            .filter(|cmd| !cmd.is_empty())
    }
}
