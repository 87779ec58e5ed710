use chrono::{DateTime, Duration, Local};
use color_eyre::eyre::{Result, WrapErr};
use notify_rust::Notification;
use std::path::{Path, PathBuf};

use crate::model::event::Event;

/// Above this much remaining time the reminder only counts days
const DAYS_THRESHOLD_HOURS: i64 = 48;

/// A desktop notification about an upcoming event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub title: String,
    pub body: String,
    pub icon: PathBuf,
}

impl Message {
    pub fn for_event(event: &Event, now: DateTime<Local>, icon: &Path) -> Message {
        Message {
            title: event.title().to_owned(),
            body: format!(
                "{}\nremaining time: {}",
                event.when(),
                format_remaining(event.start() - now)
            ),
            icon: icon.to_path_buf(),
        }
    }
}

/// Something that can put a message in front of the user
pub trait Notifier {
    fn notify(&mut self, message: &Message) -> Result<()>;
}

/// Shows messages as desktop notifications
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&mut self, message: &Message) -> Result<()> {
        let _handle = Notification::new()
            .summary(&message.title)
            .body(&message.body)
            .icon(&message.icon.to_string_lossy())
            .show()
            .wrap_err_with(|| format!("failed to display notification for {:?}", message.title))?;
        Ok(())
    }
}

/// Roughly describe how long until an event starts
///
/// More than two days are counted in days, otherwise hours and minutes. Time that already passed
/// counts as zero.
pub fn format_remaining(remaining: Duration) -> String {
    let remaining = remaining.max(Duration::zero());
    let minutes = remaining.num_minutes();

    if remaining > Duration::hours(DAYS_THRESHOLD_HOURS) {
        let days = (remaining.num_seconds() as f64 / Duration::days(1).num_seconds() as f64).round();
        format!("{} d", days as i64)
    } else if minutes >= 60 {
        format!("{} h {} min", minutes / 60, minutes % 60)
    } else {
        format!("{} min", minutes)
    }
}
