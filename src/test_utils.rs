use chrono::{DateTime, Local, TimeZone};
use color_eyre::eyre::{eyre, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::configuration::calendar_source_config::CalendarSourceConfig;
use crate::display::{ClientEntry, StatusDisplay};
use crate::model::calendar_source::{CalendarSource, SourceReader};
use crate::notifier::{Message, Notifier};
use crate::scheduler::Clock;

pub fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("test times are unambiguous")
}

/// Format a time as a floating iCalendar date-time
pub fn ical_local(time: DateTime<Local>) -> String {
    time.format("%Y%m%dT%H%M%S").to_string()
}

pub fn source_config(name: &str, source: &str, offsets: &[&str]) -> CalendarSourceConfig {
    CalendarSourceConfig {
        name: name.into(),
        source: source.into(),
        offsets: offsets.iter().map(|o| (*o).into()).collect(),
        ..Default::default()
    }
}

/// Serves fixed feed texts, every other source fails like an unreachable server
#[derive(Clone, Default)]
pub struct StaticReader {
    feeds: Arc<Mutex<HashMap<String, String>>>,
}

impl StaticReader {
    pub fn new(feeds: &[(&str, String)]) -> Self {
        let reader = StaticReader::default();
        for (source, text) in feeds {
            reader.set(source, text.clone());
        }
        reader
    }

    pub fn set(&self, source: &str, text: String) {
        self.feeds.lock().unwrap().insert(source.to_owned(), text);
    }
}

impl SourceReader for StaticReader {
    fn read(&self, source: &CalendarSource) -> Result<String> {
        self.feeds
            .lock()
            .unwrap()
            .get(&source.to_string())
            .cloned()
            .ok_or(eyre!("connection refused: {}", source))
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<Message>>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, message: &Message) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub statuses: Arc<Mutex<Vec<String>>>,
    pub clients: Arc<Mutex<Vec<ClientEntry>>>,
}

impl RecordingDisplay {
    pub fn last_status(&self) -> Option<String> {
        self.statuses.lock().unwrap().last().cloned()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show_status(&mut self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_owned());
    }

    fn show_clients(&mut self, clients: &[ClientEntry]) {
        *self.clients.lock().unwrap() = clients.to_vec();
    }
}

/// A clock that only moves when told to
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }
}
