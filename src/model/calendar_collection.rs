use chrono::{DateTime, Local, NaiveDate};
use log::{error, info};

use super::alarm::{Alarm, EventKey};
use super::calendar::Calendar;
use super::calendar_source::{CalendarSource, SourceReader};
use super::event::Event;
use crate::configuration::config::Config;

/// All calendars of one fetch
///
/// A fetch always builds a new collection; nothing is carried over from the previous one.
#[derive(Debug, Default)]
pub struct CalendarCollection {
    calendars: Vec<Calendar>,
}

impl CalendarCollection {
    /// Download and parse every configured calendar
    ///
    /// Sources that can not be read or parsed are logged and left out, the rest still make it
    /// into the collection.
    pub fn fetch(config: &Config, reader: &dyn SourceReader, now: DateTime<Local>) -> CalendarCollection {
        info!("fetching calendars");
        let mut calendars = Vec::new();

        for source_config in &config.calendar_sources {
            let source = match CalendarSource::new(&source_config.source, &config.base_dir) {
                Ok(source) => source,
                Err(err) => {
                    error!("bad source for calendar {:?}: {:#}", source_config.name, err);
                    continue;
                }
            };

            let text = match reader.read(&source) {
                Ok(text) => text,
                Err(err) => {
                    error!("failed to get ics data of calendar {:?}: {:#}", source_config.name, err);
                    continue;
                }
            };

            // the position in the collection is part of every event key
            let index = calendars.len();
            match Calendar::parse_calendar(
                text.as_bytes(),
                index,
                source_config,
                config.force_default_reminders,
                now,
            ) {
                Ok(calendar) => calendars.push(calendar),
                Err(err) => error!("failed to parse calendar {:?}: {:#}", source_config.name, err),
            }
        }

        info!(
            "fetched and parsed {} of {} calendars",
            calendars.len(),
            config.calendar_sources.len()
        );
        CalendarCollection { calendars }
    }

    /// Get a reference to the calendar collection's calendars.
    #[must_use]
    pub fn calendars(&self) -> &[Calendar] {
        self.calendars.as_ref()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.calendars.iter().flat_map(|c| c.events())
    }

    pub fn event(&self, key: &EventKey) -> Option<&Event> {
        self.calendars.get(key.calendar)?.event(&key.event_id)
    }

    /// Find the stored alarm a copy was taken from
    pub(crate) fn alarm_mut(&mut self, alarm: &Alarm) -> Option<&mut Alarm> {
        let key = alarm.event()?;
        self.calendars
            .get_mut(key.calendar)?
            .event_mut(&key.event_id)?
            .alarm_mut(alarm.slot())
    }

    /// The earliest alarm of a timed event that has not fired and is not in the past
    pub fn nearest_alarm(&self, now: DateTime<Local>) -> Option<&Alarm> {
        self.events()
            .filter(|event| !event.is_full_day())
            .flat_map(|event| event.alarms())
            .filter(|alarm| alarm.is_pending(now))
            .min_by_key(|alarm| alarm.trigger())
    }

    /// The next event to start after `now`
    pub fn nearest_event(&self, now: DateTime<Local>) -> Option<&Event> {
        self.events()
            .filter(|event| event.start() > now)
            .min_by_key(|event| event.start())
    }

    /// Unused alarms of full-day events that go off on `today`
    pub fn full_day_alarms_on(&self, today: NaiveDate) -> Vec<Alarm> {
        self.events()
            .filter(|event| event.is_full_day())
            .flat_map(|event| event.alarms())
            .filter(|alarm| !alarm.is_used() && alarm.trigger().date_naive() == today)
            .cloned()
            .collect()
    }

    /// Print the calendars with their upcoming events and alarms
    pub fn print_upcoming(&self) {
        println!("Read {} calendars:", self.calendars.len());
        for calendar in &self.calendars {
            println!("  Calendar: {}", calendar);
            let mut events: Vec<_> = calendar.events().collect();
            events.sort_by_key(|e| e.start());
            for event in events {
                for line in event.to_string().lines() {
                    println!("      {}", line);
                }
            }
        }
    }
}
