use chrono::{DateTime, Local};
use color_eyre::eyre::{bail, Result, WrapErr};
use ical::parser::ical::component::IcalCalendar;
use ical::IcalParser;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;

use super::event::{DefaultReminders, Event};
use crate::configuration::calendar_source_config::CalendarSourceConfig;

#[derive(Debug, PartialEq, Eq)]
pub struct Calendar {
    /// The user visible name of the calendar
    name: String,
    source: String,
    /// Upcoming events by id
    events: BTreeMap<String, Event>,
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n    {}\n    {} upcoming events, {} alarms",
            self.name,
            self.source,
            self.events.len(),
            self.events.values().map(|e| e.alarms().len()).sum::<usize>()
        )
    }
}

impl Calendar {
    /// Create an empty calendar for a configured source
    pub fn new(source_config: &CalendarSourceConfig) -> Calendar {
        Calendar {
            name: source_config.name.clone(),
            source: source_config.source.clone(),
            events: BTreeMap::new(),
        }
    }

    /// Parse calendar data from ICS
    ///
    /// Anything that implements BufRead such as a File or String::as_bytes() can be used. All
    /// VCALENDAR blocks in the data end up in one calendar; a block that fails to parse fails the
    /// whole source.
    pub fn parse_calendar<B>(
        buf: B,
        index: usize,
        source_config: &CalendarSourceConfig,
        force_default_reminders: bool,
        now: DateTime<Local>,
    ) -> Result<Calendar>
    where
        B: BufRead,
    {
        debug!("parsing calendar {:?}...", source_config.name);
        let mut calendar = Calendar::new(source_config);
        let defaults = DefaultReminders {
            source_config,
            force: force_default_reminders,
        };

        let mut blocks = 0;
        for ical_calendar in IcalParser::new(buf) {
            let ical_calendar = ical_calendar.wrap_err("could not parse calendar data")?;
            calendar.add_events(&ical_calendar, index, defaults, now);
            blocks += 1;
        }

        if blocks == 0 {
            bail!("no calendar found in the data of {:?}", source_config.name);
        }
        debug!(
            "calendar {:?} has {} upcoming events",
            calendar.name,
            calendar.events.len()
        );
        Ok(calendar)
    }

    fn add_events(
        &mut self,
        ical_calendar: &IcalCalendar,
        index: usize,
        defaults: DefaultReminders,
        now: DateTime<Local>,
    ) {
        for ical_event in &ical_calendar.events {
            match Event::new(ical_event, index, defaults, now) {
                // a later event with the same id replaces the earlier one
                Ok(Some(event)) => {
                    self.events.insert(event.id().to_owned(), event);
                }
                Ok(None) => {}
                Err(err) => warn!("skipping event in calendar {:?}: {:#}", self.name, err),
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    pub(crate) fn event_mut(&mut self, id: &str) -> Option<&mut Event> {
        self.events.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
