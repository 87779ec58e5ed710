use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use log::{debug, error, warn};
use regex::RegexSet;
use std::{fmt, sync::OnceLock};
use unescaper::unescape;

use super::alarm::{alarm_trigger, Alarm, EventKey};
use super::duration::parse_ical_duration;
use crate::configuration::calendar_source_config::CalendarSourceConfig;

/// An enum to help us determine how to parse a given date based on the regex that matched
enum ParseType {
    ParseUtcDateTime,
    ParseDateTime,
    ParseDate,
}

const START_DATETIME_FORMAT: &str = "%a %B %d, %Y at %H:%M";
const END_DATETIME_FORMAT: &str = "%H:%M";

/// Events without an end finish at this time on the day they start
const MISSING_END_HOUR: u32 = 23;
const MISSING_END_MINUTE: u32 = 59;

/// How alarms are added to events that come without (or despite) their own alarms
#[derive(Clone, Copy, Debug)]
pub struct DefaultReminders<'a> {
    pub source_config: &'a CalendarSourceConfig,
    pub force: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    title: String,
    id: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    full_day: bool,
    alarms: Vec<Alarm>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = if self.full_day {
            format!("{} (full day)", self.start.format("%a %B %d, %Y"))
        } else {
            format!(
                "{} to {}",
                self.start.format(START_DATETIME_FORMAT),
                self.end.format(END_DATETIME_FORMAT)
            )
        };
        write!(f, "{} ({})", self.title, span)?;
        for alarm in &self.alarms {
            write!(f, "\n  alarm at {}", alarm.trigger().format(START_DATETIME_FORMAT))?;
            if alarm.is_used() {
                write!(f, " (used)")?;
            }
        }
        Ok(())
    }
}

impl Event {
    /// Build an event from its iCalendar component
    ///
    /// Returns `Ok(None)` for events that are already over at `now`.
    pub fn new(
        event: &IcalEvent,
        calendar: usize,
        defaults: DefaultReminders,
        now: DateTime<Local>,
    ) -> Result<Option<Event>> {
        let mut title = None;
        let mut id = None;
        let mut start = None;
        let mut end = None;
        let mut duration = None;

        for property in &event.properties {
            match property.name.as_str() {
                "SUMMARY" => title = property.value.as_deref().map(unescape_text),
                "UID" => id = property.value.clone(),
                "DTSTART" => start = Some(property_to_time(property).wrap_err("could not parse DTSTART")?),
                "DTEND" => match property_to_time(property) {
                    Ok(time) => end = Some(time),
                    Err(err) => warn!("ignoring unparsable DTEND: {:#}", err),
                },
                "DURATION" => match property.value.as_deref().map(parse_ical_duration) {
                    Some(Ok(parsed)) => duration = Some(parsed),
                    Some(Err(err)) => warn!("ignoring unparsable DURATION: {:#}", err),
                    None => {}
                },
                _ => log::trace!("skipping property: {}", property.name),
            }
        }

        let Some(start) = start else {
            bail!("event has no start time");
        };
        let end = match (end, duration) {
            (Some(end), _) => end,
            (None, Some(duration)) => start
                .checked_add_signed(duration)
                .ok_or(eyre!("event duration is out of range"))?,
            (None, None) => end_of_start_day(start)?,
        };

        if end <= now {
            return Ok(None);
        }

        let title = title.unwrap_or_default();
        let id = id.unwrap_or_else(|| {
            let synthetic = format!("{}-{}", start.format("%Y%m%dT%H%M%S"), title);
            debug!("event has no UID, using {:?}", synthetic);
            synthetic
        });
        let full_day = is_full_day(&start, &end);

        let key = EventKey::new(calendar, &id);
        let mut alarms: Vec<Alarm> = Vec::new();

        // extract imported alarms
        for valarm in &event.alarms {
            match alarm_trigger(valarm, start, end) {
                Ok(trigger) => alarms.push(Alarm::new(key.clone(), alarms.len(), trigger)),
                Err(err) => error!("failed to get alarm time for event {:?}: {:#}", title, err),
            }
        }

        // add default alarms
        if alarms.is_empty() || defaults.force {
            for offset in defaults.source_config.default_offsets(full_day) {
                let trigger = offset.duration().and_then(|offset| {
                    start
                        .checked_sub_signed(offset)
                        .ok_or(eyre!("reminder offset is out of range"))
                });
                match trigger {
                    Ok(trigger) => alarms.push(Alarm::new(key.clone(), alarms.len(), trigger)),
                    Err(err) => error!(
                        "failed to compute default reminder {:?} of calendar {:?}: {:#}",
                        offset.as_str(),
                        defaults.source_config.name,
                        err
                    ),
                }
            }
        }

        Ok(Some(Event {
            title,
            id,
            start,
            end,
            full_day,
            alarms,
        }))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> DateTime<Local> {
        self.start
    }

    pub fn end(&self) -> DateTime<Local> {
        self.end
    }

    pub fn is_full_day(&self) -> bool {
        self.full_day
    }

    /// Day and time of the start as shown to the user, e.g. `on 10.3. at 12:10`
    pub fn when(&self) -> String {
        if self.full_day {
            self.start.format("on %-d.%-m. (fullday)").to_string()
        } else {
            self.start.format("on %-d.%-m. at %H:%M").to_string()
        }
    }

    pub fn alarms(&self) -> &[Alarm] {
        self.alarms.as_ref()
    }

    pub(crate) fn alarm_mut(&mut self, slot: usize) -> Option<&mut Alarm> {
        self.alarms.get_mut(slot)
    }
}

/// An event is full-day when it runs from one local midnight to the next
pub fn is_full_day(start: &DateTime<Local>, end: &DateTime<Local>) -> bool {
    // measured on the wall clock so that days with a DST switch still count
    start.num_seconds_from_midnight() == 0
        && end.num_seconds_from_midnight() == 0
        && end.naive_local() - start.naive_local() == Duration::hours(24)
}

fn end_of_start_day(start: DateTime<Local>) -> Result<DateTime<Local>> {
    let naive = start
        .date_naive()
        .and_hms_opt(MISSING_END_HOUR, MISSING_END_MINUTE, 0)
        .ok_or(eyre!("could not build the end of the start day"))?;
    resolve_local(naive.and_local_timezone(Local))
}

/// Unescape an iCalendar text value, keeping the raw text if it does not unescape cleanly
fn unescape_text(value: &str) -> String {
    // we have to strip out escaped commas and semicolons so they don't trip up unescape
    let value = value.replace(r"\,", ",").replace(r"\;", ";");
    unescape(&value).unwrap_or_else(|err| {
        debug!("could not unescape {:?}: {}", value, err);
        value
    })
}

fn time_patterns() -> &'static RegexSet {
    static PATTERNS: OnceLock<RegexSet> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        RegexSet::new([r"^\d{8}T\d{6}Z$", r"^\d{8}T\d{6}$", r"^\d{8}$"])
            .expect("time patterns are valid")
    })
}

/// Pick the instant for a local wall clock time, bailing on times skipped by a DST switch
fn resolve_local<T: TimeZone>(result: LocalResult<DateTime<T>>) -> Result<DateTime<T>> {
    match result {
        LocalResult::None => bail!("no sensible time for given value"),
        LocalResult::Single(time) => Ok(time),
        LocalResult::Ambiguous(time, _second_time) => Ok(time),
    }
}

/// The time zone named by the TZID parameter of a property, if any
fn property_timezone(property: &Property) -> Option<&str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(name, _values)| name == "TZID")?
        .1
        .first()
        .map(|tz_name| tz_name.trim_matches('"'))
}

/// Given a time based ical property, parse it into a local DateTime
///
/// Floating times and plain dates are taken as local time. Times with an unknown TZID are treated
/// as floating.
pub(crate) fn property_to_time(property: &Property) -> Result<DateTime<Local>> {
    let prop_value = property
        .value
        .as_deref()
        .map(str::trim)
        .ok_or(eyre!("no value for {}", property.name))?;

    let parse_type = match time_patterns().matches(prop_value).into_iter().next() {
        Some(0) => ParseType::ParseUtcDateTime,
        Some(1) => ParseType::ParseDateTime,
        Some(_) => ParseType::ParseDate,
        None => bail!("unrecognized time format: {:?}", prop_value),
    };

    let time = match parse_type {
        ParseType::ParseUtcDateTime => {
            let naive = NaiveDateTime::parse_from_str(prop_value, "%Y%m%dT%H%M%SZ")
                .wrap_err("could not parse this time")?;
            Utc.from_utc_datetime(&naive).with_timezone(&Local)
        }
        ParseType::ParseDateTime => {
            let naive = NaiveDateTime::parse_from_str(prop_value, "%Y%m%dT%H%M%S")
                .wrap_err("could not parse this time")?;
            match property_timezone(property).map(|name| (name, name.parse::<Tz>())) {
                Some((_, Ok(tz))) => resolve_local(naive.and_local_timezone(tz))?.with_timezone(&Local),
                Some((name, Err(_))) => {
                    warn!("unknown time zone {:?}, reading {} as local time", name, property.name);
                    resolve_local(naive.and_local_timezone(Local))?
                }
                None => resolve_local(naive.and_local_timezone(Local))?,
            }
        }
        ParseType::ParseDate => {
            let midnight = NaiveDate::parse_from_str(prop_value, "%Y%m%d")
                .wrap_err("could not parse this date")?
                .and_hms_opt(0, 0, 0)
                .ok_or(eyre!("could not build midnight"))?;
            resolve_local(midnight.and_local_timezone(Local))?
        }
    };

    Ok(time)
}

#[cfg(test)]
mod tests {
    use ical::IcalParser;
    use indoc::formatdoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::configuration::types::config_duration::ConfigDuration;
    use crate::test_utils::{ical_local, local};

    fn source_config(offsets: &[&str], full_day_offsets: &[&str]) -> CalendarSourceConfig {
        CalendarSourceConfig {
            name: "test".into(),
            source: "https://example.com/test.ics".into(),
            offsets: offsets.iter().map(|o| ConfigDuration::from(*o)).collect(),
            full_day_offsets: full_day_offsets.iter().map(|o| ConfigDuration::from(*o)).collect(),
            open_client_cmd: None,
        }
    }

    fn parse_event(body: &str) -> IcalEvent {
        let text = formatdoc! {"
            BEGIN:VCALENDAR
            VERSION:2.0
            {body}
            END:VCALENDAR
        "};
        let calendar = IcalParser::new(text.as_bytes()).next().unwrap().unwrap();
        calendar.events.into_iter().next().unwrap()
    }

    fn build(body: &str, config: &CalendarSourceConfig, force: bool, now: DateTime<Local>) -> Option<Event> {
        let defaults = DefaultReminders {
            source_config: config,
            force,
        };
        Event::new(&parse_event(body), 0, defaults, now).unwrap()
    }

    #[test]
    fn classifies_full_day_events() {
        let midnight = local(2030, 3, 12, 0, 0);

        assert!(is_full_day(&midnight, &local(2030, 3, 13, 0, 0)));
        assert!(!is_full_day(&midnight, &local(2030, 3, 12, 12, 0)));
        assert!(!is_full_day(&midnight, &local(2030, 3, 14, 0, 0)));
        assert!(!is_full_day(&local(2030, 3, 12, 1, 0), &local(2030, 3, 13, 1, 0)));
    }

    #[test]
    fn date_only_events_are_full_day() {
        let now = local(2030, 3, 10, 12, 0);
        let config = source_config(&["5m"], &["-9h"]);
        let event = build(
            &formatdoc! {"
                BEGIN:VEVENT
                UID:holiday
                SUMMARY:Holiday
                DTSTART;VALUE=DATE:20300312
                DTEND;VALUE=DATE:20300313
                END:VEVENT
            "},
            &config,
            false,
            now,
        )
        .unwrap();

        assert!(event.is_full_day());
        assert_eq!(event.start(), local(2030, 3, 12, 0, 0));
        assert_eq!(event.when(), "on 12.3. (fullday)");
        // "-9h" before the start means nine in the morning
        assert_eq!(event.alarms().len(), 1);
        assert_eq!(event.alarms()[0].trigger(), local(2030, 3, 12, 9, 0));
    }

    #[test]
    fn declared_alarms_suppress_defaults() {
        let now = local(2030, 3, 10, 12, 0);
        let config = source_config(&["5m", "1h"], &[]);
        let body = formatdoc! {"
            BEGIN:VEVENT
            UID:standup
            SUMMARY:Standup\\, daily
            DTSTART:{start}
            DTEND:{end}
            BEGIN:VALARM
            ACTION:DISPLAY
            TRIGGER:-PT15M
            END:VALARM
            END:VEVENT
            ",
            start = ical_local(local(2030, 3, 11, 9, 0)),
            end = ical_local(local(2030, 3, 11, 9, 15)),
        };

        let event = build(&body, &config, false, now).unwrap();
        assert_eq!(event.title(), "Standup, daily");
        assert!(!event.is_full_day());
        let triggers: Vec<_> = event.alarms().iter().map(Alarm::trigger).collect();
        assert_eq!(triggers, vec![local(2030, 3, 11, 8, 45)]);

        let forced = build(&body, &config, true, now).unwrap();
        let triggers: Vec<_> = forced.alarms().iter().map(Alarm::trigger).collect();
        assert_eq!(
            triggers,
            vec![
                local(2030, 3, 11, 8, 45),
                local(2030, 3, 11, 8, 55),
                local(2030, 3, 11, 8, 0)
            ]
        );
        let slots: Vec<_> = forced.alarms().iter().map(Alarm::slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn events_without_alarms_get_defaults() {
        let now = local(2030, 3, 10, 12, 0);
        let config = source_config(&["5m", "nonsense"], &["-9h"]);
        let body = formatdoc! {"
            BEGIN:VEVENT
            UID:dentist
            SUMMARY:Dentist
            DTSTART:{start}
            DTEND:{end}
            END:VEVENT
            ",
            start = ical_local(local(2030, 3, 10, 15, 0)),
            end = ical_local(local(2030, 3, 10, 16, 0)),
        };

        let event = build(&body, &config, false, now).unwrap();
        let triggers: Vec<_> = event.alarms().iter().map(Alarm::trigger).collect();
        assert_eq!(triggers, vec![local(2030, 3, 10, 14, 55)]);
        assert_eq!(
            event.alarms()[0].event(),
            Some(&EventKey::new(0, "dentist"))
        );
    }

    #[test]
    fn missing_end_defaults_to_the_end_of_the_start_day() {
        let now = local(2030, 3, 10, 12, 0);
        let config = source_config(&[], &[]);
        let body = formatdoc! {"
            BEGIN:VEVENT
            UID:open-ended
            SUMMARY:Open ended
            DTSTART:{start}
            END:VEVENT
            ",
            start = ical_local(local(2030, 3, 10, 18, 30)),
        };

        let event = build(&body, &config, false, now).unwrap();
        assert_eq!(event.end(), local(2030, 3, 10, 23, 59));
        assert!(event.alarms().is_empty());
    }

    #[test]
    fn duration_sets_the_end_when_dtend_is_missing() {
        let now = local(2030, 3, 10, 12, 0);
        let config = source_config(&[], &[]);
        let body = formatdoc! {"
            BEGIN:VEVENT
            UID:workshop
            SUMMARY:Workshop
            DTSTART:{start}
            DURATION:PT2H
            END:VEVENT
            ",
            start = ical_local(local(2030, 3, 10, 13, 0)),
        };

        let event = build(&body, &config, false, now).unwrap();
        assert_eq!(event.end(), local(2030, 3, 10, 15, 0));
        assert_eq!(event.when(), "on 10.3. at 13:00");
    }

    #[test]
    fn ended_events_are_dropped() {
        let now = local(2030, 3, 10, 12, 0);
        let config = source_config(&["5m"], &[]);
        let body = formatdoc! {"
            BEGIN:VEVENT
            UID:breakfast
            SUMMARY:Breakfast
            DTSTART:{start}
            DTEND:{end}
            END:VEVENT
            ",
            start = ical_local(local(2030, 3, 10, 8, 0)),
            end = ical_local(local(2030, 3, 10, 9, 0)),
        };

        assert_eq!(build(&body, &config, false, now), None);
    }

    #[test]
    fn event_without_start_is_an_error() {
        let config = source_config(&[], &[]);
        let defaults = DefaultReminders {
            source_config: &config,
            force: false,
        };
        let event = parse_event("BEGIN:VEVENT\nUID:x\nSUMMARY:No start\nEND:VEVENT");

        assert!(Event::new(&event, 0, defaults, local(2030, 3, 10, 12, 0)).is_err());
    }

    #[test]
    fn parses_utc_and_zoned_times() {
        let utc = Property {
            name: "DTSTART".into(),
            params: None,
            value: Some("20300310T120000Z".into()),
        };
        let expected = Utc.with_ymd_and_hms(2030, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(property_to_time(&utc).unwrap(), expected);

        let zoned = Property {
            name: "DTSTART".into(),
            params: Some(vec![("TZID".into(), vec!["Europe/Prague".into()])]),
            value: Some("20300710T140000".into()),
        };
        // Prague is on CEST (UTC+2) in July
        let expected = Utc.with_ymd_and_hms(2030, 7, 10, 12, 0, 0).unwrap();
        assert_eq!(property_to_time(&zoned).unwrap(), expected);
    }

    #[test]
    fn unknown_time_zones_fall_back_to_local_time() {
        let property = Property {
            name: "DTSTART".into(),
            params: Some(vec![("TZID".into(), vec!["Mars/Olympus_Mons".into()])]),
            value: Some("20300310T140000".into()),
        };

        assert_eq!(property_to_time(&property).unwrap(), local(2030, 3, 10, 14, 0));
    }

    #[test]
    fn rejects_unknown_time_formats() {
        let property = Property {
            name: "DTSTART".into(),
            params: None,
            value: Some("tomorrow".into()),
        };

        assert!(property_to_time(&property).is_err());
    }
}
