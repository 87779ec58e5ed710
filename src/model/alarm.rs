use chrono::{DateTime, Local};
use color_eyre::eyre::{eyre, Result, WrapErr};
use ical::parser::ical::component::IcalAlarm;
use ical::property::Property;

use super::duration::parse_ical_duration;
use super::event::property_to_time;

/// Identifies an event inside the active calendar collection
///
/// Event ids are only unique within a calendar, so the calendar's position is part of the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub calendar: usize,
    pub event_id: String,
}

impl EventKey {
    pub fn new(calendar: usize, event_id: &str) -> Self {
        EventKey {
            calendar,
            event_id: event_id.to_owned(),
        }
    }
}

/// A moment at which a reminder for an event should be shown
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alarm {
    /// The owning event, `None` for placeholder alarms
    event: Option<EventKey>,
    /// Position of this alarm in the owning event's alarm list
    slot: usize,
    trigger: DateTime<Local>,
    used: bool,
}

impl Alarm {
    pub(crate) fn new(event: EventKey, slot: usize, trigger: DateTime<Local>) -> Self {
        Alarm {
            event: Some(event),
            slot,
            trigger,
            used: false,
        }
    }

    /// An alarm that belongs to no event
    ///
    /// The scheduler uses it to put an upper bound on its sleep when there is nothing to remind of.
    pub fn placeholder(trigger: DateTime<Local>) -> Self {
        Alarm {
            event: None,
            slot: 0,
            trigger,
            used: false,
        }
    }

    pub fn event(&self) -> Option<&EventKey> {
        self.event.as_ref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.event.is_none()
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn trigger(&self) -> DateTime<Local> {
        self.trigger
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub(crate) fn mark_used(&mut self) {
        self.used = true;
    }

    /// Whether this alarm still has to fire
    pub fn is_pending(&self, now: DateTime<Local>) -> bool {
        !self.used && self.trigger >= now
    }
}

fn param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(param_name, _)| param_name == name)?
        .1
        .first()
        .map(String::as_str)
}

/// Resolve the instant at which a VALARM fires for an event running from `start` to `end`
///
/// Relative triggers are offsets from the start unless they say `RELATED=END`, absolute ones
/// (`VALUE=DATE-TIME`) are taken as they are.
pub(crate) fn alarm_trigger(
    alarm: &IcalAlarm,
    start: DateTime<Local>,
    end: DateTime<Local>,
) -> Result<DateTime<Local>> {
    let trigger = alarm
        .properties
        .iter()
        .find(|property| property.name == "TRIGGER")
        .ok_or(eyre!("alarm has no trigger"))?;

    if param(trigger, "VALUE").is_some_and(|value| value.eq_ignore_ascii_case("DATE-TIME")) {
        return property_to_time(trigger).wrap_err("unable to parse absolute alarm trigger");
    }

    let offset = parse_ical_duration(trigger.value.as_deref().unwrap_or_default())
        .wrap_err("unable to parse alarm trigger time")?;
    let anchor = match param(trigger, "RELATED") {
        Some(related) if related.eq_ignore_ascii_case("END") => end,
        _ => start,
    };
    anchor
        .checked_add_signed(offset)
        .ok_or(eyre!("alarm trigger {:?} is out of range", trigger.value))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::local;

    fn valarm(params: Option<Vec<(&str, &str)>>, value: &str) -> IcalAlarm {
        let mut alarm = IcalAlarm::new();
        alarm.properties.push(Property {
            name: "TRIGGER".into(),
            params: params.map(|params| {
                params
                    .into_iter()
                    .map(|(name, value)| (name.to_owned(), vec![value.to_owned()]))
                    .collect()
            }),
            value: Some(value.into()),
        });
        alarm
    }

    #[test]
    fn relative_triggers_offset_from_the_start() {
        let start = local(2030, 3, 10, 14, 0);
        let end = local(2030, 3, 10, 15, 0);

        let trigger = alarm_trigger(&valarm(None, "-PT10M"), start, end).unwrap();
        assert_eq!(trigger, local(2030, 3, 10, 13, 50));

        let related_start = valarm(Some(vec![("RELATED", "START")]), "PT5M");
        assert_eq!(alarm_trigger(&related_start, start, end).unwrap(), local(2030, 3, 10, 14, 5));
    }

    #[test]
    fn related_end_offsets_from_the_end() {
        let start = local(2030, 3, 10, 14, 0);
        let end = local(2030, 3, 10, 15, 0);

        let alarm = valarm(Some(vec![("RELATED", "END")]), "-PT5M");
        assert_eq!(alarm_trigger(&alarm, start, end).unwrap(), local(2030, 3, 10, 14, 55));
    }

    #[test]
    fn absolute_triggers_are_used_as_is() {
        let start = local(2030, 3, 10, 14, 0);
        let end = local(2030, 3, 10, 15, 0);

        let alarm = valarm(Some(vec![("VALUE", "DATE-TIME")]), "20300309T080000");
        assert_eq!(alarm_trigger(&alarm, start, end).unwrap(), local(2030, 3, 9, 8, 0));
    }

    #[test]
    fn broken_triggers_are_errors() {
        let start = local(2030, 3, 10, 14, 0);
        let end = local(2030, 3, 10, 15, 0);

        assert!(alarm_trigger(&valarm(None, "PT0S"), start, end).is_err());
        assert!(alarm_trigger(&IcalAlarm::new(), start, end).is_err());
    }

    #[test]
    fn used_and_past_alarms_are_not_pending() {
        let now = local(2030, 3, 10, 12, 0);
        let mut alarm = Alarm::new(EventKey::new(0, "a"), 0, local(2030, 3, 10, 13, 0));
        assert!(alarm.is_pending(now));

        alarm.mark_used();
        assert!(!alarm.is_pending(now));

        let past = Alarm::new(EventKey::new(0, "a"), 1, local(2030, 3, 10, 11, 0));
        assert!(!past.is_pending(now));
        assert!(Alarm::placeholder(now).is_placeholder());
    }
}
