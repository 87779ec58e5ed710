use chrono::Duration;
use color_eyre::eyre::{bail, Result};
use log::warn;
use regex::Regex;
use std::sync::OnceLock;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// chrono panics on durations beyond this many seconds
const MAX_SECONDS: i64 = i64::MAX / 1000;

/// One pattern per unit, paired with the number of seconds in that unit
fn unit_patterns() -> &'static [(Regex, i64)] {
    static PATTERNS: OnceLock<Vec<(Regex, i64)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            ("S", 1),
            ("M", SECONDS_PER_MINUTE),
            ("H", SECONDS_PER_HOUR),
            ("D", SECONDS_PER_DAY),
            ("W", SECONDS_PER_WEEK),
        ]
        .into_iter()
        .map(|(unit, seconds)| {
            let pattern = Regex::new(&format!(r"(\d+){}", unit)).expect("unit pattern is valid");
            (pattern, seconds)
        })
        .collect()
    })
}

/// Parse an iCalendar duration such as `-PT15M` or `P1DT2H`
///
/// The first `<number><unit>` match of each unit is summed up and the total is negated when the
/// text starts with a minus sign. A total of zero is treated as an error since it can not be told
/// apart from text that did not contain a duration at all.
pub fn parse_ical_duration(value: &str) -> Result<Duration> {
    let mut total_seconds: i64 = 0;

    for (pattern, unit_seconds) in unit_patterns() {
        let Some(captures) = pattern.captures(value) else {
            continue;
        };
        let component = match captures[1].parse::<i64>() {
            Ok(quantity) => quantity.checked_mul(*unit_seconds),
            Err(_) => None,
        };
        match component.and_then(|seconds| total_seconds.checked_add(seconds)) {
            Some(sum) => total_seconds = sum,
            None => warn!("ignoring oversized duration component {:?} in {:?}", &captures[0], value),
        }
    }

    if total_seconds == 0 {
        bail!("no valid non-zero duration found in {:?}", value);
    }
    if total_seconds > MAX_SECONDS {
        bail!("duration {:?} is out of range", value);
    }

    if value.trim_start().starts_with('-') {
        total_seconds = -total_seconds;
    }
    Ok(Duration::seconds(total_seconds))
}
