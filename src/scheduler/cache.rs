use chrono::NaiveDate;
use log::debug;
use std::collections::HashSet;

/// Ids of full-day events that were already announced today
#[derive(Debug, Default)]
pub struct DedupCache {
    day: Option<NaiveDate>,
    notified: HashSet<String>,
}

impl DedupCache {
    /// Forget everything when `today` is not the day the cache was filled on
    ///
    /// Returns whether the cache was cleared.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.day == Some(today) {
            return false;
        }
        debug!("new day {}, clearing {} notified events", today, self.notified.len());
        self.day = Some(today);
        self.notified.clear();
        true
    }

    /// Remember an event, returns false if it was already there
    pub fn insert(&mut self, event_id: &str) -> bool {
        self.notified.insert(event_id.to_owned())
    }
}
