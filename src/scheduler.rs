use chrono::{DateTime, Duration, Local};
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;

pub mod cache;
pub mod command;

use self::cache::DedupCache;
use self::command::{ClientTarget, Command};
use crate::configuration::config::Config;
use crate::display::{status_line, ClientEntry, LogDisplay, StatusDisplay};
use crate::model::alarm::Alarm;
use crate::model::calendar_collection::CalendarCollection;
use crate::model::calendar_source::SourceReader;
use crate::notifier::{DesktopNotifier, Message, Notifier};
use crate::util::open_client;

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// The deadlines the scheduler sleeps towards in one round
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    /// The nearest pending alarm, or a placeholder when there is none
    pub alarm: Alarm,
    /// When the calendars have to be downloaded again
    pub fetch_due: DateTime<Local>,
}

impl Plan {
    pub fn deadline(&self) -> DateTime<Local> {
        self.alarm.trigger().min(self.fetch_due)
    }
}

/// Why the scheduler woke up
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wake {
    Alarm,
    FetchDue,
    Command(Command),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Owns everything the reminder loop works on
///
/// Every round starts from scratch: the nearest alarm and the next event are looked up again in
/// the current calendar collection, which a fetch replaces as a whole.
pub struct Scheduler {
    config_path: PathBuf,
    config: Config,
    fetch_period: Duration,
    collection: CalendarCollection,
    last_fetch: Option<DateTime<Local>>,
    fetch_requested: bool,
    cache: DedupCache,
    commands: Receiver<Command>,
    commands_open: bool,
    reader: Box<dyn SourceReader + Send>,
    notifier: Box<dyn Notifier + Send>,
    display: Box<dyn StatusDisplay + Send>,
    clock: Box<dyn Clock + Send>,
}

impl Scheduler {
    pub fn new(
        config_path: PathBuf,
        config: Config,
        commands: Receiver<Command>,
        reader: Box<dyn SourceReader + Send>,
    ) -> Scheduler {
        Scheduler {
            config_path,
            fetch_period: config.fetch_period_duration(),
            config,
            collection: CalendarCollection::default(),
            last_fetch: None,
            fetch_requested: false,
            cache: DedupCache::default(),
            commands,
            commands_open: true,
            reader,
            notifier: Box::new(DesktopNotifier),
            display: Box::new(LogDisplay::default()),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier + Send>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_display(mut self, display: Box<dyn StatusDisplay + Send>) -> Self {
        self.display = display;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock + Send>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn collection(&self) -> &CalendarCollection {
        &self.collection
    }

    pub fn last_fetch(&self) -> Option<DateTime<Local>> {
        self.last_fetch
    }

    /// Run rounds until a quit command arrives
    pub fn run(mut self) {
        info!("scheduler started");
        self.publish_clients();
        loop {
            let plan = self.prepare();
            let wake = self.wait(&plan);
            if self.handle(wake, &plan) == Flow::Quit {
                info!("quit requested, goodbye");
                return;
            }
        }
    }

    /// Bring the state up to date and work out what to wait for
    ///
    /// Clears the dedup cache on a new day, fetches when due or requested, fires today's
    /// full-day alarms and updates the status display.
    pub fn prepare(&mut self) -> Plan {
        let now = self.clock.now();
        self.cache.roll_over(now.date_naive());

        if self.fetch_requested || self.fetch_due(now) {
            self.fetch();
        }

        let now = self.clock.now();
        for alarm in self.collection.full_day_alarms_on(now.date_naive()) {
            self.notify(&alarm);
        }

        let alarm = match self.collection.nearest_alarm(now) {
            Some(alarm) => alarm.clone(),
            None => {
                debug!("no pending alarms, waking up after the fetch period at the latest");
                Alarm::placeholder(now + self.fetch_period)
            }
        };
        let status = status_line(self.collection.nearest_event(now));
        self.display.show_status(&status);

        let fetch_due = self.last_fetch.unwrap_or(now) + self.fetch_period;
        debug!(
            "nearest alarm: {}, sleep time: {}",
            alarm.trigger().format("%b %d %H:%M:%S%.3f"),
            alarm.trigger().min(fetch_due) - now
        );
        Plan { alarm, fetch_due }
    }

    /// Block until the plan's deadline passes or a command arrives
    pub fn wait(&mut self, plan: &Plan) -> Wake {
        let timeout = (plan.deadline() - self.clock.now()).to_std().unwrap_or_default();

        if self.commands_open {
            match self.commands.recv_timeout(timeout) {
                Ok(command) => return Wake::Command(command),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("command channel closed, only timers will wake the scheduler");
                    self.commands_open = false;
                    let remaining = (plan.deadline() - self.clock.now()).to_std().unwrap_or_default();
                    thread::sleep(remaining);
                }
            }
        } else {
            thread::sleep(timeout);
        }

        if plan.alarm.trigger() <= plan.fetch_due {
            Wake::Alarm
        } else {
            Wake::FetchDue
        }
    }

    /// React to a wake up, the next round does the rest
    pub fn handle(&mut self, wake: Wake, plan: &Plan) -> Flow {
        match wake {
            Wake::Alarm => {
                trace!("waking up for nearest alarm");
                self.notify(&plan.alarm);
            }
            Wake::FetchDue => trace!("waking up to fetch"),
            Wake::Command(Command::ForceFetch) => {
                info!("fetch requested");
                self.fetch_requested = true;
            }
            Wake::Command(Command::Reload) => self.reload(),
            Wake::Command(Command::OpenClient(target)) => self.open_client(&target),
            Wake::Command(Command::Quit) => return Flow::Quit,
        }
        Flow::Continue
    }

    fn fetch_due(&self, now: DateTime<Local>) -> bool {
        self.last_fetch
            .map_or(true, |last_fetch| now - last_fetch >= self.fetch_period)
    }

    /// Replace the calendar collection with a freshly downloaded one
    pub fn fetch(&mut self) {
        let now = self.clock.now();
        self.collection = CalendarCollection::fetch(&self.config, self.reader.as_ref(), now);
        self.last_fetch = Some(self.clock.now());
        self.fetch_requested = false;
    }

    /// Show the notification for an alarm
    ///
    /// Placeholder alarms are ignored and a full-day event is only announced once a day.
    /// Returns whether a notification was attempted.
    pub fn notify(&mut self, alarm: &Alarm) -> bool {
        let Some(key) = alarm.event() else {
            trace!("placeholder alarm, nothing to notify");
            return false;
        };
        let Some(event) = self.collection.event(key) else {
            warn!("alarm refers to an event that is gone: {:?}", key);
            return false;
        };

        let full_day = event.is_full_day();
        if full_day && !self.cache.insert(event.id()) {
            debug!("full-day event {:?} was already announced today", event.title());
            return false;
        }

        info!("creating notification for alarm of {:?}", event.title());
        let message = Message::for_event(event, self.clock.now(), &self.config.notification_icon_path());
        if let Err(err) = self.notifier.notify(&message) {
            error!("{:#}", err);
        }

        // full-day alarms are kept in check by the cache instead
        if !full_day {
            if let Some(stored) = self.collection.alarm_mut(alarm) {
                stored.mark_used();
            }
        }
        true
    }

    /// Read the config file again and fetch with the new sources
    ///
    /// A config file that can not be read leaves the current config in place.
    pub fn reload(&mut self) {
        info!("reloading config from {:?}", self.config_path);
        match Config::new(&self.config_path) {
            Ok(config) => {
                self.fetch_period = config.fetch_period_duration();
                self.config = config;
                self.fetch_requested = true;
                self.publish_clients();
            }
            Err(err) => error!("failed to reload config, keeping the current one: {:#}", err),
        }
    }

    fn open_client(&self, target: &ClientTarget) {
        let cmd = match target {
            ClientTarget::Global => self.config.client_cmd(),
            ClientTarget::Calendar(name) => self
                .config
                .calendar_source(name)
                .and_then(|source| source.client_cmd()),
        };
        match cmd {
            Some(cmd) => {
                info!("opening client: {}", cmd);
                if let Err(err) = open_client(cmd) {
                    error!("{:#}", err);
                }
            }
            None => warn!("no client command configured for {:?}", target),
        }
    }

    fn publish_clients(&mut self) {
        let clients = ClientEntry::from_config(&self.config);
        self.display.show_clients(&clients);
    }
}
