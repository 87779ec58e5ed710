use log::info;

use crate::configuration::config::Config;
use crate::model::event::Event;
use crate::scheduler::command::{ClientTarget, Command};

const NO_EVENTS_STATUS: &str = "calbell is running\nno events in the future found";

/// A menu entry that opens a calendar client
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientEntry {
    pub label: String,
    pub target: ClientTarget,
}

impl ClientEntry {
    pub fn command(&self) -> Command {
        Command::OpenClient(self.target.clone())
    }

    /// The client entries for a config
    ///
    /// A global client command replaces the per calendar entries.
    pub fn from_config(config: &Config) -> Vec<ClientEntry> {
        if config.client_cmd().is_some() {
            return vec![ClientEntry {
                label: "Open client".into(),
                target: ClientTarget::Global,
            }];
        }
        config
            .calendar_sources
            .iter()
            .filter(|source| source.client_cmd().is_some())
            .map(|source| ClientEntry {
                label: format!("Open client: {}", source.name),
                target: ClientTarget::Calendar(source.name.clone()),
            })
            .collect()
    }
}

/// Where the scheduler shows what is coming up next
pub trait StatusDisplay {
    fn show_status(&mut self, status: &str);

    fn show_clients(&mut self, clients: &[ClientEntry]);
}

/// Writes status changes to the log, used when there is no tray
#[derive(Debug, Default)]
pub struct LogDisplay {
    last_status: Option<String>,
}

impl StatusDisplay for LogDisplay {
    fn show_status(&mut self, status: &str) {
        if self.last_status.as_deref() != Some(status) {
            info!("{}", status.replace('\n', ", "));
            self.last_status = Some(status.to_owned());
        }
    }

    fn show_clients(&mut self, clients: &[ClientEntry]) {
        for client in clients {
            log::debug!("client available: {}", client.label);
        }
    }
}

/// Describe the next upcoming event for the tray tooltip
pub fn status_line(event: Option<&Event>) -> String {
    let Some(event) = event else {
        return NO_EVENTS_STATUS.to_owned();
    };
    format!("next: {}\n{}", event.title(), event.when())
}
