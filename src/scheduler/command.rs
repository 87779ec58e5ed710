/// Which client command to launch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientTarget {
    /// The config wide `open_client_cmd`
    Global,
    /// The client of the calendar with this name
    Calendar(String),
}

/// Requests sent to the scheduler from the tray menu
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Read the config file again
    Reload,
    /// Download all calendars right away
    ForceFetch,
    OpenClient(ClientTarget),
    /// Leave the scheduler loop
    ///
    /// The tray and Ctrl-C end the process themselves, so a busy scheduler can not delay them.
    Quit,
}
