use color_eyre::eyre::Result;
use log::{debug, error, info};
use std::process;
use std::sync::mpsc::Sender;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

use crate::display::{ClientEntry, StatusDisplay};
use crate::scheduler::command::Command;

const ICON_SIZE: u32 = 32;
const STARTING_STATUS: &str = "calbell is starting";

/// Everything the tray event loop reacts to
#[derive(Debug)]
pub enum TrayEvent {
    Menu(MenuEvent),
    Status(String),
    Clients(Vec<ClientEntry>),
}

/// Forwards the scheduler's status to the tray running on the main thread
pub struct TrayDisplay {
    proxy: EventLoopProxy<TrayEvent>,
}

impl StatusDisplay for TrayDisplay {
    fn show_status(&mut self, status: &str) {
        if self.proxy.send_event(TrayEvent::Status(status.to_owned())).is_err() {
            error!("tray is gone, can not show status");
        }
    }

    fn show_clients(&mut self, clients: &[ClientEntry]) {
        if self.proxy.send_event(TrayEvent::Clients(clients.to_vec())).is_err() {
            error!("tray is gone, can not show client entries");
        }
    }
}

/// The tray icon with its menu, lives on the main thread
pub struct Tray {
    event_loop: EventLoop<TrayEvent>,
}

impl Default for Tray {
    fn default() -> Self {
        Self::new()
    }
}

impl Tray {
    pub fn new() -> Tray {
        let event_loop = EventLoopBuilder::<TrayEvent>::with_user_event().build();

        let proxy = event_loop.create_proxy();
        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            if proxy.send_event(TrayEvent::Menu(event)).is_err() {
                error!("tray is gone, dropping menu click");
            }
        }));

        Tray { event_loop }
    }

    pub fn display(&self) -> TrayDisplay {
        TrayDisplay {
            proxy: self.event_loop.create_proxy(),
        }
    }

    /// Run the UI until the process exits
    ///
    /// Menu clicks are turned into commands for the scheduler, except Quit which ends the process
    /// right here even while the scheduler is busy fetching.
    pub fn run(self, commands: Sender<Command>) -> ! {
        let mut state: Option<TrayState> = None;
        let mut status = STARTING_STATUS.to_owned();
        let mut clients = Vec::new();

        self.event_loop.run(move |event, _, control_flow| {
            *control_flow = ControlFlow::Wait;

            match event {
                // the icon can only be created once the platform UI is up
                Event::NewEvents(StartCause::Init) => match TrayState::build(&status, &clients) {
                    Ok(built) => {
                        info!("tray icon created");
                        state = Some(built);
                    }
                    Err(err) => {
                        error!("failed to create the tray icon: {:#}", err);
                        process::exit(1);
                    }
                },
                Event::UserEvent(TrayEvent::Menu(event)) => {
                    let Some(action) = state.as_ref().and_then(|s| s.ids.action_for(&event.id)) else {
                        return;
                    };
                    debug!("menu selected: {:?}", action);
                    match action {
                        MenuAction::Exit => {
                            info!("quit selected, goodbye");
                            process::exit(0);
                        }
                        MenuAction::Send(command) => {
                            if commands.send(command).is_err() {
                                error!("scheduler is gone, closing the tray");
                                *control_flow = ControlFlow::Exit;
                            }
                        }
                    }
                }
                Event::UserEvent(TrayEvent::Status(new_status)) => {
                    status = new_status;
                    if let Some(state) = &state {
                        state.set_status(&status);
                    }
                }
                Event::UserEvent(TrayEvent::Clients(new_clients)) => {
                    clients = new_clients;
                    if let Some(state) = &mut state {
                        state.set_clients(&clients);
                    }
                }
                _ => {}
            }
        })
    }
}

/// What a click on a menu entry asks for
#[derive(Clone, Debug, PartialEq, Eq)]
enum MenuAction {
    Exit,
    Send(Command),
}

/// The ids of the entries that react to clicks
#[derive(Debug)]
struct MenuIds {
    reload: MenuId,
    fetch: MenuId,
    quit: MenuId,
    clients: Vec<(MenuId, Command)>,
}

impl MenuIds {
    fn action_for(&self, id: &MenuId) -> Option<MenuAction> {
        if *id == self.quit {
            Some(MenuAction::Exit)
        } else if *id == self.reload {
            Some(MenuAction::Send(Command::Reload))
        } else if *id == self.fetch {
            Some(MenuAction::Send(Command::ForceFetch))
        } else {
            self.clients
                .iter()
                .find(|(client, _)| client == id)
                .map(|(_, command)| MenuAction::Send(command.clone()))
        }
    }
}

struct TrayState {
    icon: TrayIcon,
    menu: Menu,
    status: MenuItem,
    clients: Vec<MenuItem>,
    ids: MenuIds,
}

impl TrayState {
    /// Position of the first client entry, below the status and a separator
    const CLIENTS_POSITION: usize = 2;

    fn build(status: &str, clients: &[ClientEntry]) -> Result<TrayState> {
        let menu = Menu::new();
        let status_item = MenuItem::new(menu_text(status), false, None);
        let reload = MenuItem::new("Reload config", true, None);
        let fetch = MenuItem::new("Fetch calendars", true, None);
        let quit = MenuItem::new("Quit", true, None);

        menu.append(&status_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&reload)?;
        menu.append(&fetch)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&quit)?;

        let icon = TrayIconBuilder::new()
            .with_menu(Box::new(menu.clone()))
            .with_tooltip(status)
            .with_icon(bell_icon()?)
            .build()?;

        let mut state = TrayState {
            icon,
            menu,
            status: status_item,
            clients: Vec::new(),
            ids: MenuIds {
                reload: reload.id().clone(),
                fetch: fetch.id().clone(),
                quit: quit.id().clone(),
                clients: Vec::new(),
            },
        };
        state.set_clients(clients);
        Ok(state)
    }

    fn set_status(&self, status: &str) {
        self.status.set_text(menu_text(status));
        if let Err(err) = self.icon.set_tooltip(Some(status)) {
            error!("failed to update tray tooltip: {:#}", err);
        }
    }

    fn set_clients(&mut self, clients: &[ClientEntry]) {
        for item in self.clients.drain(..) {
            if let Err(err) = self.menu.remove(&item) {
                error!("failed to remove menu entry: {:#}", err);
            }
        }
        self.ids.clients.clear();

        for (position, client) in clients.iter().enumerate() {
            let item = MenuItem::new(&client.label, true, None);
            match self.menu.insert(&item, Self::CLIENTS_POSITION + position) {
                Ok(()) => {
                    self.ids.clients.push((item.id().clone(), client.command()));
                    self.clients.push(item);
                }
                Err(err) => error!("failed to add menu entry {:?}: {:#}", client.label, err),
            }
        }
    }
}

/// Menu entries only hold a single line
fn menu_text(status: &str) -> String {
    status.replace('\n', ", ")
}

/// Draw a small bell, a dome over a rim with a clapper below
fn bell_icon() -> Result<Icon> {
    let size = ICON_SIZE as i32;
    let center = size / 2;
    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);

    for y in 0..size {
        for x in 0..size {
            let dx = x - center;
            let dome = (4..22).contains(&y) && dx * dx * 18 <= (y - 2) * (y - 2) * 12;
            let rim = (22..25).contains(&y) && dx.abs() <= 12;
            let clapper = (25..29).contains(&y) && dx * dx + (y - 26) * (y - 26) <= 5;
            let pixel = if dome || rim || clapper {
                [0xf0, 0xb4, 0x29, 0xff]
            } else {
                [0, 0, 0, 0]
            };
            rgba.extend_from_slice(&pixel);
        }
    }

    Ok(Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::scheduler::command::ClientTarget;

    #[test]
    fn status_fits_on_one_menu_line() {
        assert_eq!(
            menu_text("next: Standup\non 10.3. at 12:10"),
            "next: Standup, on 10.3. at 12:10"
        );
    }

    #[test]
    fn quit_ends_the_process_instead_of_queueing() {
        let ids = MenuIds {
            reload: MenuId::new("reload"),
            fetch: MenuId::new("fetch"),
            quit: MenuId::new("quit"),
            clients: vec![(
                MenuId::new("client-work"),
                Command::OpenClient(ClientTarget::Calendar("work".into())),
            )],
        };

        assert_eq!(ids.action_for(&MenuId::new("quit")), Some(MenuAction::Exit));
        assert_eq!(
            ids.action_for(&MenuId::new("fetch")),
            Some(MenuAction::Send(Command::ForceFetch))
        );
        assert_eq!(
            ids.action_for(&MenuId::new("client-work")),
            Some(MenuAction::Send(Command::OpenClient(ClientTarget::Calendar("work".into()))))
        );
        assert_eq!(ids.action_for(&MenuId::new("status")), None);
    }

    #[test]
    fn bell_icon_has_the_right_size() {
        assert!(bell_icon().is_ok());
    }
}
