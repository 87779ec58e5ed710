use chrono::Local;
use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use log::info;
use std::process;
use std::sync::mpsc::{self, Sender};

use calbell::configuration::{config::Config, options::Opt};
use calbell::model::calendar_collection::CalendarCollection;
use calbell::model::calendar_source::DefaultReader;
use calbell::scheduler::{command::Command, Scheduler};

fn main() -> eyre::Result<()> {
    let args = Opt::parse();
    color_eyre::install()?;
    let _logger = flexi_logger::Logger::try_with_env_or_str(args.log_spec())?.start()?;

    let config_path = args.config_path();
    let config = Config::new(&config_path).wrap_err("could not load the config")?;
    let reader = DefaultReader::new()?;

    if args.list {
        CalendarCollection::fetch(&config, &reader, Local::now()).print_upcoming();
        return Ok(());
    }

    // a blocking fetch must not delay quitting
    ctrlc::set_handler(|| {
        info!("interrupted, goodbye");
        process::exit(0);
    })
    .wrap_err("could not install the Ctrl-C handler")?;

    let (commands, receiver) = mpsc::channel();

    let scheduler = Scheduler::new(config_path, config, receiver, Box::new(reader));
    run(scheduler, commands)
}

#[cfg(feature = "tray")]
fn run(scheduler: Scheduler, commands: Sender<Command>) -> eyre::Result<()> {
    use std::thread;

    let tray = calbell::tray::Tray::new();
    let scheduler = scheduler.with_display(Box::new(tray.display()));

    // the tray owns the main thread, the scheduler ends the process when it is done
    thread::Builder::new()
        .name("scheduler".into())
        .spawn(move || {
            scheduler.run();
            process::exit(0);
        })
        .wrap_err("could not start the scheduler")?;

    tray.run(commands)
}

#[cfg(not(feature = "tray"))]
fn run(scheduler: Scheduler, commands: Sender<Command>) -> eyre::Result<()> {
    info!("running without a tray icon, press Ctrl-C to quit");
    // keep the channel open while the scheduler runs
    let _commands = commands;
    scheduler.run();
    Ok(())
}
