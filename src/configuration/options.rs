use clap::{ArgAction, Parser};
use std::path::PathBuf;

use super::config::DEFAULT_CONFIG_NAME;

/// Command line options
#[derive(Parser, Debug)]
#[command(name = "calbell", author, version, about)]
pub struct Opt {
    /// The directory holding the config file and icons
    #[clap(short = 'i', long, default_value = "data/")]
    pub data_dir: PathBuf,

    /// The name of the config file inside the data directory
    #[clap(short, long, default_value_t = String::from(DEFAULT_CONFIG_NAME))]
    pub config_name: String,

    /// Log more (-v for debug, -vv for trace)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Fetch the calendars once, print the upcoming events and alarms, then exit
    #[clap(long, default_value_t = false)]
    pub list: bool,
}

impl Opt {
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(&self.config_name)
    }

    /// The log specification used when `RUST_LOG` is not set
    pub fn log_spec(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
