pub mod config_duration;
