pub mod calendar_source_config;
pub mod config;
pub mod options;
pub mod types;
