pub mod configuration;
pub mod display;
pub mod model;
pub mod notifier;
pub mod scheduler;
#[cfg(feature = "tray")]
pub mod tray;
pub mod util;

#[cfg(test)]
mod test_utils;
