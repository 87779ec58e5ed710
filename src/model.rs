pub mod alarm;
pub mod calendar;
pub mod calendar_collection;
pub mod calendar_source;
pub mod duration;
pub mod event;
