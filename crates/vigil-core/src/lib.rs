pub mod bus;
pub mod error;
pub mod time;

pub use bus::SnapshotBus;
pub use error::{Result, VigilError};
pub use time::{in_timezone, is_cooldown_elapsed, is_within_window, time_of_day, DAY};
