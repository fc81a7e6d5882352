pub mod config;
pub mod entity;
pub mod error;
pub mod instance;
pub mod record;
pub mod weekdays;

pub use config::{AlarmConfig, Config};
pub use entity::*;
pub use error::*;
pub use instance::{AlarmInstance, InstanceRow, InstanceState};
pub use record::{AlarmRecord, DEFAULT_RINGTONE, SILENT_RINGTONE};
pub use weekdays::Weekdays;
