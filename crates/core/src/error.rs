use thiserror::Error;

use crate::entity::{AlarmId, InstanceId};

#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Unknown alarm state code: {0}")]
    UnknownState(i32),

    #[error("Invalid time of day {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("Alarm instance not found: {0}")]
    InstanceNotFound(InstanceId),

    #[error("Alarm not found: {0}")]
    RecordNotFound(AlarmId),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AlarmError {
    fn from(e: serde_json::Error) -> Self {
        AlarmError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AlarmError>;
