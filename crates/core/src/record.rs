//! Alarm records (user-configured definitions) and occurrence computation.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::entity::{AlarmId, InstanceId};
use crate::error::AlarmError;
use crate::instance::{AlarmInstance, InstanceState};
use crate::weekdays::Weekdays;

/// Ringtone token meaning "play the default alarm sound".
pub const DEFAULT_RINGTONE: &str = "default";
/// Ringtone token meaning "do not play any sound".
pub const SILENT_RINGTONE: &str = "silent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub id: AlarmId,
    pub enabled: bool,
    /// Hour of day, 0..=23.
    pub hour: u32,
    /// Minute of hour, 0..=59.
    pub minute: u32,
    /// Repeat days. Empty means the alarm rings once.
    pub days_of_week: Weekdays,
    pub vibrate: bool,
    pub label: String,
    pub ringtone: String,
    pub delete_after_use: bool,
}

impl AlarmRecord {
    /// A new, unpersisted, enabled one-shot record.
    pub fn new(hour: u32, minute: u32) -> Result<Self, AlarmError> {
        let record = Self {
            id: AlarmId::INVALID,
            enabled: true,
            hour,
            minute,
            days_of_week: Weekdays::NONE,
            vibrate: true,
            label: String::new(),
            ringtone: DEFAULT_RINGTONE.to_string(),
            delete_after_use: false,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn with_days(mut self, days: Weekdays) -> Self {
        self.days_of_week = days;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn validate(&self) -> Result<(), AlarmError> {
        if self.hour > 23 || self.minute > 59 {
            return Err(AlarmError::InvalidTime {
                hour: self.hour,
                minute: self.minute,
            });
        }
        Ok(())
    }

    pub fn is_repeating(&self) -> bool {
        self.days_of_week.is_repeating()
    }

    pub fn is_silent(&self) -> bool {
        self.ringtone == SILENT_RINGTONE
    }

    fn time_of_day(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.min(23), self.minute.min(59), 0).unwrap_or(NaiveTime::MIN)
    }

    /// First occurrence strictly after `current`.
    ///
    /// Non-repeating records only roll over to the next day when today's slot
    /// has already passed; repeating records then skip ahead to the next
    /// enabled weekday.
    pub fn next_alarm_time(&self, current: NaiveDateTime) -> NaiveDateTime {
        let time = self.time_of_day();
        let mut date = current.date();

        if date.and_time(time) <= current {
            date = date + Duration::days(1);
        }

        if let Some(add_days) = self.days_of_week.distance_to_next_day(date) {
            if add_days > 0 {
                date = date + Duration::days(add_days);
            }
        }

        // Re-apply the time of day after the day arithmetic.
        date.and_time(time)
    }

    /// The occurrence on the closest enabled weekday strictly before
    /// `current`'s date, or `None` for a non-repeating record.
    pub fn previous_alarm_time(&self, current: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = current.date();
        let subtract_days = self.days_of_week.distance_to_previous_day(date)?;
        Some((date - Duration::days(subtract_days)).and_time(self.time_of_day()))
    }

    /// New SILENT instance at the first occurrence after `time`, inheriting
    /// this record's label, vibrate and ringtone.
    pub fn create_instance_after(&self, time: NaiveDateTime) -> AlarmInstance {
        let next = self.next_alarm_time(time);
        tracing::debug!(alarm_id = %self.id, next = %next, "created instance after {}", time);
        AlarmInstance {
            id: InstanceId::INVALID,
            scheduled_time: next,
            state: InstanceState::Silent,
            alarm_id: Some(self.id),
            label: self.label.clone(),
            vibrate: self.vibrate,
            ringtone: self.ringtone.clone(),
        }
    }
}

impl std::fmt::Display for AlarmRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "alarm {} {:02}:{:02} {}{}",
            self.id,
            self.hour,
            self.minute,
            self.days_of_week,
            if self.enabled { "" } else { " (disabled)" }
        )
    }
}
