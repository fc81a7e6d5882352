//! Alarm instances: one concrete, individually tracked occurrence of a record.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::entity::{AlarmId, InstanceId};
use crate::error::AlarmError;

/// Offset from the scheduled time at which the low priority notification shows.
pub const LOW_NOTIFICATION_OFFSET_HOURS: i64 = -2;
/// Offset from the scheduled time at which the high priority notification shows.
pub const HIGH_NOTIFICATION_OFFSET_MINUTES: i64 = -30;
/// Offset from the scheduled time after which a missed instance is discarded.
pub const MISSED_TIME_TO_LIVE_HOURS: i64 = 12;

// ── State ─────────────────────────────────────────────────────

/// Lifecycle state of an [`AlarmInstance`].
///
/// The numeric codes are the persisted representation and their order is
/// meaningful: everything below [`InstanceState::Fired`] is still pending,
/// everything above it has finished ringing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceState {
    /// No notification shown yet.
    Silent,
    /// Low priority "upcoming alarm" notification.
    LowNotification,
    /// Low priority notification hidden by the user.
    HideNotification,
    /// High priority notification shortly before firing.
    HighNotification,
    /// Snoozed; will fire again at the rewritten scheduled time.
    Snoozed,
    /// Ringing.
    Fired,
    /// Rang without being acknowledged.
    Missed,
    /// Finished. Terminal.
    Dismissed,
    /// Dismissed by the user before it rang.
    Predismissed,
}

impl InstanceState {
    pub const ALL: [InstanceState; 9] = [
        InstanceState::Silent,
        InstanceState::LowNotification,
        InstanceState::HideNotification,
        InstanceState::HighNotification,
        InstanceState::Snoozed,
        InstanceState::Fired,
        InstanceState::Missed,
        InstanceState::Dismissed,
        InstanceState::Predismissed,
    ];

    /// Persisted integer code.
    pub fn code(self) -> i32 {
        match self {
            InstanceState::Silent => 0,
            InstanceState::LowNotification => 1,
            InstanceState::HideNotification => 2,
            InstanceState::HighNotification => 3,
            InstanceState::Snoozed => 4,
            InstanceState::Fired => 5,
            InstanceState::Missed => 6,
            InstanceState::Dismissed => 7,
            InstanceState::Predismissed => 8,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, AlarmError> {
        InstanceState::ALL
            .iter()
            .copied()
            .find(|s| s.code() == code)
            .ok_or(AlarmError::UnknownState(code))
    }

    /// Position along the lifecycle. Unlike [`code`](Self::code), PREDISMISSED
    /// sits before DISMISSED so that finalizing it counts as progress.
    fn progress(self) -> u8 {
        match self {
            InstanceState::Silent => 0,
            InstanceState::LowNotification => 1,
            InstanceState::HideNotification => 2,
            InstanceState::HighNotification => 3,
            InstanceState::Snoozed => 4,
            InstanceState::Fired => 5,
            InstanceState::Missed => 6,
            InstanceState::Predismissed => 7,
            InstanceState::Dismissed => 8,
        }
    }

    /// One of the notification tiers leading up to firing.
    pub fn is_pre_fire(self) -> bool {
        matches!(
            self,
            InstanceState::Silent
                | InstanceState::LowNotification
                | InstanceState::HideNotification
                | InstanceState::HighNotification
        )
    }

    /// Strictly before FIRED in code order: the instance will still ring.
    pub fn is_pending(self) -> bool {
        self.code() < InstanceState::Fired.code()
    }

    /// Strictly after FIRED in code order: the instance has finished ringing.
    pub fn is_past_fired(self) -> bool {
        self.code() > InstanceState::Fired.code()
    }

    pub fn is_terminal(self) -> bool {
        self == InstanceState::Dismissed
    }

    /// Whether moving from `self` (the persisted state) to `target` is real
    /// progress. Duplicate or late deliveries fail this check.
    pub fn accepts(self, target: InstanceState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match target {
            InstanceState::Snoozed => self == InstanceState::Fired,
            InstanceState::HideNotification => self == InstanceState::LowNotification,
            InstanceState::Predismissed => self.is_pre_fire(),
            InstanceState::Dismissed => true,
            _ => target.progress() > self.progress() && self != InstanceState::Predismissed,
        }
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InstanceState::Silent => "SILENT",
            InstanceState::LowNotification => "LOW_NOTIFICATION",
            InstanceState::HideNotification => "HIDE_NOTIFICATION",
            InstanceState::HighNotification => "HIGH_NOTIFICATION",
            InstanceState::Snoozed => "SNOOZED",
            InstanceState::Fired => "FIRED",
            InstanceState::Missed => "MISSED",
            InstanceState::Dismissed => "DISMISSED",
            InstanceState::Predismissed => "PREDISMISSED",
        };
        f.write_str(name)
    }
}

impl TryFrom<i32> for InstanceState {
    type Error = AlarmError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        InstanceState::from_code(code)
    }
}

// ── Instance ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmInstance {
    pub id: InstanceId,
    /// Local wall-clock time at which the instance rings.
    pub scheduled_time: NaiveDateTime,
    pub state: InstanceState,
    /// Parent record. `None` for ad-hoc instances, which are never regenerated.
    pub alarm_id: Option<AlarmId>,
    pub label: String,
    pub vibrate: bool,
    pub ringtone: String,
}

impl AlarmInstance {
    /// A fresh, unpersisted SILENT instance with no parent.
    pub fn new(scheduled_time: NaiveDateTime) -> Self {
        Self {
            id: InstanceId::INVALID,
            scheduled_time,
            state: InstanceState::Silent,
            alarm_id: None,
            label: String::new(),
            vibrate: true,
            ringtone: crate::record::DEFAULT_RINGTONE.to_string(),
        }
    }

    pub fn low_notification_time(&self) -> NaiveDateTime {
        self.scheduled_time + Duration::hours(LOW_NOTIFICATION_OFFSET_HOURS)
    }

    pub fn high_notification_time(&self) -> NaiveDateTime {
        self.scheduled_time + Duration::minutes(HIGH_NOTIFICATION_OFFSET_MINUTES)
    }

    /// Auto-silence deadline, or `None` when the timeout is disabled.
    pub fn timeout_time(&self, timeout_minutes: Option<u32>) -> Option<NaiveDateTime> {
        timeout_minutes.map(|m| self.scheduled_time + Duration::minutes(i64::from(m)))
    }

    pub fn missed_time_to_live(&self) -> NaiveDateTime {
        self.scheduled_time + Duration::hours(MISSED_TIME_TO_LIVE_HOURS)
    }

    pub fn label_or_default(&self) -> &str {
        if self.label.is_empty() {
            "Alarm"
        } else {
            &self.label
        }
    }
}

impl std::fmt::Display for AlarmInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "instance {} ({}) at {} [{}]",
            self.id,
            self.label_or_default(),
            self.scheduled_time.format("%Y-%m-%d %H:%M:%S"),
            self.state
        )
    }
}

// ── Stored row ────────────────────────────────────────────────

/// Instance as it sits in storage, with the state still an undecoded code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRow {
    pub id: InstanceId,
    pub scheduled_time: NaiveDateTime,
    pub alarm_state: i32,
    pub alarm_id: Option<AlarmId>,
    pub label: String,
    pub vibrate: bool,
    pub ringtone: String,
}

impl TryFrom<InstanceRow> for AlarmInstance {
    type Error = AlarmError;

    fn try_from(row: InstanceRow) -> Result<Self, Self::Error> {
        Ok(AlarmInstance {
            id: row.id,
            scheduled_time: row.scheduled_time,
            state: InstanceState::from_code(row.alarm_state)?,
            alarm_id: row.alarm_id,
            label: row.label,
            vibrate: row.vibrate,
            ringtone: row.ringtone,
        })
    }
}

impl From<&AlarmInstance> for InstanceRow {
    fn from(instance: &AlarmInstance) -> Self {
        InstanceRow {
            id: instance.id,
            scheduled_time: instance.scheduled_time,
            alarm_state: instance.state.code(),
            alarm_id: instance.alarm_id,
            label: instance.label.clone(),
            vibrate: instance.vibrate,
            ringtone: instance.ringtone.clone(),
        }
    }
}
