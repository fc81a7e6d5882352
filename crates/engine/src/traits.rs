//! Collaborator seams of the state machine.
//!
//! Everything the engine touches outside its own logic goes through one of
//! these traits: durable storage, the host timer facility, notification and
//! tone output, and the "upcoming alarm" indicator.

use chrono::NaiveDateTime;
use reveille_core::{AlarmId, AlarmInstance, AlarmRecord, InstanceId, InstanceRow, InstanceState};

use crate::generation::Generation;

pub type StoreResult<T> = Result<T, reveille_core::AlarmError>;

/// Durable access to alarm instances.
pub trait InstanceStore: Send + Sync {
    fn get(&self, id: InstanceId) -> StoreResult<Option<AlarmInstance>>;

    fn by_alarm_id(&self, alarm_id: AlarmId) -> StoreResult<Vec<AlarmInstance>>;

    /// Instances whose state is strictly before FIRED.
    fn pending(&self) -> StoreResult<Vec<AlarmInstance>>;

    /// Every stored row with its state still undecoded.
    fn all_rows(&self) -> StoreResult<Vec<InstanceRow>>;

    /// Insert a new instance, or merge into the existing row of the same
    /// alarm at the same scheduled time. A merge refreshes the details but
    /// keeps the stored state. Returns the instance as persisted.
    fn insert_or_merge(&self, instance: AlarmInstance) -> StoreResult<AlarmInstance>;

    /// Returns `false` when no row with the instance's id exists.
    fn update(&self, instance: &AlarmInstance) -> StoreResult<bool>;

    /// Returns `false` when no row with `id` exists.
    fn delete(&self, id: InstanceId) -> StoreResult<bool>;
}

/// Durable access to alarm records.
pub trait RecordStore: Send + Sync {
    fn get(&self, id: AlarmId) -> StoreResult<Option<AlarmRecord>>;

    fn all(&self) -> StoreResult<Vec<AlarmRecord>>;

    /// Persist a new record, assigning its id.
    fn insert(&self, record: AlarmRecord) -> StoreResult<AlarmRecord>;

    fn update(&self, record: &AlarmRecord) -> StoreResult<bool>;

    fn delete(&self, id: AlarmId) -> StoreResult<bool>;

    fn disable(&self, id: AlarmId) -> StoreResult<bool>;
}

/// Host timer facility that delivers one transition request per instance.
///
/// Arming an instance replaces whatever was armed for it before.
pub trait TransitionScheduler: Send + Sync {
    fn arm(
        &self,
        instance_id: InstanceId,
        target: InstanceState,
        at: NaiveDateTime,
        generation: Generation,
    );

    fn cancel(&self, instance_id: InstanceId);
}

/// Notification priority shown for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationTier {
    Low,
    High,
    Snoozed,
    Firing,
    Missed,
}

impl NotificationTier {
    /// Tier that is visible while an instance sits in `state`, if any.
    pub fn for_state(state: InstanceState) -> Option<NotificationTier> {
        match state {
            InstanceState::LowNotification => Some(NotificationTier::Low),
            InstanceState::HighNotification => Some(NotificationTier::High),
            InstanceState::Snoozed => Some(NotificationTier::Snoozed),
            InstanceState::Fired => Some(NotificationTier::Firing),
            InstanceState::Missed => Some(NotificationTier::Missed),
            _ => None,
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn show(&self, tier: NotificationTier, instance: &AlarmInstance);

    fn clear(&self, instance: &AlarmInstance);
}

pub trait ToneSink: Send + Sync {
    fn start(&self, instance: &AlarmInstance);

    fn stop(&self);
}

/// Platform "next alarm" indicator.
pub trait NextWakePublisher: Send + Sync {
    fn publish(&self, instance: &AlarmInstance);

    fn cancel(&self);
}
