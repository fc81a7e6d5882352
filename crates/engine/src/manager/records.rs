//! Alarm record management: the operations behind the alarm list.

use reveille_core::{AlarmError, AlarmId, AlarmInstance, AlarmRecord, Result};
use tracing::{debug, info};

use crate::manager::AlarmStateManager;
use crate::traits::NotificationTier;

/// How much of an alarm changed in an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Label, vibrate or ringtone only. Existing instances keep their schedule.
    Minor,
    /// Time, repeat days or enabled flag. Existing instances are replaced.
    Major,
}

impl AlarmStateManager {
    /// Store a new alarm and, if enabled, schedule its first instance.
    pub fn add_alarm(&self, record: AlarmRecord) -> Result<(AlarmRecord, Option<AlarmInstance>)> {
        let _session = self.session();
        let record = self.records.insert(record)?;
        info!(alarm_id = %record.id, %record, "alarm added");
        let instance = if record.enabled {
            Some(self.setup_alarm_instance(&record)?)
        } else {
            None
        };
        Ok((record, instance))
    }

    pub fn update_alarm(&self, record: &AlarmRecord, kind: UpdateKind) -> Result<()> {
        let _session = self.session();
        if !self.records.update(record)? {
            return Err(AlarmError::RecordNotFound(record.id));
        }
        info!(alarm_id = %record.id, ?kind, "alarm updated");

        match kind {
            UpdateKind::Minor => {
                for mut instance in self.instances.by_alarm_id(record.id)? {
                    instance.label = record.label.clone();
                    instance.vibrate = record.vibrate;
                    instance.ringtone = record.ringtone.clone();
                    self.instances.update(&instance)?;
                    if let Some(tier) = NotificationTier::for_state(instance.state) {
                        self.notifications.show(tier, &instance);
                    }
                }
            }
            UpdateKind::Major => {
                self.delete_instances_of(record.id)?;
                if record.enabled {
                    self.setup_alarm_instance(record)?;
                }
            }
        }
        Ok(())
    }

    /// Remove an alarm and every instance of it. Returns `false` when the
    /// alarm did not exist.
    pub fn delete_alarm(&self, alarm_id: AlarmId) -> Result<bool> {
        let _session = self.session();
        self.delete_instances_of(alarm_id)?;
        let deleted = self.records.delete(alarm_id)?;
        info!(%alarm_id, deleted, "alarm deleted");
        Ok(deleted)
    }

    /// Drop every instance of an alarm without touching the alarm itself.
    pub fn delete_all_instances(&self, alarm_id: AlarmId) -> Result<()> {
        let _session = self.session();
        self.delete_instances_of(alarm_id)
    }

    pub fn alarms(&self) -> Result<Vec<AlarmRecord>> {
        self.records.all()
    }

    pub fn instances_of(&self, alarm_id: AlarmId) -> Result<Vec<AlarmInstance>> {
        self.instances.by_alarm_id(alarm_id)
    }

    // ── Internals ───────────────────────────────────────────────

    fn setup_alarm_instance(&self, record: &AlarmRecord) -> Result<AlarmInstance> {
        let instance = self
            .instances
            .insert_or_merge(record.create_instance_after(self.clock.now()))?;
        let id = instance.id;
        self.register_instance(instance.clone(), true)?;
        Ok(self.instances.get(id)?.unwrap_or(instance))
    }

    fn delete_instances_of(&self, alarm_id: AlarmId) -> Result<()> {
        for mut instance in self.instances.by_alarm_id(alarm_id)? {
            debug!(instance_id = %instance.id, %alarm_id, "deleting instance of alarm");
            self.unregister_instance(&mut instance)?;
            self.instances.delete(instance.id)?;
        }
        self.update_next_wake()
    }
}
