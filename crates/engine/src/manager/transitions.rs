//! One `set_*_state` per target state. Each persists the new state, updates
//! the notification, and arms the next transition.

use chrono::{Duration, NaiveDateTime};
use reveille_core::{AlarmError, AlarmId, AlarmInstance, InstanceId, InstanceState, Result};
use tracing::{debug, info, warn};

use crate::manager::AlarmStateManager;
use crate::traits::NotificationTier;

impl AlarmStateManager {
    /// Apply a single delivered transition, then publish the next alarm.
    pub(super) fn set_state(&self, instance: &mut AlarmInstance, target: InstanceState) -> Result<()> {
        self.enter_state(instance, target)?;
        self.update_next_wake()
    }

    fn enter_state(&self, instance: &mut AlarmInstance, target: InstanceState) -> Result<()> {
        match target {
            InstanceState::Silent => self.set_silent_state(instance),
            InstanceState::LowNotification => self.set_low_notification_state(instance),
            InstanceState::HideNotification => self.set_hide_notification_state(instance),
            InstanceState::HighNotification => self.set_high_notification_state(instance),
            InstanceState::Snoozed => self.set_snooze_state(instance),
            InstanceState::Fired => self.set_fired_state(instance),
            InstanceState::Missed => self.set_missed_state(instance),
            InstanceState::Predismissed => self.set_predismiss_state(instance),
            InstanceState::Dismissed => self.delete_instance_and_update_parent(instance),
        }
    }

    pub(super) fn set_silent_state(&self, instance: &mut AlarmInstance) -> Result<()> {
        info!(instance_id = %instance.id, "setting silent state");
        self.persist_state(instance, InstanceState::Silent)?;
        self.notifications.clear(instance);
        self.arm(instance, InstanceState::LowNotification, instance.low_notification_time());
        Ok(())
    }

    pub(super) fn set_low_notification_state(&self, instance: &mut AlarmInstance) -> Result<()> {
        info!(instance_id = %instance.id, "setting low notification state");
        self.persist_state(instance, InstanceState::LowNotification)?;
        self.notifications.show(NotificationTier::Low, instance);
        self.arm(instance, InstanceState::HighNotification, instance.high_notification_time());
        Ok(())
    }

    pub(super) fn set_hide_notification_state(&self, instance: &mut AlarmInstance) -> Result<()> {
        info!(instance_id = %instance.id, "setting hide notification state");
        self.persist_state(instance, InstanceState::HideNotification)?;
        self.notifications.clear(instance);
        self.arm(instance, InstanceState::HighNotification, instance.high_notification_time());
        Ok(())
    }

    pub(super) fn set_high_notification_state(&self, instance: &mut AlarmInstance) -> Result<()> {
        info!(instance_id = %instance.id, "setting high notification state");
        self.persist_state(instance, InstanceState::HighNotification)?;
        self.notifications.show(NotificationTier::High, instance);
        self.arm(instance, InstanceState::Fired, instance.scheduled_time);
        Ok(())
    }

    /// Ring the instance. Any other instance still ringing is marked missed,
    /// and sibling instances of the same alarm are dropped.
    pub(super) fn set_fired_state(&self, instance: &mut AlarmInstance) -> Result<()> {
        info!(instance_id = %instance.id, "setting fired state");
        self.silence_previous_firing(instance.id)?;
        self.persist_state(instance, InstanceState::Fired)?;

        if let Some(alarm_id) = instance.alarm_id {
            self.delete_other_instances(alarm_id, instance.id)?;
        }

        self.notifications.show(NotificationTier::Firing, instance);
        self.start_tone(instance);

        match instance.timeout_time(self.config.timeout_minutes()) {
            Some(timeout) => self.arm(instance, InstanceState::Missed, timeout),
            None => self.scheduler.cancel(instance.id),
        }
        Ok(())
    }

    /// Push the instance `snooze_minutes` into the future.
    pub(super) fn set_snooze_state(&self, instance: &mut AlarmInstance) -> Result<()> {
        self.stop_tone(instance);

        let new_time = self.clock.now() + Duration::minutes(i64::from(self.config.snooze_minutes));
        info!(instance_id = %instance.id, until = %new_time, "setting snoozed state");
        instance.scheduled_time = new_time;
        self.persist_state(instance, InstanceState::Snoozed)?;

        self.notifications.show(NotificationTier::Snoozed, instance);
        self.arm(instance, InstanceState::Fired, new_time);
        Ok(())
    }

    pub(super) fn set_missed_state(&self, instance: &mut AlarmInstance) -> Result<()> {
        info!(instance_id = %instance.id, "setting missed state");
        self.stop_tone(instance);

        // Persisted first so the successor is computed for a finished instance.
        self.persist_state(instance, InstanceState::Missed)?;
        self.update_parent(instance)?;

        self.notifications.show(NotificationTier::Missed, instance);
        self.arm(instance, InstanceState::Dismissed, instance.missed_time_to_live());
        Ok(())
    }

    /// Dismissed before ringing. The row stays until its scheduled time so a
    /// restart does not resurrect it.
    pub(super) fn set_predismiss_state(&self, instance: &mut AlarmInstance) -> Result<()> {
        info!(instance_id = %instance.id, "setting predismissed state");
        self.persist_state(instance, InstanceState::Predismissed)?;
        self.notifications.clear(instance);
        self.arm(instance, InstanceState::Dismissed, instance.scheduled_time);
        self.update_parent(instance)
    }

    /// Finish the instance: tear it down, schedule its successor, delete it.
    pub(super) fn delete_instance_and_update_parent(&self, instance: &mut AlarmInstance) -> Result<()> {
        info!(instance_id = %instance.id, "deleting instance and updating parent");
        self.unregister_instance(instance)?;
        self.update_parent(instance)?;
        self.instances.delete(instance.id)?;
        Ok(())
    }

    /// Stop everything the instance has going and mark it DISMISSED.
    pub(super) fn unregister_instance(&self, instance: &mut AlarmInstance) -> Result<()> {
        debug!(instance_id = %instance.id, "unregistering instance");
        self.stop_tone(instance);
        self.notifications.clear(instance);
        self.scheduler.cancel(instance.id);
        instance.state = InstanceState::Dismissed;
        self.instances.update(instance)?;
        Ok(())
    }

    pub(super) fn delete_other_instances(&self, alarm_id: AlarmId, keep: InstanceId) -> Result<()> {
        for mut other in self.instances.by_alarm_id(alarm_id)? {
            if other.id != keep {
                debug!(instance_id = %other.id, %alarm_id, "deleting sibling instance");
                self.unregister_instance(&mut other)?;
                self.instances.delete(other.id)?;
            }
        }
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn persist_state(&self, instance: &mut AlarmInstance, state: InstanceState) -> Result<()> {
        instance.state = state;
        if !self.instances.update(instance)? {
            return Err(AlarmError::InstanceNotFound(instance.id));
        }
        Ok(())
    }

    pub(super) fn arm(&self, instance: &AlarmInstance, target: InstanceState, at: NaiveDateTime) {
        let generation = self.generation.current();
        debug!(instance_id = %instance.id, %target, %at, %generation, "arming transition");
        self.scheduler.arm(instance.id, target, at, generation);
    }

    fn start_tone(&self, instance: &AlarmInstance) {
        {
            let mut slot = self.firing_slot();
            if *slot == Some(instance.id) {
                return;
            }
            *slot = Some(instance.id);
        }
        self.tone.start(instance);
    }

    /// Only stops the tone if it belongs to `instance`.
    fn stop_tone(&self, instance: &AlarmInstance) {
        {
            let mut slot = self.firing_slot();
            if *slot != Some(instance.id) {
                return;
            }
            *slot = None;
        }
        self.tone.stop();
    }

    fn silence_previous_firing(&self, incoming: InstanceId) -> Result<()> {
        let previous = *self.firing_slot();
        let Some(previous) = previous.filter(|id| *id != incoming) else {
            return Ok(());
        };

        match self.instances.get(previous)? {
            Some(mut other) if other.state == InstanceState::Fired => {
                warn!(
                    instance_id = %other.id,
                    replaced_by = %incoming,
                    "another alarm started ringing, marking current one missed"
                );
                self.set_missed_state(&mut other)
            }
            _ => {
                *self.firing_slot() = None;
                self.tone.stop();
                Ok(())
            }
        }
    }
}
