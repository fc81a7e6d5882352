//! Bringing one instance in line with the current time.

use chrono::Duration;
use reveille_core::{AlarmInstance, InstanceState, Result};
use tracing::{debug, error, info};

use crate::manager::AlarmStateManager;
use crate::traits::NotificationTier;

impl AlarmStateManager {
    /// Move `instance` to whatever state matches the current time, re-applying
    /// side effects (notification, tone, armed transition) for its state.
    ///
    /// Checks run in a fixed order and the first match wins. A sweep passes
    /// `update_next_wake = false` and publishes once at the end.
    pub(super) fn register_instance(&self, instance: AlarmInstance, update_next_wake: bool) -> Result<()> {
        self.reconcile_instance(instance)?;
        if update_next_wake {
            self.update_next_wake()?;
        }
        Ok(())
    }

    fn reconcile_instance(&self, mut instance: AlarmInstance) -> Result<()> {
        debug!(%instance, "registering instance");
        let now = self.clock.now();

        if instance.state == InstanceState::Dismissed {
            error!(instance_id = %instance.id, "instance is dismissed but was never deleted");
            return self.delete_instance_and_update_parent(&mut instance);
        }

        if instance.state == InstanceState::Fired {
            let timed_out = instance
                .timeout_time(self.config.timeout_minutes())
                .is_some_and(|timeout| now > timeout);
            if !timed_out {
                return self.set_fired_state(&mut instance);
            }
        }

        // The clock went back before a missed instance's time.
        if instance.state == InstanceState::Missed && now < instance.scheduled_time {
            if !self.reenable_parent(&instance)? {
                info!(instance_id = %instance.id, "missed instance has no live alarm, deleting");
                return self.delete_instance_and_update_parent(&mut instance);
            }
        }

        if instance.state == InstanceState::Predismissed {
            return if now < instance.scheduled_time {
                self.set_predismiss_state(&mut instance)
            } else {
                self.delete_instance_and_update_parent(&mut instance)
            };
        }

        if now > instance.missed_time_to_live() {
            info!(instance_id = %instance.id, "instance past missed time-to-live, deleting");
            return self.delete_instance_and_update_parent(&mut instance);
        }

        if now > instance.scheduled_time {
            let buffer_end =
                instance.scheduled_time + Duration::seconds(i64::from(self.config.fire_buffer_secs));
            if now < buffer_end {
                self.set_fired_state(&mut instance)?;
            } else {
                self.set_missed_state(&mut instance)?;
            }
        } else if instance.state == InstanceState::Snoozed {
            self.notifications.show(NotificationTier::Snoozed, &instance);
            self.arm(&instance, InstanceState::Fired, instance.scheduled_time);
        } else if now > instance.high_notification_time() {
            self.set_high_notification_state(&mut instance)?;
        } else if now > instance.low_notification_time() {
            if instance.state == InstanceState::HideNotification {
                self.set_hide_notification_state(&mut instance)?;
            } else {
                self.set_low_notification_state(&mut instance)?;
            }
        } else {
            self.set_silent_state(&mut instance)?;
        }
        Ok(())
    }

    /// Turn the instance's alarm back on. Returns `false` when there is no
    /// live alarm to turn on.
    fn reenable_parent(&self, instance: &AlarmInstance) -> Result<bool> {
        let Some(alarm_id) = instance.alarm_id else {
            return Ok(false);
        };
        let Some(mut record) = self.records.get(alarm_id)? else {
            return Ok(false);
        };
        if !record.enabled {
            info!(%alarm_id, "re-enabling alarm after clock moved back");
            record.enabled = true;
            self.records.update(&record)?;
        }
        Ok(true)
    }
}
