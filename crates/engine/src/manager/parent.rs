use reveille_core::{AlarmInstance, Result};
use tracing::{debug, info, warn};

use crate::manager::AlarmStateManager;

impl AlarmStateManager {
    /// Called when `instance` finishes. One-shot alarms are consumed; repeating
    /// alarms get their next instance created and registered.
    pub(super) fn update_parent(&self, instance: &AlarmInstance) -> Result<()> {
        let Some(alarm_id) = instance.alarm_id else {
            return Ok(());
        };
        let Some(record) = self.records.get(alarm_id)? else {
            warn!(instance_id = %instance.id, %alarm_id, "parent alarm is gone");
            return Ok(());
        };

        if !record.is_repeating() {
            if record.delete_after_use {
                info!(%alarm_id, "deleting one-shot alarm after use");
                self.records.delete(alarm_id)?;
            } else if record.enabled {
                info!(%alarm_id, "disabling one-shot alarm");
                self.records.disable(alarm_id)?;
            }
            return Ok(());
        }

        let now = self.clock.now();
        let mut next = record.create_instance_after(now);
        if instance.state.is_past_fired() && next.scheduled_time == instance.scheduled_time {
            // The clock sits before the finished slot; move past it.
            next = record.create_instance_after(instance.scheduled_time);
        }

        let next = self.instances.insert_or_merge(next)?;
        if !next.state.is_pending() {
            debug!(instance_id = %next.id, state = ?next.state, "next occurrence already handled");
            return Ok(());
        }
        info!(%alarm_id, instance_id = %next.id, at = %next.scheduled_time, "scheduled next occurrence");
        self.register_instance(next, false)
    }
}
