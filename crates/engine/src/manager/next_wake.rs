use reveille_core::{AlarmInstance, Result};
use tracing::debug;

use crate::manager::AlarmStateManager;

impl AlarmStateManager {
    /// Earliest instance that will still ring. Ties go to the lower id.
    pub(super) fn next_pending(&self) -> Result<Option<AlarmInstance>> {
        Ok(self
            .instances
            .pending()?
            .into_iter()
            .min_by(|a, b| {
                a.scheduled_time
                    .cmp(&b.scheduled_time)
                    .then(a.id.cmp(&b.id))
            }))
    }

    pub(super) fn update_next_wake(&self) -> Result<()> {
        match self.next_pending()? {
            Some(next) => {
                debug!(instance_id = %next.id, at = %next.scheduled_time, "publishing next alarm");
                self.next_wake.publish(&next);
            }
            None => {
                debug!("no pending alarms, cancelling next alarm indicator");
                self.next_wake.cancel();
            }
        }
        Ok(())
    }
}
