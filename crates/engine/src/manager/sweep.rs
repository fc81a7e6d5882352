//! Reconciliation pass run after boot or a clock discontinuity.

use chrono::NaiveDateTime;
use reveille_core::{AlarmInstance, Result};
use tracing::{error, info, warn};

use crate::manager::AlarmStateManager;

/// Outcome counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Instances reconciled in place.
    pub registered: usize,
    /// Instances deleted because their alarm is gone or the clock moved too far.
    pub deleted: usize,
    /// Rows that could not be decoded.
    pub skipped: usize,
    /// Instances whose reconciliation failed.
    pub failed: usize,
}

enum FixOutcome {
    Registered,
    Deleted,
    Gone,
}

impl AlarmStateManager {
    /// Reconcile every stored instance. Never aborts part way: a failure on
    /// one instance is logged and the sweep moves on.
    pub(super) fn fix_alarm_instances(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let now = self.clock.now();

        let rows = match self.instances.all_rows() {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "could not read alarm instances");
                report.failed += 1;
                self.publish_after_sweep();
                return report;
            }
        };

        let mut instances: Vec<AlarmInstance> = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match AlarmInstance::try_from(row) {
                Ok(instance) => instances.push(instance),
                Err(e) => {
                    warn!(instance_id = %id, error = %e, "skipping undecodable instance");
                    report.skipped += 1;
                }
            }
        }

        // Latest first, so regenerating an earlier occurrence cannot clobber
        // a later one that was already fixed up.
        instances.sort_by(|a, b| {
            b.scheduled_time
                .cmp(&a.scheduled_time)
                .then(b.id.cmp(&a.id))
        });

        for instance in instances {
            let id = instance.id;
            match self.fix_instance(instance, now) {
                Ok(FixOutcome::Registered) => report.registered += 1,
                Ok(FixOutcome::Deleted) => report.deleted += 1,
                Ok(FixOutcome::Gone) => {}
                Err(e) => {
                    error!(instance_id = %id, error = %e, "failed to reconcile instance");
                    report.failed += 1;
                }
            }
        }

        self.publish_after_sweep();
        info!(
            registered = report.registered,
            deleted = report.deleted,
            skipped = report.skipped,
            failed = report.failed,
            "alarm instances reconciled"
        );
        report
    }

    fn fix_instance(&self, instance: AlarmInstance, now: NaiveDateTime) -> Result<FixOutcome> {
        // Earlier iterations may have deleted or rewritten this row.
        let Some(mut instance) = self.instances.get(instance.id)? else {
            return Ok(FixOutcome::Gone);
        };

        if let Some(alarm_id) = instance.alarm_id {
            let Some(record) = self.records.get(alarm_id)? else {
                warn!(instance_id = %instance.id, %alarm_id, "instance without alarm, deleting");
                self.unregister_instance(&mut instance)?;
                self.instances.delete(instance.id)?;
                return Ok(FixOutcome::Deleted);
            };

            let prior = record.previous_alarm_time(instance.scheduled_time);
            let too_early = prior.is_some_and(|prior| now < prior);
            if too_early || now > instance.missed_time_to_live() {
                info!(
                    instance_id = %instance.id,
                    old = %instance.scheduled_time,
                    new = %record.next_alarm_time(now),
                    "clock change invalidated instance"
                );
                self.delete_instance_and_update_parent(&mut instance)?;
                return Ok(FixOutcome::Deleted);
            }
        }

        self.register_instance(instance, false)?;
        Ok(FixOutcome::Registered)
    }

    fn publish_after_sweep(&self) {
        if let Err(e) = self.update_next_wake() {
            error!(error = %e, "failed to publish next alarm");
        }
    }
}
