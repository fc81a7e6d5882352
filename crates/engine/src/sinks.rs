//! Collaborators for a headless host: everything is reported through tracing.

use reveille_core::AlarmInstance;
use tracing::info;

use crate::traits::{NextWakePublisher, NotificationSink, NotificationTier, ToneSink};

pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn show(&self, tier: NotificationTier, instance: &AlarmInstance) {
        info!(
            instance_id = %instance.id,
            tier = ?tier,
            label = instance.label_or_default(),
            at = %instance.scheduled_time,
            "notification shown"
        );
    }

    fn clear(&self, instance: &AlarmInstance) {
        info!(instance_id = %instance.id, "notification cleared");
    }
}

pub struct LogToneSink;

impl ToneSink for LogToneSink {
    fn start(&self, instance: &AlarmInstance) {
        info!(
            instance_id = %instance.id,
            ringtone = %instance.ringtone,
            vibrate = instance.vibrate,
            "ALARM RINGING: {}",
            instance.label_or_default()
        );
    }

    fn stop(&self) {
        info!("alarm tone stopped");
    }
}

pub struct LogNextWakePublisher;

impl NextWakePublisher for LogNextWakePublisher {
    fn publish(&self, instance: &AlarmInstance) {
        info!(instance_id = %instance.id, at = %instance.scheduled_time, "next alarm");
    }

    fn cancel(&self) {
        info!("no upcoming alarms");
    }
}
