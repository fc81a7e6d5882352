use std::sync::{Arc, Mutex, MutexGuard};

use reveille_core::{AlarmConfig, AlarmError, AlarmInstance, InstanceId, InstanceState, Result};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::event::{AlarmEvent, Origin, TransitionRequest};
use crate::generation::{Generation, GenerationCounter};
use crate::manager::sweep::SweepReport;
use crate::traits::{
    InstanceStore, NextWakePublisher, NotificationSink, RecordStore, ToneSink, TransitionScheduler,
};
use crate::wake::{WakeGuard, WakeLock};

/// External collaborators the state machine drives.
#[derive(Clone)]
pub struct Collaborators {
    pub instances: Arc<dyn InstanceStore>,
    pub records: Arc<dyn RecordStore>,
    pub scheduler: Arc<dyn TransitionScheduler>,
    pub notifications: Arc<dyn NotificationSink>,
    pub tone: Arc<dyn ToneSink>,
    pub next_wake: Arc<dyn NextWakePublisher>,
    pub clock: Arc<dyn Clock>,
    pub wake_lock: Arc<dyn WakeLock>,
}

/// Drives every alarm instance through its lifecycle.
///
/// All public operations are serialized on one lock; the internal helpers
/// assume it is held and call each other freely.
pub struct AlarmStateManager {
    pub(super) config: AlarmConfig,
    pub(super) instances: Arc<dyn InstanceStore>,
    pub(super) records: Arc<dyn RecordStore>,
    pub(super) scheduler: Arc<dyn TransitionScheduler>,
    pub(super) notifications: Arc<dyn NotificationSink>,
    pub(super) tone: Arc<dyn ToneSink>,
    pub(super) next_wake: Arc<dyn NextWakePublisher>,
    pub(super) clock: Arc<dyn Clock>,
    wake_lock: Arc<dyn WakeLock>,
    pub(super) generation: GenerationCounter,
    /// The single instance currently allowed to ring.
    pub(super) firing: Mutex<Option<InstanceId>>,
    serial: Mutex<()>,
}

/// Held for the duration of one public operation. Fields drop in order, so
/// the serialization lock is released before the wake lock.
pub(super) struct Session<'a> {
    _serial: MutexGuard<'a, ()>,
    _wake: WakeGuard<'a>,
}

impl AlarmStateManager {
    pub fn new(config: AlarmConfig, collaborators: Collaborators, generation: GenerationCounter) -> Self {
        info!(
            generation = %generation.current(),
            snooze_minutes = config.snooze_minutes,
            "alarm state manager ready"
        );
        Self {
            config,
            instances: collaborators.instances,
            records: collaborators.records,
            scheduler: collaborators.scheduler,
            notifications: collaborators.notifications,
            tone: collaborators.tone,
            next_wake: collaborators.next_wake,
            clock: collaborators.clock,
            wake_lock: collaborators.wake_lock,
            generation,
            firing: Mutex::new(None),
            serial: Mutex::new(()),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation.current()
    }

    /// Instance currently ringing, if any.
    pub fn firing_instance(&self) -> Option<InstanceId> {
        *self.firing_slot()
    }

    pub(super) fn firing_slot(&self) -> MutexGuard<'_, Option<InstanceId>> {
        self.firing.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(super) fn session(&self) -> Session<'_> {
        let wake = WakeGuard::acquire(self.wake_lock.as_ref());
        let serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
        Session {
            _serial: serial,
            _wake: wake,
        }
    }

    // ── Entry points ────────────────────────────────────────────

    /// Handle any inbound event.
    pub fn dispatch(&self, event: AlarmEvent) -> Result<()> {
        debug!(%event, "dispatching alarm event");
        match event {
            AlarmEvent::Boot => {
                self.on_boot();
                Ok(())
            }
            AlarmEvent::TimeChanged => {
                self.on_time_or_timezone_changed();
                Ok(())
            }
            AlarmEvent::Transition(request) => self.on_transition(request),
        }
    }

    /// Process start: invalidate everything armed by earlier processes, then
    /// reconcile all instances.
    pub fn on_boot(&self) -> SweepReport {
        let _session = self.session();
        if let Err(e) = self.generation.bump() {
            warn!(error = %e, "failed to persist generation counter");
        }
        self.fix_alarm_instances()
    }

    pub fn on_time_or_timezone_changed(&self) -> SweepReport {
        let _session = self.session();
        self.fix_alarm_instances()
    }

    /// Delivery from the timer facility.
    pub fn on_scheduled_transition(
        &self,
        instance_id: InstanceId,
        target: InstanceState,
        generation: Generation,
    ) -> Result<()> {
        self.on_transition(TransitionRequest::scheduled(instance_id, target, generation))
    }

    /// Apply a transition request, scheduled or user-initiated.
    pub fn on_transition(&self, request: TransitionRequest) -> Result<()> {
        let _session = self.session();
        self.apply_transition(request)
    }

    pub fn on_user_snooze(&self, instance_id: InstanceId) -> Result<()> {
        let _session = self.session();
        self.apply_user_action(instance_id, |_| InstanceState::Snoozed)
    }

    /// Dismiss an instance: before it rings this pre-dismisses it, afterwards
    /// it finishes it.
    pub fn on_user_dismiss(&self, instance_id: InstanceId) -> Result<()> {
        let _session = self.session();
        self.apply_user_action(instance_id, |state| {
            if state.is_pre_fire() {
                InstanceState::Predismissed
            } else {
                InstanceState::Dismissed
            }
        })
    }

    /// Hide the low priority notification.
    pub fn on_user_hide(&self, instance_id: InstanceId) -> Result<()> {
        let _session = self.session();
        self.apply_user_action(instance_id, |_| InstanceState::HideNotification)
    }

    /// Earliest pending instance.
    pub fn next_alarm(&self) -> Result<Option<AlarmInstance>> {
        let _session = self.session();
        self.next_pending()
    }

    // ── Internals ───────────────────────────────────────────────

    /// User actions name an instance that must exist; the target may depend
    /// on its current state.
    fn apply_user_action(
        &self,
        instance_id: InstanceId,
        pick_target: impl FnOnce(InstanceState) -> InstanceState,
    ) -> Result<()> {
        let instance = self
            .instances
            .get(instance_id)?
            .ok_or(AlarmError::InstanceNotFound(instance_id))?;
        let request = TransitionRequest {
            instance_id,
            target: pick_target(instance.state),
            generation: self.generation.current(),
            origin: Origin::User,
        };
        self.apply_transition(request)
    }

    fn apply_transition(&self, request: TransitionRequest) -> Result<()> {
        let Some(mut instance) = self.instances.get(request.instance_id)? else {
            warn!(
                instance_id = %request.instance_id,
                target = %request.target,
                "transition for unknown instance ignored"
            );
            return Ok(());
        };

        let current = self.generation.current();
        if request.generation != current && !request.is_user_action() {
            info!(
                instance_id = %instance.id,
                target = %request.target,
                delivered = %request.generation,
                current = %current,
                "dropping stale transition"
            );
            return Ok(());
        }

        if !instance.state.accepts(request.target) {
            debug!(
                instance_id = %instance.id,
                state = %instance.state,
                target = %request.target,
                "instance already at or past target"
            );
            return Ok(());
        }

        self.set_state(&mut instance, request.target)
    }
}
