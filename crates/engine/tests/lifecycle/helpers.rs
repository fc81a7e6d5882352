use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use reveille_core::{AlarmConfig, AlarmId, AlarmInstance, AlarmRecord, InstanceId, InstanceState};
use reveille_engine::generation::{GenerationCounter, MemoryGenerationStore};
use reveille_engine::wake::CountingWakeLock;
use reveille_engine::{
    AlarmStateManager, Clock, Collaborators, Generation, InstanceStore, ManualClock, MemoryStore,
    NextWakePublisher, NotificationSink, NotificationTier, RecordStore, ToneSink,
    TransitionScheduler,
};

pub fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

/// Monday 2024-01-01 at the given time.
pub fn jan1(h: u32, mi: u32, s: u32) -> NaiveDateTime {
    dt(2024, 1, 1, h, mi, s)
}

// ── Recording collaborators ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Armed {
    pub target: InstanceState,
    pub at: NaiveDateTime,
    pub generation: Generation,
}

#[derive(Default)]
pub struct RecordingScheduler {
    armed: Mutex<HashMap<InstanceId, Armed>>,
    cancelled: Mutex<Vec<InstanceId>>,
}

impl RecordingScheduler {
    pub fn armed_for(&self, id: InstanceId) -> Option<Armed> {
        self.armed.lock().unwrap().get(&id).copied()
    }

    pub fn take(&self, id: InstanceId) -> Option<Armed> {
        self.armed.lock().unwrap().remove(&id)
    }

    pub fn was_cancelled(&self, id: InstanceId) -> bool {
        self.cancelled.lock().unwrap().contains(&id)
    }
}

impl TransitionScheduler for RecordingScheduler {
    fn arm(&self, instance_id: InstanceId, target: InstanceState, at: NaiveDateTime, generation: Generation) {
        self.armed.lock().unwrap().insert(
            instance_id,
            Armed {
                target,
                at,
                generation,
            },
        );
    }

    fn cancel(&self, instance_id: InstanceId) {
        self.armed.lock().unwrap().remove(&instance_id);
        self.cancelled.lock().unwrap().push(instance_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    Show(NotificationTier, InstanceId),
    Clear(InstanceId),
}

#[derive(Default)]
pub struct RecordingNotifications {
    log: Mutex<Vec<Shown>>,
}

impl RecordingNotifications {
    pub fn log(&self) -> Vec<Shown> {
        self.log.lock().unwrap().clone()
    }

    pub fn last_for(&self, id: InstanceId) -> Option<Shown> {
        self.log()
            .into_iter()
            .rev()
            .find(|s| matches!(s, Shown::Show(_, i) | Shown::Clear(i) if *i == id))
    }

    pub fn count(&self, shown: Shown) -> usize {
        self.log().into_iter().filter(|s| *s == shown).count()
    }
}

impl NotificationSink for RecordingNotifications {
    fn show(&self, tier: NotificationTier, instance: &AlarmInstance) {
        self.log.lock().unwrap().push(Shown::Show(tier, instance.id));
    }

    fn clear(&self, instance: &AlarmInstance) {
        self.log.lock().unwrap().push(Shown::Clear(instance.id));
    }
}

#[derive(Default)]
pub struct RecordingTone {
    started: Mutex<Vec<InstanceId>>,
    stops: AtomicUsize,
}

impl RecordingTone {
    pub fn started(&self) -> Vec<InstanceId> {
        self.started.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl ToneSink for RecordingTone {
    fn start(&self, instance: &AlarmInstance) {
        self.started.lock().unwrap().push(instance.id);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    current: Mutex<Option<(InstanceId, NaiveDateTime)>>,
}

impl RecordingPublisher {
    pub fn current(&self) -> Option<(InstanceId, NaiveDateTime)> {
        *self.current.lock().unwrap()
    }
}

impl NextWakePublisher for RecordingPublisher {
    fn publish(&self, instance: &AlarmInstance) {
        *self.current.lock().unwrap() = Some((instance.id, instance.scheduled_time));
    }

    fn cancel(&self) {
        *self.current.lock().unwrap() = None;
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub manager: AlarmStateManager,
    pub instances: Arc<dyn InstanceStore>,
    pub records: Arc<dyn RecordStore>,
    pub clock: Arc<ManualClock>,
    pub config: AlarmConfig,
    pub scheduler: Arc<RecordingScheduler>,
    pub notifications: Arc<RecordingNotifications>,
    pub tone: Arc<RecordingTone>,
    pub publisher: Arc<RecordingPublisher>,
    pub wake: Arc<CountingWakeLock>,
}

impl Harness {
    /// Booted manager over an empty in-memory store.
    pub fn new(start: NaiveDateTime) -> Self {
        Self::with_config(start, AlarmConfig::default())
    }

    pub fn with_config(start: NaiveDateTime, config: AlarmConfig) -> Self {
        Self::with_store(start, config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store<S>(start: NaiveDateTime, config: AlarmConfig, store: Arc<S>) -> Self
    where
        S: InstanceStore + RecordStore + 'static,
    {
        Self::build(
            config,
            store.clone(),
            store,
            Arc::new(ManualClock::new(start)),
            0,
        )
    }

    fn build(
        config: AlarmConfig,
        instances: Arc<dyn InstanceStore>,
        records: Arc<dyn RecordStore>,
        clock: Arc<ManualClock>,
        generation: u64,
    ) -> Self {
        let scheduler = Arc::new(RecordingScheduler::default());
        let notifications = Arc::new(RecordingNotifications::default());
        let tone = Arc::new(RecordingTone::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let wake = Arc::new(CountingWakeLock::default());

        let counter = GenerationCounter::load(Box::new(MemoryGenerationStore::new(generation))).unwrap();
        let manager = AlarmStateManager::new(
            config.clone(),
            Collaborators {
                instances: instances.clone(),
                records: records.clone(),
                scheduler: scheduler.clone(),
                notifications: notifications.clone(),
                tone: tone.clone(),
                next_wake: publisher.clone(),
                clock: clock.clone(),
                wake_lock: wake.clone(),
            },
            counter,
        );
        manager.on_boot();

        Self {
            manager,
            instances,
            records,
            clock,
            config,
            scheduler,
            notifications,
            tone,
            publisher,
            wake,
        }
    }

    /// A new process over the same store and clock, with fresh collaborators.
    pub fn restart(&self) -> Harness {
        Self::build(
            self.config.clone(),
            self.instances.clone(),
            self.records.clone(),
            self.clock.clone(),
            self.manager.generation().0,
        )
    }

    pub fn add(&self, record: AlarmRecord) -> (AlarmRecord, AlarmInstance) {
        let (record, instance) = self.manager.add_alarm(record).unwrap();
        (record, instance.expect("enabled alarm gets an instance"))
    }

    pub fn add_at(&self, hour: u32, minute: u32) -> (AlarmRecord, AlarmInstance) {
        self.add(AlarmRecord::new(hour, minute).unwrap())
    }

    pub fn instance(&self, id: InstanceId) -> Option<AlarmInstance> {
        self.instances.get(id).unwrap()
    }

    pub fn state(&self, id: InstanceId) -> Option<InstanceState> {
        self.instance(id).map(|i| i.state)
    }

    pub fn instances_of(&self, alarm_id: AlarmId) -> Vec<AlarmInstance> {
        self.instances.by_alarm_id(alarm_id).unwrap()
    }

    pub fn record(&self, alarm_id: AlarmId) -> Option<AlarmRecord> {
        self.records.get(alarm_id).unwrap()
    }

    /// Deliver the transition armed for `id`, moving the clock forward to its
    /// deadline first.
    pub fn deliver(&self, id: InstanceId) -> Armed {
        let armed = self
            .scheduler
            .take(id)
            .unwrap_or_else(|| panic!("nothing armed for {}", id));
        if armed.at > self.clock.now() {
            self.clock.set(armed.at);
        }
        self.manager
            .on_scheduled_transition(id, armed.target, armed.generation)
            .unwrap();
        armed
    }

    /// Deliver armed transitions until the instance is ringing.
    pub fn ring(&self, id: InstanceId) {
        while self.state(id) != Some(InstanceState::Fired) {
            self.deliver(id);
        }
    }
}
