use std::sync::Arc;

use chrono::Duration;

use reveille_core::{AlarmConfig, AlarmId, AlarmInstance, AlarmRecord, InstanceId, InstanceRow, InstanceState, Weekdays};
use reveille_engine::{Generation, InstanceStore, MemoryStore, NotificationTier, SweepReport};

use crate::helpers::{dt, jan1, Harness, Shown};

#[test]
fn test_low_advances_to_high_after_time_change() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, instance) = h.add_at(7, 0);
    h.deliver(instance.id);
    assert_eq!(h.state(instance.id), Some(InstanceState::LowNotification));

    h.clock.set(jan1(6, 31, 0));
    let report = h.manager.on_time_or_timezone_changed();

    assert_eq!(report.registered, 1);
    assert_eq!(h.state(instance.id), Some(InstanceState::HighNotification));
    let armed = h.scheduler.armed_for(instance.id).unwrap();
    assert_eq!((armed.target, armed.at), (InstanceState::Fired, jan1(7, 0, 0)));
}

#[test]
fn test_reconcile_within_fire_buffer_rings() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, instance) = h.add_at(7, 0);

    h.clock.set(jan1(7, 0, 10));
    h.manager.on_time_or_timezone_changed();

    assert_eq!(h.state(instance.id), Some(InstanceState::Fired));
    assert_eq!(h.tone.started(), vec![instance.id]);
}

#[test]
fn test_reconcile_past_fire_buffer_is_missed() {
    let h = Harness::new(jan1(0, 0, 0));
    let (record, instance) = h.add_at(7, 0);

    h.clock.set(jan1(7, 0, 20));
    h.manager.on_time_or_timezone_changed();

    assert_eq!(h.state(instance.id), Some(InstanceState::Missed));
    assert!(h.tone.started().is_empty());
    assert!(!h.record(record.id).unwrap().enabled);
    // A missed one-shot is not rescheduled.
    assert_eq!(h.instances_of(record.id).len(), 1);
}

#[test]
fn test_expired_instance_is_deleted() {
    let h = Harness::new(jan1(0, 0, 0));
    let (record, instance) = h.add_at(7, 0);

    h.clock.set(jan1(19, 0, 1));
    let report = h.manager.on_time_or_timezone_changed();

    assert_eq!(report.deleted, 1);
    assert_eq!(h.instance(instance.id), None);
    assert!(!h.record(record.id).unwrap().enabled);
    assert_eq!(h.publisher.current(), None);
}

#[test]
fn test_ringing_alarm_survives_restart() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, instance) = h.add_at(7, 0);
    h.ring(instance.id);

    h.clock.set(jan1(7, 5, 0));
    let after = h.restart();

    assert_eq!(after.state(instance.id), Some(InstanceState::Fired));
    assert_eq!(after.tone.started(), vec![instance.id]);
    assert_eq!(
        after.notifications.last_for(instance.id),
        Some(Shown::Show(NotificationTier::Firing, instance.id))
    );
}

#[test]
fn test_ringing_alarm_times_out_across_restart() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, instance) = h.add_at(7, 0);
    h.ring(instance.id);

    h.clock.set(jan1(7, 11, 0));
    let after = h.restart();

    assert_eq!(after.state(instance.id), Some(InstanceState::Missed));
    assert!(after.tone.started().is_empty());
}

#[test]
fn test_predismissed_survives_restart_until_due() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, instance) = h.add_at(7, 0);
    h.clock.set(jan1(6, 0, 0));
    h.manager.on_user_dismiss(instance.id).unwrap();

    h.clock.set(jan1(6, 10, 0));
    let after = h.restart();
    assert_eq!(after.state(instance.id), Some(InstanceState::Predismissed));
    let armed = after.scheduler.armed_for(instance.id).unwrap();
    assert_eq!((armed.target, armed.at), (InstanceState::Dismissed, jan1(7, 0, 0)));

    h.clock.set(jan1(7, 0, 1));
    let later = after.restart();
    assert_eq!(later.instance(instance.id), None);
}

#[test]
fn test_snoozed_keeps_its_time_until_due() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, instance) = h.add_at(7, 0);
    h.ring(instance.id);
    h.manager.on_user_snooze(instance.id).unwrap();

    h.clock.set(jan1(7, 5, 0));
    h.manager.on_time_or_timezone_changed();
    let snoozed = h.instance(instance.id).unwrap();
    assert_eq!(snoozed.state, InstanceState::Snoozed);
    assert_eq!(snoozed.scheduled_time, jan1(7, 10, 0));
    let armed = h.scheduler.armed_for(instance.id).unwrap();
    assert_eq!((armed.target, armed.at), (InstanceState::Fired, jan1(7, 10, 0)));

    h.clock.set(jan1(7, 10, 5));
    h.manager.on_time_or_timezone_changed();
    assert_eq!(h.state(instance.id), Some(InstanceState::Fired));
}

#[test]
fn test_hidden_notification_stays_hidden() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, instance) = h.add_at(7, 0);
    h.deliver(instance.id);
    h.manager.on_user_hide(instance.id).unwrap();

    h.clock.set(jan1(6, 0, 0));
    h.manager.on_time_or_timezone_changed();

    assert_eq!(h.state(instance.id), Some(InstanceState::HideNotification));
    assert_eq!(h.notifications.last_for(instance.id), Some(Shown::Clear(instance.id)));
}

#[test]
fn test_unknown_state_rows_are_skipped() {
    let store = Arc::new(MemoryStore::new());
    let h = Harness::with_store(jan1(0, 0, 0), AlarmConfig::default(), store.clone());
    let (record, instance) = h.add_at(7, 0);

    let mut bad = InstanceRow::from(&instance);
    bad.id = InstanceId(900);
    bad.scheduled_time = jan1(8, 0, 0);
    bad.alarm_state = 42;
    store.insert_row(bad);

    h.clock.set(jan1(6, 45, 0));
    let report = h.manager.on_time_or_timezone_changed();

    assert_eq!(
        report,
        SweepReport {
            registered: 1,
            deleted: 0,
            skipped: 1,
            failed: 0,
        }
    );
    assert_eq!(h.state(instance.id), Some(InstanceState::HighNotification));
    assert_eq!(h.instances_of(record.id).len(), 1);
    assert_eq!(store.all_rows().unwrap().len(), 2);
}

#[test]
fn test_orphaned_instance_is_deleted() {
    let h = Harness::new(jan1(0, 0, 0));
    let mut orphan = AlarmInstance::new(jan1(7, 0, 0));
    orphan.alarm_id = Some(AlarmId(42));
    let orphan = h.instances.insert_or_merge(orphan).unwrap();

    let report = h.manager.on_boot();

    assert_eq!(report.deleted, 1);
    assert_eq!(h.instance(orphan.id), None);
}

#[test]
fn test_clock_jump_backwards_regenerates_instance() {
    let h = Harness::new(dt(2024, 1, 10, 0, 0, 0));
    let (record, instance) = h.add(AlarmRecord::new(7, 0).unwrap().with_days(Weekdays::ALL));
    assert_eq!(instance.scheduled_time, dt(2024, 1, 10, 7, 0, 0));

    h.clock.set(dt(2024, 1, 8, 12, 0, 0));
    let report = h.manager.on_time_or_timezone_changed();

    assert_eq!(report.deleted, 1);
    assert_eq!(h.instance(instance.id), None);
    let instances = h.instances_of(record.id);
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].scheduled_time, dt(2024, 1, 9, 7, 0, 0));
    assert_eq!(instances[0].state, InstanceState::Silent);
}

#[test]
fn test_missed_alarm_rewound_reenables_its_alarm() {
    let h = Harness::new(jan1(0, 0, 0));
    let (record, instance) = h.add_at(7, 0);
    h.clock.set(jan1(7, 0, 20));
    h.manager.on_time_or_timezone_changed();
    assert!(!h.record(record.id).unwrap().enabled);

    h.clock.set(jan1(6, 0, 0));
    h.manager.on_time_or_timezone_changed();

    assert!(h.record(record.id).unwrap().enabled);
    assert_eq!(h.state(instance.id), Some(InstanceState::LowNotification));
}

#[test]
fn test_consumed_one_shot_does_not_resurrect() {
    let h = Harness::new(jan1(0, 0, 0));
    let mut record = AlarmRecord::new(7, 0).unwrap();
    record.delete_after_use = true;
    let (record, instance) = h.add(record);

    h.clock.set(jan1(7, 0, 20));
    h.manager.on_time_or_timezone_changed();
    assert_eq!(h.record(record.id), None);
    assert_eq!(h.state(instance.id), Some(InstanceState::Missed));

    h.clock.set(jan1(6, 0, 0));
    h.manager.on_time_or_timezone_changed();
    assert_eq!(h.instance(instance.id), None);
}

#[test]
fn test_restart_invalidates_earlier_timers() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, instance) = h.add_at(7, 0);
    let old = h.scheduler.armed_for(instance.id).unwrap();

    let after = h.restart();
    assert_eq!(after.manager.generation(), Generation(old.generation.0 + 1));
    let rearmed = after.scheduler.armed_for(instance.id).unwrap();
    assert_eq!(rearmed.generation, after.manager.generation());
    assert_eq!(rearmed.at, old.at);

    // The timer armed by the previous process fires late and is dropped.
    h.clock.set(old.at);
    after
        .manager
        .on_scheduled_transition(instance.id, old.target, old.generation)
        .unwrap();
    assert_eq!(after.state(instance.id), Some(InstanceState::Silent));
}

#[test]
fn test_sweep_publishes_earliest_pending() {
    let h = Harness::new(jan1(0, 0, 0));
    let (_, later) = h.add_at(9, 0);
    let (_, earlier) = h.add_at(8, 0);
    assert_ne!(later.id, earlier.id);

    h.clock.advance(Duration::minutes(1));
    h.manager.on_time_or_timezone_changed();

    assert_eq!(h.publisher.current(), Some((earlier.id, jan1(8, 0, 0))));
    assert_eq!(h.manager.next_alarm().unwrap().map(|i| i.id), Some(earlier.id));
}
