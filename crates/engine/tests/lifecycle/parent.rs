use chrono::{Datelike, Duration, Weekday};

use reveille_core::{AlarmInstance, AlarmRecord, InstanceState, Weekdays};
use reveille_engine::InstanceStore;

use crate::helpers::{dt, jan1, Harness};

#[test]
fn test_missed_repeating_alarm_schedules_successor() {
    let h = Harness::new(jan1(0, 0, 0));
    let (record, instance) = h.add(AlarmRecord::new(7, 0).unwrap().with_days(Weekdays::ALL));
    h.ring(instance.id);
    h.deliver(instance.id);
    assert_eq!(h.state(instance.id), Some(InstanceState::Missed));

    let successors: Vec<_> = h
        .instances_of(record.id)
        .into_iter()
        .filter(|i| i.id != instance.id)
        .collect();
    assert_eq!(successors.len(), 1);
    assert_eq!(successors[0].scheduled_time, dt(2024, 1, 2, 7, 0, 0));
    assert_eq!(successors[0].state, InstanceState::Silent);
    assert!(h.record(record.id).unwrap().enabled);
    assert_eq!(h.publisher.current(), Some((successors[0].id, dt(2024, 1, 2, 7, 0, 0))));
}

#[test]
fn test_finishing_before_own_slot_moves_past_it() {
    let h = Harness::new(jan1(0, 0, 0));
    let (record, instance) = h.add(AlarmRecord::new(7, 0).unwrap().with_days(Weekdays::ALL));
    h.ring(instance.id);

    // Clock set back before the ringing slot, then the user dismisses.
    h.clock.set(jan1(6, 0, 0));
    h.manager.on_user_dismiss(instance.id).unwrap();

    let remaining = h.instances_of(record.id);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].scheduled_time, dt(2024, 1, 2, 7, 0, 0));
}

#[test]
fn test_delete_after_use_removes_alarm() {
    let h = Harness::new(jan1(0, 0, 0));
    let mut record = AlarmRecord::new(7, 0).unwrap();
    record.delete_after_use = true;
    let (record, instance) = h.add(record);
    h.ring(instance.id);

    h.manager.on_user_dismiss(instance.id).unwrap();

    assert_eq!(h.record(record.id), None);
    assert!(h.instances_of(record.id).is_empty());
}

#[test]
fn test_ad_hoc_instance_runs_without_alarm() {
    let h = Harness::new(jan1(6, 40, 0));
    let instance = h
        .instances
        .insert_or_merge(AlarmInstance::new(jan1(7, 0, 0)))
        .unwrap();

    h.manager.on_time_or_timezone_changed();
    assert_eq!(h.state(instance.id), Some(InstanceState::HighNotification));

    h.ring(instance.id);
    h.manager.on_user_dismiss(instance.id).unwrap();
    assert_eq!(h.instance(instance.id), None);
    assert!(h.manager.alarms().unwrap().is_empty());
}

#[test]
fn test_every_finish_yields_one_later_successor() {
    let day_sets = [
        Weekdays::ALL,
        Weekdays::from_days(&[Weekday::Mon]),
        Weekdays::from_days(&[Weekday::Tue, Weekday::Sat]),
        Weekdays::from_days(&[Weekday::Sun]),
    ];

    for days in day_sets {
        for start_day in 1..=7 {
            let h = Harness::new(dt(2024, 1, start_day, 12, 0, 0));
            let (record, instance) = h.add(AlarmRecord::new(6, 15).unwrap().with_days(days));
            assert!(days.is_on(instance.scheduled_time.weekday()));

            h.ring(instance.id);
            h.clock.advance(Duration::minutes(2));
            h.manager.on_user_dismiss(instance.id).unwrap();

            let remaining = h.instances_of(record.id);
            assert_eq!(remaining.len(), 1, "days {} start {}", days, start_day);
            let successor = &remaining[0];
            assert!(successor.scheduled_time > instance.scheduled_time);
            assert!(days.is_on(successor.scheduled_time.weekday()));
            assert!(successor.scheduled_time - instance.scheduled_time <= Duration::days(7));
        }
    }
}

#[test]
fn test_successor_merge_keeps_predismissed_occurrence() {
    let h = Harness::new(jan1(0, 0, 0));
    let (record, monday) = h.add(AlarmRecord::new(7, 0).unwrap().with_days(Weekdays::ALL));
    h.ring(monday.id);
    h.deliver(monday.id);
    assert_eq!(h.state(monday.id), Some(InstanceState::Missed));

    let tuesday = h
        .instances_of(record.id)
        .into_iter()
        .find(|i| i.scheduled_time == dt(2024, 1, 2, 7, 0, 0))
        .unwrap();
    h.clock.set(jan1(10, 0, 0));
    h.manager.on_user_dismiss(tuesday.id).unwrap();
    assert_eq!(h.state(tuesday.id), Some(InstanceState::Predismissed));

    // Monday's missed notification expires and schedules Tuesday again.
    let expired = h.deliver(monday.id);
    assert_eq!((expired.target, expired.at), (InstanceState::Dismissed, jan1(19, 0, 0)));
    assert_eq!(h.instance(monday.id), None);

    assert_eq!(h.state(tuesday.id), Some(InstanceState::Predismissed));
    let armed = h.scheduler.armed_for(tuesday.id).unwrap();
    assert_eq!((armed.target, armed.at), (InstanceState::Dismissed, dt(2024, 1, 2, 7, 0, 0)));

    let mut times: Vec<_> = h.instances_of(record.id).iter().map(|i| i.scheduled_time).collect();
    times.sort();
    assert_eq!(times, vec![dt(2024, 1, 2, 7, 0, 0), dt(2024, 1, 3, 7, 0, 0)]);
    let wednesday = h
        .instances_of(record.id)
        .into_iter()
        .find(|i| i.scheduled_time == dt(2024, 1, 3, 7, 0, 0))
        .unwrap();
    assert_eq!(wednesday.state, InstanceState::Silent);
    assert_eq!(h.publisher.current(), Some((wednesday.id, dt(2024, 1, 3, 7, 0, 0))));
}
