//! Integration tests for presence tracking, queries and admin resets.

mod common;

use common::{join, leave, move_channel, secs, t0, RecordingSink};
use proptest::prelude::*;
use voicetime_core::{
    admin, Database, Event, NotificationPolicy, PresenceTracker, SessionQueryService,
    ThresholdEvaluator, TimeStore, Transition,
};

fn tracker<'a>(
    db: &'a Database,
    sink: &'a RecordingSink,
) -> PresenceTracker<'a, Database, Database> {
    PresenceTracker::new(
        db,
        ThresholdEvaluator::new(db, sink, NotificationPolicy::PerThreshold),
    )
}

#[test]
fn leave_without_join_is_a_noop() {
    let db = Database::open_memory().unwrap();
    let sink = RecordingSink::default();
    let tracker = tracker(&db, &sink);

    // Existing record with time but no open session.
    tracker.on_presence_change(&join(7, 1, t0())).unwrap();
    tracker.on_presence_change(&leave(7, 1, t0() + secs(30))).unwrap();

    let outcome = tracker
        .on_presence_change(&leave(7, 1, t0() + secs(500)))
        .unwrap();
    assert_eq!(outcome.transition, Transition::Left);
    assert!(matches!(outcome.events[0], Event::LeaveIgnored { member_id: 7, .. }));

    let record = db.voice_record(7).unwrap().unwrap();
    assert_eq!(record.accumulated_seconds, 30.0);
    assert!(record.open_session_start.is_none());
}

#[test]
fn join_then_leave_accrues_elapsed_time() {
    let db = Database::open_memory().unwrap();
    let sink = RecordingSink::default();
    let tracker = tracker(&db, &sink);

    tracker.on_presence_change(&join(7, 1, t0())).unwrap();
    tracker.on_presence_change(&leave(7, 1, t0() + secs(90))).unwrap();

    let record = db.voice_record(7).unwrap().unwrap();
    assert_eq!(record.accumulated_seconds, 90.0);
    assert!(record.open_session_start.is_none());
}

#[test]
fn sessions_accumulate_across_cycles() {
    let db = Database::open_memory().unwrap();
    let sink = RecordingSink::default();
    let tracker = tracker(&db, &sink);

    tracker.on_presence_change(&join(7, 1, t0())).unwrap();
    tracker.on_presence_change(&leave(7, 1, t0() + secs(30))).unwrap();
    tracker.on_presence_change(&join(7, 2, t0() + secs(100))).unwrap();
    tracker.on_presence_change(&leave(7, 2, t0() + secs(145))).unwrap();

    let record = db.voice_record(7).unwrap().unwrap();
    assert_eq!(record.accumulated_seconds, 75.0);
}

#[test]
fn query_includes_open_session_without_mutation() {
    let db = Database::open_memory().unwrap();
    let sink = RecordingSink::default();
    let tracker = tracker(&db, &sink);

    tracker.on_presence_change(&join(7, 1, t0())).unwrap();
    tracker.on_presence_change(&leave(7, 1, t0() + secs(20))).unwrap();
    tracker.on_presence_change(&join(7, 1, t0() + secs(60))).unwrap();
    let before = db.voice_record(7).unwrap();

    let query = SessionQueryService::new(&db);
    let report = query.current_total(7, t0() + secs(100)).unwrap();
    assert_eq!(report.seconds, 20.0 + 40.0);
    assert!(report.in_session);
    assert!(report.has_record);

    // A later query sees more time; the stored record never changes.
    let later = query.current_total(7, t0() + secs(160)).unwrap();
    assert_eq!(later.seconds, 120.0);
    assert_eq!(db.voice_record(7).unwrap(), before);
}

#[test]
fn channel_move_changes_nothing() {
    let db = Database::open_memory().unwrap();
    admin::add_threshold(&db, 50, 0.0).unwrap();
    let sink = RecordingSink::default();
    let tracker = tracker(&db, &sink);

    tracker.on_presence_change(&join(7, 1, t0())).unwrap();
    let before = db.voice_record(7).unwrap();

    let outcome = tracker
        .on_presence_change(&move_channel(7, 1, 2, t0() + secs(300)))
        .unwrap();

    assert_eq!(outcome.transition, Transition::Ignored);
    assert!(outcome.events.is_empty());
    assert_eq!(db.voice_record(7).unwrap(), before);
    assert_eq!(sink.grant_count(), 0);
}

#[test]
fn members_are_tracked_independently() {
    let db = Database::open_memory().unwrap();
    let sink = RecordingSink::default();
    let tracker = tracker(&db, &sink);

    tracker.on_presence_change(&join(1, 1, t0())).unwrap();
    tracker.on_presence_change(&join(2, 1, t0() + secs(10))).unwrap();
    tracker.on_presence_change(&leave(1, 1, t0() + secs(40))).unwrap();
    tracker.on_presence_change(&leave(2, 1, t0() + secs(25))).unwrap();

    assert_eq!(db.voice_record(1).unwrap().unwrap().accumulated_seconds, 40.0);
    assert_eq!(db.voice_record(2).unwrap().unwrap().accumulated_seconds, 15.0);
}

#[test]
fn reset_removes_records_but_keeps_thresholds() {
    let db = Database::open_memory().unwrap();
    let sink = RecordingSink::default();
    let tracker = tracker(&db, &sink);

    admin::add_threshold(&db, 50, 10.0).unwrap();
    admin::add_threshold(&db, 60, 20.0).unwrap();
    tracker.on_presence_change(&join(1, 1, t0())).unwrap();
    tracker.on_presence_change(&leave(1, 1, t0() + secs(30))).unwrap();
    tracker.on_presence_change(&join(2, 1, t0())).unwrap();

    assert_eq!(admin::reset_all(&db).unwrap(), 2);
    assert_eq!(admin::list_thresholds(&db).unwrap().len(), 2);

    let query = SessionQueryService::new(&db);
    for member in [1, 2] {
        let report = query.current_total(member, t0() + secs(600)).unwrap();
        assert!(!report.has_record);
        assert_eq!(report.seconds, 0.0);
    }
}

#[test]
fn delete_time_reports_whether_record_existed() {
    let db = Database::open_memory().unwrap();
    let sink = RecordingSink::default();
    let tracker = tracker(&db, &sink);

    tracker.on_presence_change(&join(1, 1, t0())).unwrap();
    assert!(admin::delete_time(&db, 1).unwrap());
    assert!(!admin::delete_time(&db, 1).unwrap());

    // A leave after deletion finds no session and stays a no-op.
    let outcome = tracker.on_presence_change(&leave(1, 1, t0() + secs(10))).unwrap();
    assert!(matches!(outcome.events[0], Event::LeaveIgnored { .. }));
    assert!(db.voice_record(1).unwrap().is_none());
}

proptest! {
    #[test]
    fn accumulated_time_is_the_sum_of_sessions(
        sessions in prop::collection::vec((0i64..3_600, 0i64..3_600), 1..12)
    ) {
        let db = Database::open_memory().unwrap();
        let sink = RecordingSink::default();
        let tracker = tracker(&db, &sink);

        let mut cursor = t0();
        let mut expected = 0.0;
        for (gap, length) in &sessions {
            cursor = cursor + secs(*gap);
            tracker.on_presence_change(&join(3, 1, cursor)).unwrap();
            cursor = cursor + secs(*length);
            tracker.on_presence_change(&leave(3, 1, cursor)).unwrap();
            expected += *length as f64;
        }

        let record = db.voice_record(3).unwrap().unwrap();
        prop_assert_eq!(record.accumulated_seconds, expected);
        prop_assert!(record.open_session_start.is_none());
    }
}
