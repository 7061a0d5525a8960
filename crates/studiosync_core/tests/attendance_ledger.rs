use std::sync::Arc;

use chrono::NaiveDate;
use studiosync_core::{
    AttendanceLedger, AttendanceStatus, Course, SqliteStore, Student, StudentPatch, SyncEngine,
};

fn engine() -> Arc<SyncEngine> {
    let store = SqliteStore::open_in_memory().unwrap();
    Arc::new(SyncEngine::new(Arc::new(store)).unwrap())
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[test]
fn upsert_converges_to_a_single_entry_per_key() {
    let engine = engine();
    let ledger = AttendanceLedger::new(Arc::clone(&engine));
    let day = date(2026, 4, 10);

    let first_id = ledger
        .upsert("s1", "c1", day, AttendanceStatus::Absent)
        .unwrap();
    let second_id = ledger
        .upsert("s1", "c1", day, AttendanceStatus::Present)
        .unwrap();

    // The correction reuses the existing document.
    assert_eq!(first_id, second_id);
    assert_eq!(engine.attendance().len(), 1);

    let entry = ledger.entry("s1", "c1", day).unwrap();
    assert_eq!(entry.status, AttendanceStatus::Present);
}

#[test]
fn distinct_keys_create_distinct_entries() {
    let engine = engine();
    let ledger = AttendanceLedger::new(Arc::clone(&engine));
    let day = date(2026, 4, 10);

    ledger.upsert("s1", "c1", day, AttendanceStatus::Present).unwrap();
    ledger.upsert("s2", "c1", day, AttendanceStatus::Late).unwrap();
    ledger
        .upsert("s1", "c1", date(2026, 4, 17), AttendanceStatus::Transfer)
        .unwrap();
    ledger
        .upsert("s1", "c2", day, AttendanceStatus::EarlyLeave)
        .unwrap();

    assert_eq!(engine.attendance().len(), 4);
    assert_eq!(
        ledger.entry("s2", "c1", day).unwrap().status,
        AttendanceStatus::Late
    );
}

#[test]
fn day_sheet_lists_only_matching_course_and_date() {
    let engine = engine();
    let ledger = AttendanceLedger::new(Arc::clone(&engine));
    let day = date(2026, 4, 10);

    ledger.upsert("s1", "c1", day, AttendanceStatus::Present).unwrap();
    ledger.upsert("s2", "c1", day, AttendanceStatus::Absent).unwrap();
    ledger.upsert("s3", "c2", day, AttendanceStatus::Present).unwrap();
    ledger
        .upsert("s1", "c1", date(2026, 4, 17), AttendanceStatus::Present)
        .unwrap();

    let sheet = ledger.entries_for("c1", day);
    assert_eq!(sheet.len(), 2);
    assert!(sheet.iter().all(|entry| entry.course_id == "c1" && entry.date == day));
}

#[test]
fn roster_reflects_current_course_assignment() {
    let engine = engine();
    let ledger = AttendanceLedger::new(Arc::clone(&engine));

    let course = engine.create_course(&Course::new("Ballet", "Ito", 8000)).unwrap();
    let enrolled = engine.create_student(&Student::new("Hana", "Sato")).unwrap();
    engine
        .update_student(
            &enrolled,
            StudentPatch {
                class_ids: Some(vec![course.clone()]),
                ..StudentPatch::default()
            },
        )
        .unwrap();
    engine.create_student(&Student::new("Mio", "Kato")).unwrap();

    let roster = ledger.roster(&course);
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].id, enrolled);
}
