use std::sync::Arc;

use studiosync_core::service::billing::BillingError;
use studiosync_core::{
    BillingService, CascadeService, Course, SqliteStore, Student, StudentPatch, SyncEngine,
};

fn engine() -> Arc<SyncEngine> {
    let store = SqliteStore::open_in_memory().unwrap();
    Arc::new(SyncEngine::new(Arc::new(store)).unwrap())
}

fn seed_student_with_courses(engine: &SyncEngine, fees: &[i64]) -> (String, Vec<String>) {
    let course_ids: Vec<String> = fees
        .iter()
        .map(|fee| {
            engine
                .create_course(&Course::new("Ballet", "Ito", *fee))
                .unwrap()
        })
        .collect();
    let student_id = engine.create_student(&Student::new("Hana", "Sato")).unwrap();
    engine
        .update_student(
            &student_id,
            StudentPatch {
                class_ids: Some(course_ids.clone()),
                ..StudentPatch::default()
            },
        )
        .unwrap();
    (student_id, course_ids)
}

#[test]
fn monthly_view_has_one_row_per_student_with_defaults() {
    let engine = engine();
    let billing = BillingService::new(Arc::clone(&engine));
    let (with_courses, _) = seed_student_with_courses(&engine, &[8000, 5000]);
    let without_courses = engine.create_student(&Student::new("Mio", "Kato")).unwrap();

    let rows = billing.compute_monthly(2026, 4).unwrap();
    assert_eq!(rows.len(), 2);

    let billed = rows.iter().find(|row| row.student_id == with_courses).unwrap();
    assert_eq!(billed.amount, 13000);
    assert!(!billed.paid);
    assert_eq!(billed.payment_date, None);
    assert_eq!(billed.payment_id, None);
    assert_eq!(billed.student_name, "Sato Hana");

    let unbilled = rows.iter().find(|row| row.student_id == without_courses).unwrap();
    assert_eq!(unbilled.amount, 0);
}

#[test]
fn marking_paid_persists_one_record_with_a_date() {
    let engine = engine();
    let billing = BillingService::new(Arc::clone(&engine));
    let (student_id, _) = seed_student_with_courses(&engine, &[8000, 5000]);

    billing.set_payment_status(&student_id, 2026, 4, true).unwrap();

    let payments = engine.payments();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount, 13000);
    assert!(payments[0].paid);
    assert!(payments[0].payment_date.is_some());

    let rows = billing.compute_monthly(2026, 4).unwrap();
    let row = rows.iter().find(|row| row.student_id == student_id).unwrap();
    assert!(row.paid);
    assert_eq!(row.payment_id.as_deref(), Some(payments[0].id.as_str()));
}

#[test]
fn toggling_paid_updates_the_existing_record_in_place() {
    let engine = engine();
    let billing = BillingService::new(Arc::clone(&engine));
    let (student_id, _) = seed_student_with_courses(&engine, &[8000]);

    billing.set_payment_status(&student_id, 2026, 4, true).unwrap();
    billing.set_payment_status(&student_id, 2026, 4, false).unwrap();
    billing.set_payment_status(&student_id, 2026, 4, true).unwrap();

    // Still exactly one record for the (student, year, month) key.
    let payments = engine.payments();
    assert_eq!(payments.len(), 1);
    assert!(payments[0].paid);

    billing.set_payment_status(&student_id, 2026, 4, false).unwrap();
    let payments = engine.payments();
    assert!(!payments[0].paid);
    assert_eq!(payments[0].payment_date, None);
}

#[test]
fn amount_tracks_the_current_course_assignment() {
    let engine = engine();
    let billing = BillingService::new(Arc::clone(&engine));
    let (student_id, course_ids) = seed_student_with_courses(&engine, &[8000, 5000]);

    billing.set_payment_status(&student_id, 2026, 4, true).unwrap();
    assert_eq!(engine.payments()[0].amount, 13000);

    // Drop the 5000-yen course, then toggle the same month again.
    engine
        .update_student(
            &student_id,
            StudentPatch {
                class_ids: Some(vec![course_ids[0].clone()]),
                ..StudentPatch::default()
            },
        )
        .unwrap();

    let rows = billing.compute_monthly(2026, 4).unwrap();
    assert_eq!(rows[0].amount, 8000);

    billing.set_payment_status(&student_id, 2026, 4, false).unwrap();
    assert_eq!(engine.payments()[0].amount, 8000);
}

#[test]
fn deleting_a_course_lowers_the_next_computed_amount() {
    let engine = engine();
    let billing = BillingService::new(Arc::clone(&engine));
    let cascade = CascadeService::new(Arc::clone(&engine));
    let (student_id, course_ids) = seed_student_with_courses(&engine, &[8000, 5000]);

    let rows = billing.compute_monthly(2026, 4).unwrap();
    assert_eq!(rows[0].amount, 13000);

    cascade.delete_course(&course_ids[1]).unwrap();

    // The cascade stripped the class id, so the view re-derives 8000.
    let rows = billing.compute_monthly(2026, 4).unwrap();
    assert_eq!(rows[0].amount, 8000);
    assert_eq!(rows[0].student_id, student_id);
}

#[test]
fn separate_months_get_separate_records() {
    let engine = engine();
    let billing = BillingService::new(Arc::clone(&engine));
    let (student_id, _) = seed_student_with_courses(&engine, &[8000]);

    billing.set_payment_status(&student_id, 2026, 3, true).unwrap();
    billing.set_payment_status(&student_id, 2026, 4, true).unwrap();
    billing.set_payment_status(&student_id, 2025, 4, true).unwrap();

    assert_eq!(engine.payments().len(), 3);
}

#[test]
fn out_of_range_months_are_rejected() {
    let engine = engine();
    let billing = BillingService::new(Arc::clone(&engine));
    let (student_id, _) = seed_student_with_courses(&engine, &[8000]);

    assert!(matches!(
        billing.compute_monthly(2026, 0).unwrap_err(),
        BillingError::InvalidMonth(0)
    ));
    assert!(matches!(
        billing.set_payment_status(&student_id, 2026, 13, true).unwrap_err(),
        BillingError::InvalidMonth(13)
    ));

    let err = billing.set_payment_status("missing", 2026, 4, true).unwrap_err();
    assert!(matches!(err, BillingError::StudentNotFound(_)));
}
