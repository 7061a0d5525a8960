//! Monthly billing aggregation.
//!
//! # Responsibility
//! - Derive the read-only monthly billing view per student.
//! - Upsert the persisted payment-status half of that view.
//!
//! # Invariants
//! - `amount` always reflects the student's *current* course assignment at
//!   computation time, never a historical snapshot; toggling the status of
//!   a past month therefore re-captures today's fee total.
//! - `payment_date` is set exactly when `paid` flips to true, and cleared
//!   when it flips to false.

use crate::model::course::Course;
use crate::model::payment::{PaymentRecord, PaymentRecordId};
use crate::model::student::{Student, StudentId};
use crate::store::{Collection, FieldEdit, WriteOp};
use crate::sync::{SyncEngine, SyncError};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type BillingResult<T> = Result<T, BillingError>;

/// Errors from billing operations.
#[derive(Debug)]
pub enum BillingError {
    /// Month outside 1..=12.
    InvalidMonth(u32),
    StudentNotFound(StudentId),
    Sync(SyncError),
}

impl Display for BillingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMonth(month) => write!(f, "invalid billing month: {month}"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::Sync(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BillingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sync(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SyncError> for BillingError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

/// One derived billing row; exactly one per student and month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyBillingRow {
    /// Persisted record id, when one exists for the key.
    pub payment_id: Option<PaymentRecordId>,
    pub student_id: StudentId,
    pub student_name: String,
    pub year: i32,
    pub month: u32,
    /// Sum of monthly fees over currently-assigned courses.
    pub amount: i64,
    pub paid: bool,
    pub payment_date: Option<NaiveDate>,
}

/// Derived billing view and payment-status writer.
pub struct BillingService {
    engine: Arc<SyncEngine>,
}

impl BillingService {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Computes the billing view for one month: one row per student.
    ///
    /// Pure read over the materialized sets; rows without a persisted
    /// record default to `paid = false` and an empty payment date.
    pub fn compute_monthly(&self, year: i32, month: u32) -> BillingResult<Vec<MonthlyBillingRow>> {
        validate_month(month)?;
        let courses = self.engine.courses();
        let payments = self.engine.payments();

        let rows = self
            .engine
            .students()
            .into_iter()
            .map(|student| {
                let amount = fee_total(&courses, &student);
                let payment = payments
                    .iter()
                    .find(|record| record.matches(&student.id, year, month));
                MonthlyBillingRow {
                    payment_id: payment.map(|record| record.id.clone()),
                    student_name: student.display_name(),
                    student_id: student.id,
                    year,
                    month,
                    amount,
                    paid: payment.is_some_and(|record| record.paid),
                    payment_date: payment.and_then(|record| record.payment_date),
                }
            })
            .collect();
        Ok(rows)
    }

    /// Upserts the payment record for (student, year, month).
    ///
    /// # Contract
    /// - `amount` is recomputed from the student's current course
    ///   assignment at call time.
    /// - `paid = true` stamps today's date; `paid = false` clears it.
    pub fn set_payment_status(
        &self,
        student_id: &str,
        year: i32,
        month: u32,
        paid: bool,
    ) -> BillingResult<()> {
        validate_month(month)?;
        let student = self
            .engine
            .student(student_id)
            .ok_or_else(|| BillingError::StudentNotFound(student_id.to_string()))?;

        let amount = fee_total(&self.engine.courses(), &student);
        let payment_date = paid.then(|| Local::now().date_naive());

        let existing = self
            .engine
            .payments()
            .into_iter()
            .find(|record| record.matches(student_id, year, month));

        match existing {
            Some(record) => {
                let mut edits = vec![
                    FieldEdit::set("amount", Value::from(amount)),
                    FieldEdit::set("paid", Value::Bool(paid)),
                ];
                match payment_date {
                    Some(date) => edits.push(FieldEdit::set("paymentDate", json!(date))),
                    None => edits.push(FieldEdit::clear("paymentDate")),
                }
                self.engine.commit(vec![WriteOp::Update {
                    collection: Collection::Payments,
                    id: record.id,
                    edits,
                }])?;
            }
            None => {
                self.engine.create_payment_record(&PaymentRecord::new(
                    student_id,
                    year,
                    month,
                    amount,
                    paid,
                    payment_date,
                ))?;
            }
        }
        Ok(())
    }
}

fn validate_month(month: u32) -> BillingResult<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(BillingError::InvalidMonth(month))
    }
}

fn fee_total(courses: &[Course], student: &Student) -> i64 {
    courses
        .iter()
        .filter(|course| student.class_ids.iter().any(|id| *id == course.id))
        .map(|course| course.monthly_fee)
        .sum()
}
