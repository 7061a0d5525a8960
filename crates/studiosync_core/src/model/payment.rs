//! Payment record domain model.
//!
//! # Invariants
//! - At most one record exists per (student, year, month); billing upserts
//!   against that key.
//! - `payment_date` is present exactly when `paid` is true.

use crate::model::student::StudentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable document id for a payment record.
pub type PaymentRecordId = String;

/// Persisted payment-status half of the monthly billing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: PaymentRecordId,
    pub student_id: StudentId,
    pub year: i32,
    /// 1-based calendar month.
    pub month: u32,
    /// Fee total captured when the status was last toggled; recomputed from
    /// the student's course assignment at that moment.
    pub amount: i64,
    pub paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
}

impl PaymentRecord {
    /// Creates a record with a generated stable id.
    pub fn new(
        student_id: impl Into<StudentId>,
        year: i32,
        month: u32,
        amount: i64,
        paid: bool,
        payment_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.into(),
            year,
            month,
            amount,
            paid,
            payment_date,
        }
    }

    /// Returns true when this record covers the given billing key.
    pub fn matches(&self, student_id: &str, year: i32, month: u32) -> bool {
        self.student_id == student_id && self.year == year && self.month == month
    }
}
