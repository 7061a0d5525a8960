//! Course domain model.

use crate::model::student::{json_value, push_set_string};
use crate::store::FieldEdit;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable document id for a course.
pub type CourseId = String;

/// Weekday a recurring course meets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Recurring class offering in the `courses` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub instructor: String,
    pub day_of_week: DayOfWeek,
    /// Start time as "HH:MM", kept as free text like the rest of the
    /// schedule details.
    pub time: String,
    pub location: String,
    pub capacity: u32,
    pub level: String,
    /// Fee in yen charged per billed month.
    pub monthly_fee: i64,
}

impl Course {
    /// Creates a course with a generated stable id and blank schedule
    /// details.
    pub fn new(
        name: impl Into<String>,
        instructor: impl Into<String>,
        monthly_fee: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            instructor: instructor.into(),
            day_of_week: DayOfWeek::Monday,
            time: String::new(),
            location: String::new(),
            capacity: 0,
            level: String::new(),
            monthly_fee,
        }
    }
}

/// Typed partial update for a course document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub instructor: Option<String>,
    pub day_of_week: Option<DayOfWeek>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub level: Option<String>,
    pub monthly_fee: Option<i64>,
}

impl CoursePatch {
    pub fn into_edits(self) -> Vec<FieldEdit> {
        let mut edits = Vec::new();
        push_set_string(&mut edits, "name", self.name);
        push_set_string(&mut edits, "instructor", self.instructor);
        if let Some(day) = self.day_of_week {
            edits.push(FieldEdit::set("dayOfWeek", json_value(&day)));
        }
        push_set_string(&mut edits, "time", self.time);
        push_set_string(&mut edits, "location", self.location);
        if let Some(capacity) = self.capacity {
            edits.push(FieldEdit::set("capacity", Value::from(capacity)));
        }
        push_set_string(&mut edits, "level", self.level);
        if let Some(fee) = self.monthly_fee {
            edits.push(FieldEdit::set("monthlyFee", Value::from(fee)));
        }
        edits
    }
}
