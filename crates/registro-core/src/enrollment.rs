//! Enrollment records.
//!
//! An enrollment is created once per (student, course) pair and is never
//! deleted; withdrawal flips its status to [`EnrollmentStatus::Cancelled`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Parsed case-insensitively, so `"ACTIVE"` and `"active"` are the same
/// marker.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EnrollmentStatus {
  Active,
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
  pub enrollment_id:   Uuid,
  pub student_id:      Uuid,
  pub course_id:       Uuid,
  pub enrollment_date: NaiveDate,
  pub status:          EnrollmentStatus,
  pub created_by:      String,
  pub created_at:      DateTime<Utc>,
  pub cancelled_by:    Option<String>,
  pub cancelled_at:    Option<DateTime<Utc>>,
}

impl Enrollment {
  pub fn is_active(&self) -> bool { self.status == EnrollmentStatus::Active }
}

/// Input to [`crate::registry::Registry::create_enrollment`].
///
/// Both ids are optional on the wire; a request missing either is rejected
/// with a validation error before anything is looked up.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEnrollment {
  pub student_id: Option<Uuid>,
  pub course_id:  Option<Uuid>,
}

impl NewEnrollment {
  pub fn new(student_id: Uuid, course_id: Uuid) -> Self {
    Self { student_id: Some(student_id), course_id: Some(course_id) }
  }
}

/// Partial update for an enrollment. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentPatch {
  pub status:       Option<EnrollmentStatus>,
  pub cancelled_by: Option<String>,
  pub cancelled_at: Option<DateTime<Utc>>,
}

impl EnrollmentPatch {
  pub fn apply(self, enrollment: &mut Enrollment) {
    if let Some(status) = self.status {
      enrollment.status = status;
    }
    if let Some(by) = self.cancelled_by {
      enrollment.cancelled_by = Some(by);
    }
    if let Some(at) = self.cancelled_at {
      enrollment.cancelled_at = Some(at);
    }
  }
}
