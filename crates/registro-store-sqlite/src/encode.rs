//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, UUIDs
//! are hyphenated lowercase strings. Status markers are written lowercase
//! and read case-insensitively.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use registro_core::{
  course::Course,
  enrollment::{Enrollment, EnrollmentStatus},
  student::{Student, StudentStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Status markers ──────────────────────────────────────────────────────────

pub fn decode_enrollment_status(s: &str) -> Result<EnrollmentStatus> {
  s.trim()
    .parse()
    .map_err(|_| Error::UnknownStatus(s.to_owned()))
}

pub fn decode_student_status(s: &str) -> Result<StudentStatus> {
  s.trim()
    .parse()
    .map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `courses` row.
pub struct RawCourse {
  pub course_id: String,
  pub code:      String,
  pub name:      String,
  pub credits:   i64,
}

impl RawCourse {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      course_id: row.get(0)?,
      code:      row.get(1)?,
      name:      row.get(2)?,
      credits:   row.get(3)?,
    })
  }

  /// Attach the edge sets, read separately from `course_prerequisites`.
  pub fn into_course(
    self,
    requires: BTreeSet<Uuid>,
    required_by: BTreeSet<Uuid>,
  ) -> Result<Course> {
    let credits = u32::try_from(self.credits)
      .map_err(|_| Error::CreditsOutOfRange(self.credits))?;
    Ok(Course {
      course_id: decode_uuid(&self.course_id)?,
      code: self.code,
      name: self.name,
      credits,
      requires,
      required_by,
    })
  }
}

/// Raw values read directly from a `students` row.
pub struct RawStudent {
  pub student_id:          String,
  pub name:                String,
  pub status:              String,
  pub created_at:          String,
  pub modified_by:         Option<String>,
  pub modified_at:         Option<String>,
  pub deactivated_by:      Option<String>,
  pub deactivated_at:      Option<String>,
  pub deactivation_reason: Option<String>,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:          row.get(0)?,
      name:                row.get(1)?,
      status:              row.get(2)?,
      created_at:          row.get(3)?,
      modified_by:         row.get(4)?,
      modified_at:         row.get(5)?,
      deactivated_by:      row.get(6)?,
      deactivated_at:      row.get(7)?,
      deactivation_reason: row.get(8)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:          decode_uuid(&self.student_id)?,
      name:                self.name,
      status:              decode_student_status(&self.status)?,
      created_at:          decode_dt(&self.created_at)?,
      modified_by:         self.modified_by,
      modified_at:         decode_opt_dt(self.modified_at)?,
      deactivated_by:      self.deactivated_by,
      deactivated_at:      decode_opt_dt(self.deactivated_at)?,
      deactivation_reason: self.deactivation_reason,
    })
  }
}

/// Raw values read directly from an `enrollments` row.
pub struct RawEnrollment {
  pub enrollment_id:   String,
  pub student_id:      String,
  pub course_id:       String,
  pub enrollment_date: String,
  pub status:          String,
  pub created_by:      String,
  pub created_at:      String,
  pub cancelled_by:    Option<String>,
  pub cancelled_at:    Option<String>,
}

impl RawEnrollment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      enrollment_id:   row.get(0)?,
      student_id:      row.get(1)?,
      course_id:       row.get(2)?,
      enrollment_date: row.get(3)?,
      status:          row.get(4)?,
      created_by:      row.get(5)?,
      created_at:      row.get(6)?,
      cancelled_by:    row.get(7)?,
      cancelled_at:    row.get(8)?,
    })
  }

  pub fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      enrollment_id:   decode_uuid(&self.enrollment_id)?,
      student_id:      decode_uuid(&self.student_id)?,
      course_id:       decode_uuid(&self.course_id)?,
      enrollment_date: decode_date(&self.enrollment_date)?,
      status:          decode_enrollment_status(&self.status)?,
      created_by:      self.created_by,
      created_at:      decode_dt(&self.created_at)?,
      cancelled_by:    self.cancelled_by,
      cancelled_at:    decode_opt_dt(self.cancelled_at)?,
    })
  }
}
