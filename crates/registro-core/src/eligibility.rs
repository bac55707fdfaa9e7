//! Enrollment eligibility.
//!
//! Only a course's *direct* prerequisites are checked. Each course's
//! `requires` set is taken to already list every course the institution
//! wants completed first; the closure is never computed here.

use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::CatalogStore,
  course::Course,
  error::{Conflict, Entity},
  student::Student,
};

/// Proof that a student may enroll in a course. Only
/// [`validate_enrollment`] constructs one, and
/// [`crate::lifecycle::enroll`] consumes it.
#[derive(Debug, Clone)]
pub struct Eligible {
  student: Student,
  course:  Course,
}

impl Eligible {
  pub(crate) fn into_parts(self) -> (Student, Course) {
    (self.student, self.course)
  }
}

pub fn validate_enrollment(
  store: &impl CatalogStore,
  student_id: Uuid,
  course_id: Uuid,
) -> Result<Eligible> {
  let student = store
    .find_student_by_id(student_id)?
    .ok_or(Error::NotFound(Entity::Student, student_id))?;
  let course = store
    .find_course_by_id(course_id)?
    .ok_or(Error::NotFound(Entity::Course, course_id))?;

  if store.exists_enrollment(student_id, course_id)? {
    warn!(%student_id, %course_id, "student already enrolled");
    return Err(Conflict::AlreadyEnrolled { student_id, course_id }.into());
  }

  if !course.requires.is_empty() {
    let active: HashSet<Uuid> = store
      .find_enrollments_by_student(student_id)?
      .into_iter()
      .filter(|e| e.is_active())
      .map(|e| e.course_id)
      .collect();

    let missing: Vec<Uuid> = course
      .requires
      .iter()
      .copied()
      .filter(|p| !active.contains(p))
      .collect();

    if !missing.is_empty() {
      warn!(%student_id, %course_id, ?missing, "prerequisites not met");
      return Err(Conflict::PrerequisitesNotMet { course_id, missing }.into());
    }
  }

  Ok(Eligible { student, course })
}
