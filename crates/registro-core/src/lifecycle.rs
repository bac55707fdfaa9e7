//! Enrollment lifecycle: creation after validation, partial updates, and
//! withdrawal.
//!
//! Enrollments are never deleted. Withdrawal is a status change to
//! [`EnrollmentStatus::Cancelled`] with the cancelling actor stamped on the
//! record.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::CatalogStore,
  eligibility::{Eligible, validate_enrollment},
  enrollment::{Enrollment, EnrollmentPatch, EnrollmentStatus, NewEnrollment},
  error::Entity,
};

/// Validate and create an enrollment on behalf of `actor`.
pub fn create_enrollment(
  store: &mut impl CatalogStore,
  request: NewEnrollment,
  actor: &str,
) -> Result<Enrollment> {
  let (Some(student_id), Some(course_id)) = (request.student_id, request.course_id)
  else {
    return Err(Error::Validation(
      "student_id and course_id are required".into(),
    ));
  };

  let eligible = validate_enrollment(&*store, student_id, course_id)?;
  enroll(store, eligible, actor)
}

/// Apply an accepted decision.
///
/// An inactive student is reactivated first; the enrollment is then written
/// as active. Both writes land in the caller's transaction.
pub fn enroll(
  store: &mut impl CatalogStore,
  eligible: Eligible,
  actor: &str,
) -> Result<Enrollment> {
  let (mut student, course) = eligible.into_parts();
  let now = Utc::now();

  if !student.is_active() {
    info!(student_id = %student.student_id, "reactivating student on enrollment");
    student.reactivate(actor, now);
    store.save_student(&student)?;
  }

  let enrollment = Enrollment {
    enrollment_id:   Uuid::new_v4(),
    student_id:      student.student_id,
    course_id:       course.course_id,
    enrollment_date: now.date_naive(),
    status:          EnrollmentStatus::Active,
    created_by:      actor.to_owned(),
    created_at:      now,
    cancelled_by:    None,
    cancelled_at:    None,
  };
  store.save_enrollment(&enrollment)?;
  info!(
    enrollment_id = %enrollment.enrollment_id,
    student_id = %enrollment.student_id,
    course_id = %enrollment.course_id,
    "enrollment created"
  );
  Ok(enrollment)
}

pub fn get_enrollment(store: &impl CatalogStore, id: Uuid) -> Result<Enrollment> {
  store
    .find_enrollment_by_id(id)?
    .ok_or(Error::NotFound(Entity::Enrollment, id))
}

pub fn update_enrollment(
  store: &mut impl CatalogStore,
  id: Uuid,
  patch: EnrollmentPatch,
) -> Result<Enrollment> {
  let mut enrollment = get_enrollment(&*store, id)?;
  patch.apply(&mut enrollment);
  store.save_enrollment(&enrollment)?;
  info!(enrollment_id = %id, status = %enrollment.status, "enrollment updated");
  Ok(enrollment)
}

/// Cancel an enrollment. Calling this on an already-cancelled enrollment
/// re-stamps the cancellation actor and time.
pub fn withdraw(
  store: &mut impl CatalogStore,
  id: Uuid,
  actor: &str,
) -> Result<Enrollment> {
  update_enrollment(store, id, EnrollmentPatch {
    status:       Some(EnrollmentStatus::Cancelled),
    cancelled_by: Some(actor.to_owned()),
    cancelled_at: Some(Utc::now()),
  })
}

pub fn list_by_student(
  store: &impl CatalogStore,
  student_id: Uuid,
) -> Result<Vec<Enrollment>> {
  store.find_enrollments_by_student(student_id)
}

pub fn list_all(store: &impl CatalogStore) -> Result<Vec<Enrollment>> {
  store.find_all_enrollments()
}
