//! The `Registry` trait, the service surface of the enrollment engine.
//!
//! Implemented by storage backends (e.g. `registro-store-sqlite`), which run
//! each write as one transaction over the engine functions in
//! [`crate::graph`] and [`crate::lifecycle`]. Callers depend on this
//! abstraction, not on a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  course::{Course, CourseUpdate, NewCourse},
  enrollment::{Enrollment, EnrollmentPatch, NewEnrollment},
  student::{NewStudent, Student},
};

/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait Registry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Courses ───────────────────────────────────────────────────────────

  /// Create a course, optionally with an initial prerequisite set.
  fn create_course(
    &self,
    input: NewCourse,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  /// Replace a course's fields and, if given, its prerequisite set.
  fn update_course(
    &self,
    id: Uuid,
    update: CourseUpdate,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  /// Delete a course that nothing requires and nobody is enrolled in.
  fn delete_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `None` if not found.
  fn get_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn get_course_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + 'a;

  fn list_courses(
    &self,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  /// Record `course requires prerequisite`, rejecting self-loops and cycles.
  fn add_prerequisite(
    &self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn remove_prerequisite(
    &self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────

  fn register_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn list_students(
    &self,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  /// Mark a student inactive, stamping who did it and why.
  fn deactivate_student(
    &self,
    id: Uuid,
    actor: String,
    reason: Option<String>,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  // ── Enrollments ───────────────────────────────────────────────────────

  /// Validate eligibility and create an active enrollment, reactivating the
  /// student if needed.
  fn create_enrollment(
    &self,
    input: NewEnrollment,
    actor: String,
  ) -> impl Future<Output = Result<Enrollment, Self::Error>> + Send + '_;

  fn update_enrollment(
    &self,
    id: Uuid,
    patch: EnrollmentPatch,
  ) -> impl Future<Output = Result<Enrollment, Self::Error>> + Send + '_;

  fn withdraw_enrollment(
    &self,
    id: Uuid,
    actor: String,
  ) -> impl Future<Output = Result<Enrollment, Self::Error>> + Send + '_;

  fn get_enrollment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Enrollment>, Self::Error>> + Send + '_;

  fn list_enrollments_by_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Enrollment>, Self::Error>> + Send + '_;

  fn list_enrollments(
    &self,
  ) -> impl Future<Output = Result<Vec<Enrollment>, Self::Error>> + Send + '_;
}
