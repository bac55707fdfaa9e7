//! The `CatalogStore` trait: the persistence collaborator the engine talks
//! to.
//!
//! Methods are synchronous because the engine only ever runs inside a
//! transaction that the backend has already opened (see
//! `SqliteStore::transact` and [`crate::memory::MemoryCatalog::transact`]).
//! Every call made while servicing one request belongs to that one
//! transaction.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{Result, course::Course, enrollment::Enrollment, student::Student};

pub trait CatalogStore {
  // ── Courses ───────────────────────────────────────────────────────────

  /// Look up a course, with both edge sets populated.
  fn find_course_by_id(&self, id: Uuid) -> Result<Option<Course>>;

  fn find_course_by_code(&self, code: &str) -> Result<Option<Course>>;

  fn list_courses(&self) -> Result<Vec<Course>>;

  /// Every `(course, prerequisite)` edge in the catalog.
  fn prerequisite_edges(&self) -> Result<Vec<(Uuid, Uuid)>>;

  /// Insert or update the scalar columns of a course. Edge sets on the
  /// argument are ignored.
  fn save_course(&mut self, course: &Course) -> Result<()>;

  /// Record `course requires prerequisite` together with its inverse.
  /// Recording an edge that already exists is a no-op.
  fn add_prerequisite(&mut self, course_id: Uuid, prerequisite_id: Uuid)
  -> Result<()>;

  /// Drop the edge in both directions. Dropping a missing edge is a no-op.
  fn remove_prerequisite(
    &mut self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<()>;

  /// Replace the whole `requires` set of a course, keeping every affected
  /// `required_by` set in step.
  fn replace_prerequisites(
    &mut self,
    course_id: Uuid,
    prerequisites: &BTreeSet<Uuid>,
  ) -> Result<()>;

  /// Remove a course and every edge that mentions it.
  fn delete_course_by_id(&mut self, id: Uuid) -> Result<()>;

  fn course_has_enrollments(&self, course_id: Uuid) -> Result<bool>;

  // ── Enrollments ───────────────────────────────────────────────────────

  fn find_enrollment(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Option<Enrollment>>;

  fn find_enrollment_by_id(&self, id: Uuid) -> Result<Option<Enrollment>>;

  fn exists_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<bool> {
    Ok(self.find_enrollment(student_id, course_id)?.is_some())
  }

  fn find_enrollments_by_student(&self, student_id: Uuid)
  -> Result<Vec<Enrollment>>;

  fn find_all_enrollments(&self) -> Result<Vec<Enrollment>>;

  /// Insert or update an enrollment by `enrollment_id`.
  fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<()>;

  // ── Students ──────────────────────────────────────────────────────────

  fn find_student_by_id(&self, id: Uuid) -> Result<Option<Student>>;

  fn list_students(&self) -> Result<Vec<Student>>;

  /// Insert or update a student by `student_id`.
  fn save_student(&mut self, student: &Student) -> Result<()>;
}
