//! [`MemoryCatalog`] — an in-process [`CatalogStore`].
//!
//! Useful for tests and for embedding the engine without a database. Writes
//! are made atomic by [`MemoryCatalog::transact`], which works on a copy of
//! the catalog and only keeps it when the closure succeeds.
//! [`MemoryRegistry`] puts a catalog behind a mutex and implements
//! [`Registry`] over it.

use std::{
  collections::{BTreeSet, HashMap},
  sync::{Mutex, PoisonError},
};

use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::CatalogStore,
  course::{Course, CourseUpdate, NewCourse},
  enrollment::{Enrollment, EnrollmentPatch, NewEnrollment},
  error::Entity,
  graph, lifecycle,
  registry::Registry,
  student::{self, NewStudent, Student},
};

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
  courses:     HashMap<Uuid, Course>,
  enrollments: HashMap<Uuid, Enrollment>,
  students:    HashMap<Uuid, Student>,
}

impl MemoryCatalog {
  pub fn new() -> Self { Self::default() }

  /// Run `f` as one all-or-nothing unit.
  pub fn transact<T>(
    &mut self,
    f: impl FnOnce(&mut Self) -> Result<T>,
  ) -> Result<T> {
    let mut working = self.clone();
    let out = f(&mut working)?;
    *self = working;
    Ok(out)
  }

  fn course_mut(&mut self, id: Uuid) -> Result<&mut Course> {
    self
      .courses
      .get_mut(&id)
      .ok_or(Error::NotFound(Entity::Course, id))
  }
}

impl CatalogStore for MemoryCatalog {
  fn find_course_by_id(&self, id: Uuid) -> Result<Option<Course>> {
    Ok(self.courses.get(&id).cloned())
  }

  fn find_course_by_code(&self, code: &str) -> Result<Option<Course>> {
    Ok(self.courses.values().find(|c| c.code == code).cloned())
  }

  fn list_courses(&self) -> Result<Vec<Course>> {
    let mut courses: Vec<Course> = self.courses.values().cloned().collect();
    courses.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(courses)
  }

  fn prerequisite_edges(&self) -> Result<Vec<(Uuid, Uuid)>> {
    Ok(
      self
        .courses
        .values()
        .flat_map(|c| c.requires.iter().map(|p| (c.course_id, *p)))
        .collect(),
    )
  }

  fn save_course(&mut self, course: &Course) -> Result<()> {
    match self.courses.get_mut(&course.course_id) {
      Some(existing) => {
        existing.code = course.code.clone();
        existing.name = course.name.clone();
        existing.credits = course.credits;
      }
      None => {
        let fresh = Course::new(
          course.course_id,
          course.code.clone(),
          course.name.clone(),
          course.credits,
        );
        self.courses.insert(course.course_id, fresh);
      }
    }
    Ok(())
  }

  fn add_prerequisite(
    &mut self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<()> {
    // Both ends must exist before either side is touched.
    self.course_mut(prerequisite_id)?;
    self.course_mut(course_id)?.requires.insert(prerequisite_id);
    self.course_mut(prerequisite_id)?.required_by.insert(course_id);
    Ok(())
  }

  fn remove_prerequisite(
    &mut self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<()> {
    if let Some(c) = self.courses.get_mut(&course_id) {
      c.requires.remove(&prerequisite_id);
    }
    if let Some(p) = self.courses.get_mut(&prerequisite_id) {
      p.required_by.remove(&course_id);
    }
    Ok(())
  }

  fn replace_prerequisites(
    &mut self,
    course_id: Uuid,
    prerequisites: &BTreeSet<Uuid>,
  ) -> Result<()> {
    let current = self.course_mut(course_id)?.requires.clone();
    for old in current.difference(prerequisites) {
      self.remove_prerequisite(course_id, *old)?;
    }
    for new in prerequisites.difference(&current) {
      self.add_prerequisite(course_id, *new)?;
    }
    Ok(())
  }

  fn delete_course_by_id(&mut self, id: Uuid) -> Result<()> {
    let Some(course) = self.courses.remove(&id) else {
      return Ok(());
    };
    for p in &course.requires {
      if let Some(prereq) = self.courses.get_mut(p) {
        prereq.required_by.remove(&id);
      }
    }
    for d in &course.required_by {
      if let Some(dependent) = self.courses.get_mut(d) {
        dependent.requires.remove(&id);
      }
    }
    Ok(())
  }

  fn course_has_enrollments(&self, course_id: Uuid) -> Result<bool> {
    Ok(self.enrollments.values().any(|e| e.course_id == course_id))
  }

  fn find_enrollment(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Option<Enrollment>> {
    Ok(
      self
        .enrollments
        .values()
        .find(|e| e.student_id == student_id && e.course_id == course_id)
        .cloned(),
    )
  }

  fn find_enrollment_by_id(&self, id: Uuid) -> Result<Option<Enrollment>> {
    Ok(self.enrollments.get(&id).cloned())
  }

  fn find_enrollments_by_student(
    &self,
    student_id: Uuid,
  ) -> Result<Vec<Enrollment>> {
    let mut found: Vec<Enrollment> = self
      .enrollments
      .values()
      .filter(|e| e.student_id == student_id)
      .cloned()
      .collect();
    found.sort_by_key(|e| e.created_at);
    Ok(found)
  }

  fn find_all_enrollments(&self) -> Result<Vec<Enrollment>> {
    let mut all: Vec<Enrollment> = self.enrollments.values().cloned().collect();
    all.sort_by_key(|e| e.created_at);
    Ok(all)
  }

  fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<()> {
    self
      .enrollments
      .insert(enrollment.enrollment_id, enrollment.clone());
    Ok(())
  }

  fn find_student_by_id(&self, id: Uuid) -> Result<Option<Student>> {
    Ok(self.students.get(&id).cloned())
  }

  fn list_students(&self) -> Result<Vec<Student>> {
    let mut all: Vec<Student> = self.students.values().cloned().collect();
    all.sort_by_key(|s| s.created_at);
    Ok(all)
  }

  fn save_student(&mut self, student: &Student) -> Result<()> {
    self.students.insert(student.student_id, student.clone());
    Ok(())
  }
}

// ─── Registry over a catalog ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryRegistry {
  catalog: Mutex<MemoryCatalog>,
}

impl MemoryRegistry {
  pub fn new() -> Self { Self::default() }

  fn transact<T>(
    &self,
    f: impl FnOnce(&mut MemoryCatalog) -> Result<T>,
  ) -> Result<T> {
    self
      .catalog
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .transact(f)
  }

  fn read<T>(&self, f: impl FnOnce(&MemoryCatalog) -> Result<T>) -> Result<T> {
    f(&self.catalog.lock().unwrap_or_else(PoisonError::into_inner))
  }
}

impl Registry for MemoryRegistry {
  type Error = Error;

  async fn create_course(&self, input: NewCourse) -> Result<Course> {
    self.transact(|c| graph::create_course(c, input))
  }

  async fn update_course(&self, id: Uuid, update: CourseUpdate) -> Result<Course> {
    self.transact(|c| graph::update_course(c, id, update))
  }

  async fn delete_course(&self, id: Uuid) -> Result<()> {
    self.transact(|c| graph::delete_course(c, id))
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
    self.read(|c| c.find_course_by_id(id))
  }

  async fn get_course_by_code<'a>(&'a self, code: &'a str) -> Result<Option<Course>> {
    self.read(|c| c.find_course_by_code(code))
  }

  async fn list_courses(&self) -> Result<Vec<Course>> {
    self.read(|c| c.list_courses())
  }

  async fn add_prerequisite(
    &self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<Course> {
    self.transact(|c| graph::add_prerequisite_edge(c, course_id, prerequisite_id))
  }

  async fn remove_prerequisite(
    &self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<Course> {
    self.transact(|c| {
      graph::remove_prerequisite_edge(c, course_id, prerequisite_id)
    })
  }

  async fn register_student(&self, input: NewStudent) -> Result<Student> {
    self.transact(|c| student::register_student(c, input))
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    self.read(|c| c.find_student_by_id(id))
  }

  async fn list_students(&self) -> Result<Vec<Student>> {
    self.read(|c| c.list_students())
  }

  async fn deactivate_student(
    &self,
    id: Uuid,
    actor: String,
    reason: Option<String>,
  ) -> Result<Student> {
    self.transact(|c| student::deactivate_student(c, id, &actor, reason))
  }

  async fn create_enrollment(
    &self,
    input: NewEnrollment,
    actor: String,
  ) -> Result<Enrollment> {
    self.transact(|c| lifecycle::create_enrollment(c, input, &actor))
  }

  async fn update_enrollment(
    &self,
    id: Uuid,
    patch: EnrollmentPatch,
  ) -> Result<Enrollment> {
    self.transact(|c| lifecycle::update_enrollment(c, id, patch))
  }

  async fn withdraw_enrollment(&self, id: Uuid, actor: String) -> Result<Enrollment> {
    self.transact(|c| lifecycle::withdraw(c, id, &actor))
  }

  async fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>> {
    self.read(|c| c.find_enrollment_by_id(id))
  }

  async fn list_enrollments_by_student(
    &self,
    student_id: Uuid,
  ) -> Result<Vec<Enrollment>> {
    self.read(|c| lifecycle::list_by_student(c, student_id))
  }

  async fn list_enrollments(&self) -> Result<Vec<Enrollment>> {
    self.read(|c| lifecycle::list_all(c))
  }
}
