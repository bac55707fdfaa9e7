//! [`CachedRegistry`]: a read-through course cache over any [`Registry`].
//!
//! Course reads are served from memory once loaded. Every course write
//! (including prerequisite edits, which also change the inverse edge sets of
//! other courses) drops the whole cache. Student and enrollment calls pass
//! straight through.

use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock, RwLockReadGuard},
};

use tracing::trace;
use uuid::Uuid;

use crate::{
  course::{Course, CourseUpdate, NewCourse},
  enrollment::{Enrollment, EnrollmentPatch, NewEnrollment},
  registry::Registry,
  student::{NewStudent, Student},
};

#[derive(Debug, Default)]
struct CourseCache {
  by_id:      HashMap<Uuid, Course>,
  all:        Option<Vec<Course>>,
  /// Bumped on every invalidation. A read that started under an older
  /// generation must not fill the cache.
  generation: u64,
}

pub struct CachedRegistry<R> {
  inner:   R,
  courses: RwLock<CourseCache>,
}

impl<R: Registry> CachedRegistry<R> {
  pub fn new(inner: R) -> Self {
    Self { inner, courses: RwLock::new(CourseCache::default()) }
  }

  /// Number of individually cached courses.
  pub fn cached_courses(&self) -> usize {
    self.courses.read().unwrap_or_else(PoisonError::into_inner).by_id.len()
  }

  /// Drop every cached course read.
  pub fn invalidate(&self) {
    trace!("invalidating course cache");
    let mut cache = self.courses.write().unwrap_or_else(PoisonError::into_inner);
    cache.by_id.clear();
    cache.all = None;
    cache.generation += 1;
  }

  fn read_cache(&self) -> RwLockReadGuard<'_, CourseCache> {
    self.courses.read().unwrap_or_else(PoisonError::into_inner)
  }

  /// Store what a read returned, unless a write invalidated the cache
  /// while that read was in flight.
  fn fill(&self, generation: u64, f: impl FnOnce(&mut CourseCache)) {
    let mut cache = self.courses.write().unwrap_or_else(PoisonError::into_inner);
    if cache.generation == generation {
      f(&mut cache);
    } else {
      trace!("discarding course read that raced a write");
    }
  }
}

impl<R: Registry> Registry for CachedRegistry<R> {
  type Error = R::Error;

  async fn create_course(&self, input: NewCourse) -> Result<Course, R::Error> {
    let out = self.inner.create_course(input).await;
    self.invalidate();
    out
  }

  async fn update_course(
    &self,
    id: Uuid,
    update: CourseUpdate,
  ) -> Result<Course, R::Error> {
    let out = self.inner.update_course(id, update).await;
    self.invalidate();
    out
  }

  async fn delete_course(&self, id: Uuid) -> Result<(), R::Error> {
    let out = self.inner.delete_course(id).await;
    self.invalidate();
    out
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>, R::Error> {
    let generation = {
      let cache = self.read_cache();
      if let Some(hit) = cache.by_id.get(&id) {
        return Ok(Some(hit.clone()));
      }
      cache.generation
    };

    let course = self.inner.get_course(id).await?;
    if let Some(c) = &course {
      self.fill(generation, |cache| {
        cache.by_id.insert(c.course_id, c.clone());
      });
    }
    Ok(course)
  }

  async fn get_course_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> Result<Option<Course>, R::Error> {
    let generation = {
      let cache = self.read_cache();
      if let Some(hit) = cache.by_id.values().find(|c| c.code == code) {
        return Ok(Some(hit.clone()));
      }
      cache.generation
    };

    let course = self.inner.get_course_by_code(code).await?;
    if let Some(c) = &course {
      self.fill(generation, |cache| {
        cache.by_id.insert(c.course_id, c.clone());
      });
    }
    Ok(course)
  }

  async fn list_courses(&self) -> Result<Vec<Course>, R::Error> {
    let generation = {
      let cache = self.read_cache();
      if let Some(all) = &cache.all {
        return Ok(all.clone());
      }
      cache.generation
    };

    let all = self.inner.list_courses().await?;
    self.fill(generation, |cache| {
      cache.by_id.extend(all.iter().map(|c| (c.course_id, c.clone())));
      cache.all = Some(all.clone());
    });
    Ok(all)
  }

  async fn add_prerequisite(
    &self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<Course, R::Error> {
    let out = self.inner.add_prerequisite(course_id, prerequisite_id).await;
    self.invalidate();
    out
  }

  async fn remove_prerequisite(
    &self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<Course, R::Error> {
    let out = self.inner.remove_prerequisite(course_id, prerequisite_id).await;
    self.invalidate();
    out
  }

  async fn register_student(&self, input: NewStudent) -> Result<Student, R::Error> {
    self.inner.register_student(input).await
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>, R::Error> {
    self.inner.get_student(id).await
  }

  async fn list_students(&self) -> Result<Vec<Student>, R::Error> {
    self.inner.list_students().await
  }

  async fn deactivate_student(
    &self,
    id: Uuid,
    actor: String,
    reason: Option<String>,
  ) -> Result<Student, R::Error> {
    self.inner.deactivate_student(id, actor, reason).await
  }

  async fn create_enrollment(
    &self,
    input: NewEnrollment,
    actor: String,
  ) -> Result<Enrollment, R::Error> {
    self.inner.create_enrollment(input, actor).await
  }

  async fn update_enrollment(
    &self,
    id: Uuid,
    patch: EnrollmentPatch,
  ) -> Result<Enrollment, R::Error> {
    self.inner.update_enrollment(id, patch).await
  }

  async fn withdraw_enrollment(
    &self,
    id: Uuid,
    actor: String,
  ) -> Result<Enrollment, R::Error> {
    self.inner.withdraw_enrollment(id, actor).await
  }

  async fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, R::Error> {
    self.inner.get_enrollment(id).await
  }

  async fn list_enrollments_by_student(
    &self,
    student_id: Uuid,
  ) -> Result<Vec<Enrollment>, R::Error> {
    self.inner.list_enrollments_by_student(student_id).await
  }

  async fn list_enrollments(&self) -> Result<Vec<Enrollment>, R::Error> {
    self.inner.list_enrollments().await
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  };

  use tokio::sync::Notify;

  use super::*;
  use crate::{Error, memory::MemoryRegistry};

  /// Lets a test hold one `get_course` between the inner read and its
  /// return to the cache.
  #[derive(Default)]
  struct Gate {
    armed:     AtomicBool,
    read_done: Notify,
    resume:    Notify,
  }

  #[derive(Default)]
  struct GatedRegistry {
    inner: MemoryRegistry,
    gate:  Arc<Gate>,
  }

  impl Registry for GatedRegistry {
    type Error = Error;

    async fn create_course(&self, input: NewCourse) -> Result<Course, Error> {
      self.inner.create_course(input).await
    }

    async fn update_course(
      &self,
      id: Uuid,
      update: CourseUpdate,
    ) -> Result<Course, Error> {
      self.inner.update_course(id, update).await
    }

    async fn delete_course(&self, id: Uuid) -> Result<(), Error> {
      self.inner.delete_course(id).await
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, Error> {
      let out = self.inner.get_course(id).await;
      if self.gate.armed.swap(false, Ordering::SeqCst) {
        self.gate.read_done.notify_one();
        self.gate.resume.notified().await;
      }
      out
    }

    async fn get_course_by_code<'a>(
      &'a self,
      code: &'a str,
    ) -> Result<Option<Course>, Error> {
      self.inner.get_course_by_code(code).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>, Error> {
      self.inner.list_courses().await
    }

    async fn add_prerequisite(
      &self,
      course_id: Uuid,
      prerequisite_id: Uuid,
    ) -> Result<Course, Error> {
      self.inner.add_prerequisite(course_id, prerequisite_id).await
    }

    async fn remove_prerequisite(
      &self,
      course_id: Uuid,
      prerequisite_id: Uuid,
    ) -> Result<Course, Error> {
      self.inner.remove_prerequisite(course_id, prerequisite_id).await
    }

    async fn register_student(&self, input: NewStudent) -> Result<Student, Error> {
      self.inner.register_student(input).await
    }

    async fn get_student(&self, id: Uuid) -> Result<Option<Student>, Error> {
      self.inner.get_student(id).await
    }

    async fn list_students(&self) -> Result<Vec<Student>, Error> {
      self.inner.list_students().await
    }

    async fn deactivate_student(
      &self,
      id: Uuid,
      actor: String,
      reason: Option<String>,
    ) -> Result<Student, Error> {
      self.inner.deactivate_student(id, actor, reason).await
    }

    async fn create_enrollment(
      &self,
      input: NewEnrollment,
      actor: String,
    ) -> Result<Enrollment, Error> {
      self.inner.create_enrollment(input, actor).await
    }

    async fn update_enrollment(
      &self,
      id: Uuid,
      patch: EnrollmentPatch,
    ) -> Result<Enrollment, Error> {
      self.inner.update_enrollment(id, patch).await
    }

    async fn withdraw_enrollment(
      &self,
      id: Uuid,
      actor: String,
    ) -> Result<Enrollment, Error> {
      self.inner.withdraw_enrollment(id, actor).await
    }

    async fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, Error> {
      self.inner.get_enrollment(id).await
    }

    async fn list_enrollments_by_student(
      &self,
      student_id: Uuid,
    ) -> Result<Vec<Enrollment>, Error> {
      self.inner.list_enrollments_by_student(student_id).await
    }

    async fn list_enrollments(&self) -> Result<Vec<Enrollment>, Error> {
      self.inner.list_enrollments().await
    }
  }

  fn new_course(code: &str) -> NewCourse {
    NewCourse {
      code:          code.into(),
      name:          format!("Course {code}"),
      credits:       3,
      prerequisites: BTreeSet::new(),
    }
  }

  #[tokio::test]
  async fn reads_are_cached_until_a_course_write() {
    let reg = CachedRegistry::new(MemoryRegistry::new());
    let a = reg.create_course(new_course("AAA")).await.unwrap();
    assert_eq!(reg.cached_courses(), 0);

    reg.get_course(a.course_id).await.unwrap().unwrap();
    assert_eq!(reg.cached_courses(), 1);

    reg
      .update_course(a.course_id, CourseUpdate {
        code:          "AAA".into(),
        name:          "Renamed".into(),
        credits:       5,
        prerequisites: None,
      })
      .await
      .unwrap();
    assert_eq!(reg.cached_courses(), 0);

    let fresh = reg.get_course(a.course_id).await.unwrap().unwrap();
    assert_eq!(fresh.name, "Renamed");
    assert_eq!(fresh.credits, 5);
  }

  #[tokio::test]
  async fn edge_edit_refreshes_inverse_side() {
    let reg = CachedRegistry::new(MemoryRegistry::new());
    let a = reg.create_course(new_course("AAA")).await.unwrap();
    let b = reg.create_course(new_course("BBB")).await.unwrap();

    assert_eq!(reg.list_courses().await.unwrap().len(), 2);
    assert_eq!(reg.cached_courses(), 2);

    reg.add_prerequisite(b.course_id, a.course_id).await.unwrap();
    let a = reg.get_course_by_code("AAA").await.unwrap().unwrap();
    assert!(a.required_by.contains(&b.course_id));
  }

  #[tokio::test]
  async fn delete_is_not_served_from_cache() {
    let reg = CachedRegistry::new(MemoryRegistry::new());
    let a = reg.create_course(new_course("AAA")).await.unwrap();
    reg.get_course(a.course_id).await.unwrap();

    reg.delete_course(a.course_id).await.unwrap();
    assert!(reg.get_course(a.course_id).await.unwrap().is_none());
    assert!(reg.list_courses().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn read_racing_a_write_is_not_cached() {
    let inner = GatedRegistry::default();
    let gate = Arc::clone(&inner.gate);
    let reg = Arc::new(CachedRegistry::new(inner));
    let id = reg.create_course(new_course("AAA")).await.unwrap().course_id;

    gate.armed.store(true, Ordering::SeqCst);
    let reader = tokio::spawn({
      let reg = Arc::clone(&reg);
      async move { reg.get_course(id).await }
    });
    gate.read_done.notified().await;

    reg
      .update_course(id, CourseUpdate {
        code:          "AAA".into(),
        name:          "Renamed".into(),
        credits:       3,
        prerequisites: None,
      })
      .await
      .unwrap();
    gate.resume.notify_one();

    let raced = reader.await.unwrap().unwrap().unwrap();
    assert_eq!(raced.name, "Course AAA");
    assert_eq!(reg.cached_courses(), 0);

    let after = reg.get_course(id).await.unwrap().unwrap();
    assert_eq!(after.name, "Renamed");
  }

  #[tokio::test]
  async fn lookup_by_id_and_code_share_entries() {
    let reg = CachedRegistry::new(MemoryRegistry::new());
    let a = reg.create_course(new_course("AAA")).await.unwrap();

    reg.get_course(a.course_id).await.unwrap().unwrap();
    let by_code = reg.get_course_by_code("AAA").await.unwrap().unwrap();
    assert_eq!(by_code.course_id, a.course_id);
    assert_eq!(reg.cached_courses(), 1);
  }
}
