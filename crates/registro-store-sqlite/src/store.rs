//! [`SqliteStore`] — the SQLite implementation of [`Registry`].

use std::path::Path;

use registro_core::{
  catalog::CatalogStore,
  course::{Course, CourseUpdate, NewCourse},
  enrollment::{Enrollment, EnrollmentPatch, NewEnrollment},
  graph, lifecycle,
  registry::Registry,
  student::{self, NewStudent, Student},
};
use rusqlite::TransactionBehavior;
use tracing::error;
use uuid::Uuid;

use crate::{Error, Result, catalog::SqliteCatalog, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Registro store backed by a single SQLite file.
///
/// Cloning is cheap, the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one `BEGIN IMMEDIATE` transaction. The transaction is
  /// committed only if `f` succeeds; otherwise it is rolled back on drop.
  async fn transact<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut SqliteCatalog<'_>) -> registro_core::Result<T>
      + Send
      + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&mut SqliteCatalog::new(&tx));
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;
    Ok(outcome?)
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&SqliteCatalog<'_>) -> registro_core::Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| Ok(f(&SqliteCatalog::new(conn))))
      .await?;
    Ok(outcome?)
  }

  /// Listing never surfaces storage detail to the caller.
  async fn read_list<T, F>(&self, what: &'static str, f: F) -> Result<Vec<T>>
  where
    T: Send + 'static,
    F: FnOnce(&SqliteCatalog<'_>) -> registro_core::Result<Vec<T>>
      + Send
      + 'static,
  {
    self.read(f).await.map_err(|e| {
      error!(error = %e, "failed to list {what}");
      Error::Internal(format!("could not list {what}"))
    })
  }
}

// ─── Registry impl ───────────────────────────────────────────────────────────

impl Registry for SqliteStore {
  type Error = Error;

  // ── Courses ───────────────────────────────────────────────────────────────

  async fn create_course(&self, input: NewCourse) -> Result<Course> {
    self.transact(move |c| graph::create_course(c, input)).await
  }

  async fn update_course(&self, id: Uuid, update: CourseUpdate) -> Result<Course> {
    self
      .transact(move |c| graph::update_course(c, id, update))
      .await
  }

  async fn delete_course(&self, id: Uuid) -> Result<()> {
    self.transact(move |c| graph::delete_course(c, id)).await
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
    self.read(move |c| c.find_course_by_id(id)).await
  }

  async fn get_course_by_code<'a>(&'a self, code: &'a str) -> Result<Option<Course>> {
    let code = code.to_owned();
    self.read(move |c| c.find_course_by_code(&code)).await
  }

  async fn list_courses(&self) -> Result<Vec<Course>> {
    self.read_list("courses", |c| c.list_courses()).await
  }

  async fn add_prerequisite(
    &self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<Course> {
    self
      .transact(move |c| {
        graph::add_prerequisite_edge(c, course_id, prerequisite_id)
      })
      .await
  }

  async fn remove_prerequisite(
    &self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> Result<Course> {
    self
      .transact(move |c| {
        graph::remove_prerequisite_edge(c, course_id, prerequisite_id)
      })
      .await
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn register_student(&self, input: NewStudent) -> Result<Student> {
    self
      .transact(move |c| student::register_student(c, input))
      .await
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    self.read(move |c| c.find_student_by_id(id)).await
  }

  async fn list_students(&self) -> Result<Vec<Student>> {
    self.read_list("students", |c| c.list_students()).await
  }

  async fn deactivate_student(
    &self,
    id: Uuid,
    actor: String,
    reason: Option<String>,
  ) -> Result<Student> {
    self
      .transact(move |c| student::deactivate_student(c, id, &actor, reason))
      .await
  }

  // ── Enrollments ───────────────────────────────────────────────────────────

  async fn create_enrollment(
    &self,
    input: NewEnrollment,
    actor: String,
  ) -> Result<Enrollment> {
    self
      .transact(move |c| lifecycle::create_enrollment(c, input, &actor))
      .await
  }

  async fn update_enrollment(
    &self,
    id: Uuid,
    patch: EnrollmentPatch,
  ) -> Result<Enrollment> {
    self
      .transact(move |c| lifecycle::update_enrollment(c, id, patch))
      .await
  }

  async fn withdraw_enrollment(&self, id: Uuid, actor: String) -> Result<Enrollment> {
    self
      .transact(move |c| lifecycle::withdraw(c, id, &actor))
      .await
  }

  async fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>> {
    self.read(move |c| c.find_enrollment_by_id(id)).await
  }

  async fn list_enrollments_by_student(
    &self,
    student_id: Uuid,
  ) -> Result<Vec<Enrollment>> {
    self
      .read_list("enrollments", move |c| {
        lifecycle::list_by_student(c, student_id)
      })
      .await
  }

  async fn list_enrollments(&self) -> Result<Vec<Enrollment>> {
    self
      .read_list("enrollments", |c| lifecycle::list_all(c))
      .await
  }
}
