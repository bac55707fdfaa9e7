//! [`SqliteCatalog`] is the [`CatalogStore`] the engine sees while a
//! [`crate::SqliteStore`] transaction is open.

use std::collections::BTreeSet;

use registro_core::{
  Result as CoreResult,
  catalog::CatalogStore,
  course::Course,
  enrollment::Enrollment,
  student::Student,
};
use rusqlite::{Connection, Params, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawCourse, RawEnrollment, RawStudent, decode_uuid, encode_date, encode_dt,
    encode_uuid,
  },
};

const COURSE_COLUMNS: &str = "course_id, code, name, credits";

const STUDENT_COLUMNS: &str = "student_id, name, status, created_at, \
                               modified_by, modified_at, deactivated_by, \
                               deactivated_at, deactivation_reason";

const ENROLLMENT_COLUMNS: &str = "enrollment_id, student_id, course_id, \
                                  enrollment_date, status, created_by, \
                                  created_at, cancelled_by, cancelled_at";

/// Borrows a connection (normally an open transaction) for the duration of
/// one engine call.
pub struct SqliteCatalog<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn courses_where(
    &self,
    clause: &str,
    params: impl Params,
  ) -> Result<Vec<Course>> {
    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses {clause}");
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map(params, RawCourse::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    raws
      .into_iter()
      .map(|raw| {
        let requires = self.id_column(
          "SELECT prerequisite_id FROM course_prerequisites WHERE course_id = ?1",
          &raw.course_id,
        )?;
        let required_by = self.id_column(
          "SELECT course_id FROM course_prerequisites WHERE prerequisite_id = ?1",
          &raw.course_id,
        )?;
        raw.into_course(requires, required_by)
      })
      .collect()
  }

  fn id_column(&self, sql: &str, id: &str) -> Result<BTreeSet<Uuid>> {
    let mut stmt = self.conn.prepare_cached(sql)?;
    let ids = stmt
      .query_map([id], |row| row.get::<_, String>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  fn students_where(
    &self,
    clause: &str,
    params: impl Params,
  ) -> Result<Vec<Student>> {
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM students {clause}");
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map(params, RawStudent::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawStudent::into_student).collect()
  }

  fn enrollments_where(
    &self,
    clause: &str,
    params: impl Params,
  ) -> Result<Vec<Enrollment>> {
    let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments {clause}");
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map(params, RawEnrollment::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawEnrollment::into_enrollment).collect()
  }

  fn exists(&self, sql: &str, params: impl Params) -> Result<bool> {
    Ok(self.conn.query_row(sql, params, |row| row.get(0))?)
  }

  fn execute(&self, sql: &str, params: impl Params) -> Result<()> {
    self.conn.execute(sql, params)?;
    Ok(())
  }
}

impl CatalogStore for SqliteCatalog<'_> {
  // ── Courses ───────────────────────────────────────────────────────────────

  fn find_course_by_id(&self, id: Uuid) -> CoreResult<Option<Course>> {
    let mut found =
      self.courses_where("WHERE course_id = ?1", [encode_uuid(id)])?;
    Ok(found.pop())
  }

  fn find_course_by_code(&self, code: &str) -> CoreResult<Option<Course>> {
    let mut found = self.courses_where("WHERE code = ?1", [code])?;
    Ok(found.pop())
  }

  fn list_courses(&self) -> CoreResult<Vec<Course>> {
    Ok(self.courses_where("ORDER BY code", [])?)
  }

  fn prerequisite_edges(&self) -> CoreResult<Vec<(Uuid, Uuid)>> {
    let read = || -> Result<Vec<(Uuid, Uuid)>> {
      let mut stmt = self
        .conn
        .prepare("SELECT course_id, prerequisite_id FROM course_prerequisites")?;
      let rows = stmt
        .query_map([], |row| {
          Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      rows
        .iter()
        .map(|(c, p)| -> Result<(Uuid, Uuid)> {
          Ok((decode_uuid(c)?, decode_uuid(p)?))
        })
        .collect()
    };
    Ok(read()?)
  }

  fn save_course(&mut self, course: &Course) -> CoreResult<()> {
    Ok(self.execute(
      "INSERT INTO courses (course_id, code, name, credits)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (course_id) DO UPDATE SET
         code    = excluded.code,
         name    = excluded.name,
         credits = excluded.credits",
      params![
        encode_uuid(course.course_id),
        course.code,
        course.name,
        i64::from(course.credits),
      ],
    )?)
  }

  fn add_prerequisite(
    &mut self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> CoreResult<()> {
    Ok(self.execute(
      "INSERT OR IGNORE INTO course_prerequisites (course_id, prerequisite_id)
       VALUES (?1, ?2)",
      [encode_uuid(course_id), encode_uuid(prerequisite_id)],
    )?)
  }

  fn remove_prerequisite(
    &mut self,
    course_id: Uuid,
    prerequisite_id: Uuid,
  ) -> CoreResult<()> {
    Ok(self.execute(
      "DELETE FROM course_prerequisites
       WHERE course_id = ?1 AND prerequisite_id = ?2",
      [encode_uuid(course_id), encode_uuid(prerequisite_id)],
    )?)
  }

  fn replace_prerequisites(
    &mut self,
    course_id: Uuid,
    prerequisites: &BTreeSet<Uuid>,
  ) -> CoreResult<()> {
    self.execute(
      "DELETE FROM course_prerequisites WHERE course_id = ?1",
      [encode_uuid(course_id)],
    )?;
    for p in prerequisites {
      self.add_prerequisite(course_id, *p)?;
    }
    Ok(())
  }

  fn delete_course_by_id(&mut self, id: Uuid) -> CoreResult<()> {
    let id = encode_uuid(id);
    self.execute(
      "DELETE FROM course_prerequisites
       WHERE course_id = ?1 OR prerequisite_id = ?1",
      [&id],
    )?;
    Ok(self.execute("DELETE FROM courses WHERE course_id = ?1", [&id])?)
  }

  fn course_has_enrollments(&self, course_id: Uuid) -> CoreResult<bool> {
    Ok(self.exists(
      "SELECT EXISTS (SELECT 1 FROM enrollments WHERE course_id = ?1)",
      [encode_uuid(course_id)],
    )?)
  }

  // ── Enrollments ───────────────────────────────────────────────────────────

  fn find_enrollment(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> CoreResult<Option<Enrollment>> {
    let mut found = self.enrollments_where(
      "WHERE student_id = ?1 AND course_id = ?2",
      [encode_uuid(student_id), encode_uuid(course_id)],
    )?;
    Ok(found.pop())
  }

  fn find_enrollment_by_id(&self, id: Uuid) -> CoreResult<Option<Enrollment>> {
    let mut found =
      self.enrollments_where("WHERE enrollment_id = ?1", [encode_uuid(id)])?;
    Ok(found.pop())
  }

  fn exists_enrollment(&self, student_id: Uuid, course_id: Uuid) -> CoreResult<bool> {
    Ok(self.exists(
      "SELECT EXISTS (
         SELECT 1 FROM enrollments WHERE student_id = ?1 AND course_id = ?2
       )",
      [encode_uuid(student_id), encode_uuid(course_id)],
    )?)
  }

  fn find_enrollments_by_student(
    &self,
    student_id: Uuid,
  ) -> CoreResult<Vec<Enrollment>> {
    Ok(self.enrollments_where(
      "WHERE student_id = ?1 ORDER BY created_at",
      [encode_uuid(student_id)],
    )?)
  }

  fn find_all_enrollments(&self) -> CoreResult<Vec<Enrollment>> {
    Ok(self.enrollments_where("ORDER BY created_at", [])?)
  }

  fn save_enrollment(&mut self, e: &Enrollment) -> CoreResult<()> {
    Ok(self.execute(
      "INSERT INTO enrollments (
         enrollment_id, student_id, course_id, enrollment_date, status,
         created_by, created_at, cancelled_by, cancelled_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
       ON CONFLICT (enrollment_id) DO UPDATE SET
         status       = excluded.status,
         cancelled_by = excluded.cancelled_by,
         cancelled_at = excluded.cancelled_at",
      params![
        encode_uuid(e.enrollment_id),
        encode_uuid(e.student_id),
        encode_uuid(e.course_id),
        encode_date(e.enrollment_date),
        e.status.to_string(),
        e.created_by,
        encode_dt(e.created_at),
        e.cancelled_by,
        e.cancelled_at.map(encode_dt),
      ],
    )?)
  }

  // ── Students ──────────────────────────────────────────────────────────────

  fn find_student_by_id(&self, id: Uuid) -> CoreResult<Option<Student>> {
    let mut found =
      self.students_where("WHERE student_id = ?1", [encode_uuid(id)])?;
    Ok(found.pop())
  }

  fn list_students(&self) -> CoreResult<Vec<Student>> {
    Ok(self.students_where("ORDER BY created_at", [])?)
  }

  fn save_student(&mut self, s: &Student) -> CoreResult<()> {
    Ok(self.execute(
      "INSERT INTO students (
         student_id, name, status, created_at, modified_by, modified_at,
         deactivated_by, deactivated_at, deactivation_reason
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
       ON CONFLICT (student_id) DO UPDATE SET
         name                = excluded.name,
         status              = excluded.status,
         modified_by         = excluded.modified_by,
         modified_at         = excluded.modified_at,
         deactivated_by      = excluded.deactivated_by,
         deactivated_at      = excluded.deactivated_at,
         deactivation_reason = excluded.deactivation_reason",
      params![
        encode_uuid(s.student_id),
        s.name,
        s.status.to_string(),
        encode_dt(s.created_at),
        s.modified_by,
        s.modified_at.map(encode_dt),
        s.deactivated_by,
        s.deactivated_at.map(encode_dt),
        s.deactivation_reason,
      ],
    )?)
  }
}
