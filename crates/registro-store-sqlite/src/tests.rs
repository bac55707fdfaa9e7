//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use registro_core::{
  ErrorKind,
  cache::CachedRegistry,
  catalog::CatalogStore,
  course::{CourseUpdate, NewCourse},
  enrollment::{EnrollmentPatch, EnrollmentStatus, NewEnrollment},
  error::{Conflict, GraphViolation},
  registry::Registry,
  student::{NewStudent, StudentStatus},
};
use uuid::Uuid;

use crate::{Error, SqliteCatalog, SqliteStore, schema::SCHEMA};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn kind(e: &Error) -> Option<ErrorKind> { e.as_core().map(|c| c.kind()) }

async fn course(s: &impl Registry, code: &str, requires: &[Uuid]) -> Uuid {
  s.create_course(NewCourse {
    code:          code.into(),
    name:          format!("Course {code}"),
    credits:       4,
    prerequisites: requires.iter().copied().collect(),
  })
  .await
  .unwrap()
  .course_id
}

async fn student(s: &impl Registry, name: &str) -> Uuid {
  s.register_student(NewStudent { name: name.into() })
    .await
    .unwrap()
    .student_id
}

// ─── Courses and the prerequisite graph ──────────────────────────────────────

#[tokio::test]
async fn create_and_read_course_with_prerequisites() {
  let s = store().await;
  let a = course(&s, "MAT100", &[]).await;
  let b = course(&s, "MAT200", &[a]).await;

  let b_read = s.get_course(b).await.unwrap().unwrap();
  assert_eq!(b_read.requires, BTreeSet::from([a]));
  assert_eq!(b_read.credits, 4);

  let a_read = s.get_course_by_code("MAT100").await.unwrap().unwrap();
  assert_eq!(a_read.required_by, BTreeSet::from([b]));

  let codes: Vec<_> = s
    .list_courses()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.code)
    .collect();
  assert_eq!(codes, ["MAT100", "MAT200"]);
}

#[tokio::test]
async fn cycle_is_rejected_and_graph_unchanged() {
  let s = store().await;
  let a = course(&s, "AAA", &[]).await;
  let b = course(&s, "BBB", &[a]).await;
  let c = course(&s, "CCC", &[b]).await;

  let err = s.add_prerequisite(a, c).await.unwrap_err();
  assert!(matches!(
    err.as_core(),
    Some(registro_core::Error::InvalidGraphEdit(GraphViolation::Cycle { .. }))
  ));

  let a_read = s.get_course(a).await.unwrap().unwrap();
  assert!(a_read.requires.is_empty());
  let c_read = s.get_course(c).await.unwrap().unwrap();
  assert!(c_read.required_by.is_empty());
}

#[tokio::test]
async fn self_loop_is_rejected() {
  let s = store().await;
  let a = course(&s, "AAA", &[]).await;
  let err = s.add_prerequisite(a, a).await.unwrap_err();
  assert_eq!(kind(&err), Some(ErrorKind::InvalidGraphEdit));
}

#[tokio::test]
async fn duplicate_code_conflicts() {
  let s = store().await;
  course(&s, "CS101", &[]).await;
  let err = s
    .create_course(NewCourse {
      code:          "CS101".into(),
      name:          "Again".into(),
      credits:       3,
      prerequisites: BTreeSet::new(),
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err.as_core(),
    Some(registro_core::Error::Conflict(Conflict::DuplicateCode(_)))
  ));
}

#[tokio::test]
async fn failed_replace_leaves_prerequisites_untouched() {
  let s = store().await;
  let a = course(&s, "AAA", &[]).await;
  let b = course(&s, "BBB", &[]).await;
  let c = course(&s, "CCC", &[a]).await;

  // `b` is valid but the unknown id is not, so nothing may be written.
  let err = s
    .update_course(c, CourseUpdate {
      code:          "CCC".into(),
      name:          "Renamed".into(),
      credits:       4,
      prerequisites: Some(BTreeSet::from([b, Uuid::new_v4()])),
    })
    .await
    .unwrap_err();
  assert_eq!(kind(&err), Some(ErrorKind::NotFound));

  let c_read = s.get_course(c).await.unwrap().unwrap();
  assert_eq!(c_read.name, "Course CCC");
  assert_eq!(c_read.requires, BTreeSet::from([a]));
  assert!(s.get_course(b).await.unwrap().unwrap().required_by.is_empty());
}

#[tokio::test]
async fn update_replaces_prerequisite_set() {
  let s = store().await;
  let a = course(&s, "AAA", &[]).await;
  let b = course(&s, "BBB", &[]).await;
  let c = course(&s, "CCC", &[a]).await;

  let updated = s
    .update_course(c, CourseUpdate {
      code:          "CCC".into(),
      name:          "Course CCC".into(),
      credits:       4,
      prerequisites: Some(BTreeSet::from([b])),
    })
    .await
    .unwrap();
  assert_eq!(updated.requires, BTreeSet::from([b]));
  assert!(s.get_course(a).await.unwrap().unwrap().required_by.is_empty());
  assert_eq!(
    s.get_course(b).await.unwrap().unwrap().required_by,
    BTreeSet::from([c])
  );
}

#[tokio::test]
async fn delete_guarded_while_required() {
  let s = store().await;
  let a = course(&s, "AAA", &[]).await;
  let b = course(&s, "BBB", &[a]).await;

  let err = s.delete_course(a).await.unwrap_err();
  assert!(matches!(
    err.as_core(),
    Some(registro_core::Error::Conflict(Conflict::StillRequired {
      dependents: 1,
      ..
    }))
  ));

  s.remove_prerequisite(b, a).await.unwrap();
  s.delete_course(a).await.unwrap();
  assert!(s.get_course(a).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_refused_with_enrollments() {
  let s = store().await;
  let c = course(&s, "AAA", &[]).await;
  let x = student(&s, "X").await;
  s.create_enrollment(NewEnrollment::new(x, c), "clerk".into())
    .await
    .unwrap();

  let err = s.delete_course(c).await.unwrap_err();
  assert!(matches!(
    err.as_core(),
    Some(registro_core::Error::Conflict(Conflict::HasEnrollments(_)))
  ));
}

// ─── Enrollments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn cs101_cs201_scenario() {
  let s = store().await;
  let cs101 = course(&s, "CS101", &[]).await;
  let cs201 = course(&s, "CS201", &[cs101]).await;
  let x = student(&s, "X").await;
  let y = student(&s, "Y").await;

  let first = s
    .create_enrollment(NewEnrollment::new(x, cs101), "clerk".into())
    .await
    .unwrap();
  assert_eq!(first.status, EnrollmentStatus::Active);

  s.create_enrollment(NewEnrollment::new(x, cs201), "clerk".into())
    .await
    .unwrap();

  let err = s
    .create_enrollment(NewEnrollment::new(y, cs201), "clerk".into())
    .await
    .unwrap_err();
  match err.as_core() {
    Some(registro_core::Error::Conflict(Conflict::PrerequisitesNotMet {
      missing,
      ..
    })) => assert_eq!(missing, &vec![cs101]),
    other => panic!("unexpected: {other:?}"),
  }

  assert_eq!(s.list_enrollments_by_student(x).await.unwrap().len(), 2);
  assert!(s.list_enrollments_by_student(y).await.unwrap().is_empty());
  assert_eq!(s.list_enrollments().await.unwrap().len(), 2);
}

#[tokio::test]
async fn pair_stays_unique_after_withdrawal() {
  let s = store().await;
  let c = course(&s, "CS101", &[]).await;
  let x = student(&s, "X").await;

  let e = s
    .create_enrollment(NewEnrollment::new(x, c), "clerk".into())
    .await
    .unwrap();
  let withdrawn = s
    .withdraw_enrollment(e.enrollment_id, "registrar".into())
    .await
    .unwrap();
  assert_eq!(withdrawn.status, EnrollmentStatus::Cancelled);
  assert_eq!(withdrawn.cancelled_by.as_deref(), Some("registrar"));
  assert!(withdrawn.cancelled_at.is_some());

  let err = s
    .create_enrollment(NewEnrollment::new(x, c), "clerk".into())
    .await
    .unwrap_err();
  assert!(matches!(
    err.as_core(),
    Some(registro_core::Error::Conflict(Conflict::AlreadyEnrolled { .. }))
  ));

  let stored = s.get_enrollment(e.enrollment_id).await.unwrap().unwrap();
  assert_eq!(stored.status, EnrollmentStatus::Cancelled);
  assert_eq!(stored.enrollment_date, e.enrollment_date);
}

#[tokio::test]
async fn enrolling_reactivates_student() {
  let s = store().await;
  let c = course(&s, "CS101", &[]).await;
  let x = student(&s, "X").await;
  s.deactivate_student(x, "registrar".into(), Some("on leave".into()))
    .await
    .unwrap();

  let before = s.get_student(x).await.unwrap().unwrap();
  assert_eq!(before.status, StudentStatus::Inactive);
  assert_eq!(before.deactivation_reason.as_deref(), Some("on leave"));

  s.create_enrollment(NewEnrollment::new(x, c), "clerk".into())
    .await
    .unwrap();

  let after = s.get_student(x).await.unwrap().unwrap();
  assert_eq!(after.status, StudentStatus::Active);
  assert_eq!(after.modified_by.as_deref(), Some("clerk"));
  assert!(after.deactivated_at.is_none());
  assert!(after.deactivation_reason.is_none());
}

#[tokio::test]
async fn rejected_enrollment_rolls_back_reactivation() {
  let s = store().await;
  let a = course(&s, "AAA", &[]).await;
  let b = course(&s, "BBB", &[a]).await;
  let x = student(&s, "X").await;
  s.deactivate_student(x, "registrar".into(), None)
    .await
    .unwrap();

  s.create_enrollment(NewEnrollment::new(x, b), "clerk".into())
    .await
    .unwrap_err();

  let after = s.get_student(x).await.unwrap().unwrap();
  assert_eq!(after.status, StudentStatus::Inactive);
  assert!(s.list_enrollments().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
  let s = store().await;
  let c = course(&s, "CS101", &[]).await;
  let err = s
    .create_enrollment(NewEnrollment::new(Uuid::new_v4(), c), "clerk".into())
    .await
    .unwrap_err();
  assert_eq!(kind(&err), Some(ErrorKind::NotFound));

  let err = s
    .withdraw_enrollment(Uuid::new_v4(), "clerk".into())
    .await
    .unwrap_err();
  assert_eq!(kind(&err), Some(ErrorKind::NotFound));
  assert!(s.get_enrollment(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn patch_updates_only_given_fields() {
  let s = store().await;
  let c = course(&s, "CS101", &[]).await;
  let x = student(&s, "X").await;
  let e = s
    .create_enrollment(NewEnrollment::new(x, c), "clerk".into())
    .await
    .unwrap();

  let patched = s
    .update_enrollment(e.enrollment_id, EnrollmentPatch {
      cancelled_by: Some("auditor".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(patched.status, EnrollmentStatus::Active);
  assert_eq!(patched.cancelled_by.as_deref(), Some("auditor"));
  assert_eq!(patched.created_by, "clerk");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enrollments_of_one_pair_admit_one() {
  let s = store().await;
  let c = course(&s, "CS101", &[]).await;
  let x = student(&s, "X").await;

  let tasks: Vec<_> = (0..16)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move {
        s.create_enrollment(NewEnrollment::new(x, c), "clerk".into())
          .await
      })
    })
    .collect();

  let mut accepted = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(_) => accepted += 1,
      Err(e) => assert!(matches!(
        e.as_core(),
        Some(registro_core::Error::Conflict(Conflict::AlreadyEnrolled { .. }))
      )),
    }
  }
  assert_eq!(accepted, 1);
  assert_eq!(s.list_enrollments_by_student(x).await.unwrap().len(), 1);
}

// ─── Encoding ────────────────────────────────────────────────────────────────

#[test]
fn status_markers_read_case_insensitively() {
  let conn = rusqlite::Connection::open_in_memory().unwrap();
  conn.execute_batch(SCHEMA).unwrap();
  let id = Uuid::new_v4();
  conn
    .execute(
      "INSERT INTO students (student_id, name, status, created_at)
       VALUES (?1, 'Ada', 'INACTIVE', '2024-02-01T09:00:00+00:00')",
      [id.to_string()],
    )
    .unwrap();

  let cat = SqliteCatalog::new(&conn);
  let read = cat.find_student_by_id(id).unwrap().unwrap();
  assert_eq!(read.status, StudentStatus::Inactive);
  assert_eq!(read.name, "Ada");
}

#[test]
fn oversized_credits_are_a_decode_error() {
  let conn = rusqlite::Connection::open_in_memory().unwrap();
  conn.execute_batch(SCHEMA).unwrap();
  let id = Uuid::new_v4();
  conn
    .execute(
      "INSERT INTO courses (course_id, code, name, credits)
       VALUES (?1, 'BIG100', 'Huge', 5000000000)",
      [id.to_string()],
    )
    .unwrap();

  let err = SqliteCatalog::new(&conn).find_course_by_id(id).unwrap_err();
  let registro_core::Error::Storage(source) = err else {
    panic!("expected a storage error, got {err:?}");
  };
  assert!(matches!(
    source.downcast_ref::<Error>(),
    Some(Error::CreditsOutOfRange(5_000_000_000))
  ));
}

#[tokio::test]
async fn unreadable_rows_fail_listing_generically() {
  let s = store().await;
  s.connection()
    .call(|conn| {
      conn.execute(
        "INSERT INTO students (student_id, name, status, created_at)
         VALUES ('not-a-uuid', 'Bad', 'graduated', 'yesterday')",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.list_students().await.unwrap_err();
  assert!(matches!(err, Error::Internal(_)));
}

// ─── Cache over SQLite ───────────────────────────────────────────────────────

#[tokio::test]
async fn cache_sees_inverse_edges_after_write() {
  let s = CachedRegistry::new(store().await);
  let a = course(&s, "AAA", &[]).await;
  let b = course(&s, "BBB", &[]).await;

  let a_read = s.get_course(a).await.unwrap().unwrap();
  assert!(a_read.required_by.is_empty());
  assert_eq!(s.cached_courses(), 1);

  s.add_prerequisite(b, a).await.unwrap();
  assert_eq!(s.cached_courses(), 0);

  let a_read = s.get_course(a).await.unwrap().unwrap();
  assert_eq!(a_read.required_by, BTreeSet::from([b]));
}
