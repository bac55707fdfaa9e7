//! Students and their activation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::info;
use uuid::Uuid;

use crate::{Error, Result, catalog::CatalogStore, error::Entity};

/// Activation state of a student. Parsed case-insensitively.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StudentStatus {
  #[default]
  Active,
  Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub student_id:          Uuid,
  pub name:                String,
  pub status:              StudentStatus,
  pub created_at:          DateTime<Utc>,
  pub modified_by:         Option<String>,
  pub modified_at:         Option<DateTime<Utc>>,
  /// The three `deactivation_*` fields are only set while inactive.
  pub deactivated_by:      Option<String>,
  pub deactivated_at:      Option<DateTime<Utc>>,
  pub deactivation_reason: Option<String>,
}

impl Student {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      student_id:          Uuid::new_v4(),
      name:                name.into(),
      status:              StudentStatus::Active,
      created_at:          Utc::now(),
      modified_by:         None,
      modified_at:         None,
      deactivated_by:      None,
      deactivated_at:      None,
      deactivation_reason: None,
    }
  }

  pub fn is_active(&self) -> bool { self.status == StudentStatus::Active }

  /// Mark active again and forget why the student was deactivated.
  pub fn reactivate(&mut self, actor: &str, at: DateTime<Utc>) {
    self.status = StudentStatus::Active;
    self.modified_by = Some(actor.to_owned());
    self.modified_at = Some(at);
    self.deactivated_by = None;
    self.deactivated_at = None;
    self.deactivation_reason = None;
  }

  pub fn deactivate(
    &mut self,
    actor: &str,
    reason: Option<String>,
    at: DateTime<Utc>,
  ) {
    self.status = StudentStatus::Inactive;
    self.modified_by = Some(actor.to_owned());
    self.modified_at = Some(at);
    self.deactivated_by = Some(actor.to_owned());
    self.deactivated_at = Some(at);
    self.deactivation_reason = reason;
  }
}

/// Input to [`crate::registry::Registry::register_student`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
  pub name: String,
}

// ─── Store operations ────────────────────────────────────────────────────────

pub fn register_student(
  store: &mut impl CatalogStore,
  input: NewStudent,
) -> Result<Student> {
  let name = input.name.trim();
  if name.is_empty() {
    return Err(Error::Validation("student name is required".into()));
  }
  let student = Student::new(name);
  store.save_student(&student)?;
  info!(student_id = %student.student_id, "student registered");
  Ok(student)
}

pub fn deactivate_student(
  store: &mut impl CatalogStore,
  id: Uuid,
  actor: &str,
  reason: Option<String>,
) -> Result<Student> {
  let mut student = store
    .find_student_by_id(id)?
    .ok_or(Error::NotFound(Entity::Student, id))?;
  student.deactivate(actor, reason, Utc::now());
  store.save_student(&student)?;
  info!(student_id = %id, actor, "student deactivated");
  Ok(student)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ErrorKind, memory::MemoryCatalog};

  #[test]
  fn blank_name_is_rejected() {
    let mut cat = MemoryCatalog::new();
    let err = register_student(&mut cat, NewStudent { name: "  ".into() })
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
  }

  #[test]
  fn deactivate_missing_student_is_not_found() {
    let mut cat = MemoryCatalog::new();
    let err = deactivate_student(&mut cat, Uuid::new_v4(), "x", None)
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[test]
  fn status_parses_case_insensitively() {
    assert_eq!("INACTIVE".parse::<StudentStatus>(), Ok(StudentStatus::Inactive));
    assert_eq!("Active".parse::<StudentStatus>(), Ok(StudentStatus::Active));
    assert_eq!(StudentStatus::Inactive.to_string(), "inactive");
  }

  #[test]
  fn reactivate_clears_deactivation_metadata() {
    let mut s = Student::new("Ada");
    s.deactivate("registrar", Some("unpaid fees".into()), Utc::now());
    assert!(!s.is_active());
    assert_eq!(s.deactivation_reason.as_deref(), Some("unpaid fees"));

    s.reactivate("clerk", Utc::now());
    assert!(s.is_active());
    assert_eq!(s.modified_by.as_deref(), Some("clerk"));
    assert!(s.deactivated_by.is_none());
    assert!(s.deactivated_at.is_none());
    assert!(s.deactivation_reason.is_none());
  }
}
