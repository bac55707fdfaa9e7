//! Error types for `registro-core`.
//!
//! Every business-rule rejection is a distinct variant so that callers can
//! tell a missing record from a forbidden graph edit from a conflict.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  Course,
  Student,
  Enrollment,
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Course => "course",
      Self::Student => "student",
      Self::Enrollment => "enrollment",
    })
  }
}

/// A structurally invalid prerequisite edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphViolation {
  #[error("a course cannot be its own prerequisite: {0}")]
  SelfLoop(Uuid),

  #[error(
    "edge would form a cycle: {course} is reachable from prerequisite \
     {prerequisite}"
  )]
  Cycle { course: Uuid, prerequisite: Uuid },
}

/// A request rejected because it clashes with existing catalog state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
  #[error("duplicate code: {0:?} is already taken")]
  DuplicateCode(String),

  #[error("already enrolled: student {student_id} in course {course_id}")]
  AlreadyEnrolled { student_id: Uuid, course_id: Uuid },

  #[error("prerequisites not met for course {course_id}: missing {missing:?}")]
  PrerequisitesNotMet { course_id: Uuid, missing: Vec<Uuid> },

  #[error(
    "course is a prerequisite of another course: {course_id} is required by \
     {dependents} course(s)"
  )]
  StillRequired { course_id: Uuid, dependents: usize },

  #[error("course {0} still has enrollments")]
  HasEnrollments(Uuid),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} not found: {1}")]
  NotFound(Entity, Uuid),

  #[error("invalid graph edit: {0}")]
  InvalidGraphEdit(#[from] GraphViolation),

  #[error("conflict: {0}")]
  Conflict(#[from] Conflict),

  #[error("validation error: {0}")]
  Validation(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse category of an [`Error`], for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  InvalidGraphEdit,
  Conflict,
  Validation,
  Storage,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(..) => ErrorKind::NotFound,
      Self::InvalidGraphEdit(_) => ErrorKind::InvalidGraphEdit,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Storage(_) => ErrorKind::Storage,
    }
  }

  /// Wrap any collaborator failure.
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
